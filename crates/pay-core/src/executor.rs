//! # Payment Executor
//!
//! Drives a payment from `pending` to `complete` (or a recorded failure).
//!
//! ```text
//! pending ─► resolving_source ─► [billing_subscriptions] ─► charging ─► complete
//!                   │                      │                    │
//!                   └──────────────────────┴────────────────────┴──► error
//! ```
//!
//! The whole run happens under the per-payment lock, so concurrent calls for
//! the same payment are strictly sequential and a payment already completed
//! by an earlier call exits without touching the gateway.

use crate::amount;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{
    BoxedGateway, TimeoutGateway, TransactionRequest, TransactionType, DEFAULT_COUNTRY,
    DEFAULT_GATEWAY_TIMEOUT,
};
use crate::hooks::Hooks;
use crate::lock::KeyedLock;
use crate::order::{Order, Subscription};
use crate::payment::{Payment, PaymentData, PaymentFailure};
use crate::product::{CatalogPricing, Pricing};
use crate::source::{ChargeSource, SourceResolver};
use crate::store::{BoxedInvoiceStore, BoxedPaymentStore, Stores};
use crate::subscription::{BillingContext, SubscriptionBiller};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Pipeline stage, logged as the payment moves through the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
    Pending,
    ResolvingSource,
    BillingSubscriptions,
    Charging,
    Complete,
    Error,
}

impl PaymentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStage::Pending => "pending",
            PaymentStage::ResolvingSource => "resolving_source",
            PaymentStage::BillingSubscriptions => "billing_subscriptions",
            PaymentStage::Charging => "charging",
            PaymentStage::Complete => "complete",
            PaymentStage::Error => "error",
        }
    }
}

impl std::fmt::Display for PaymentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a call to [`PaymentExecutor::pay`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Not an eWAY payment, already complete, or terminally failed
    Skipped,
    /// Charged at the gateway and marked complete
    Charged,
    /// Nothing left to charge after subscriptions; marked complete
    Completed,
    /// A failure was recorded on the payment
    Failed,
}

/// Builder for [`PaymentExecutor`]
pub struct PaymentExecutorBuilder {
    gateway: BoxedGateway,
    stores: Stores,
    pricing: Arc<dyn Pricing>,
    hooks: Hooks,
    timeout: Duration,
    country: String,
    locks: KeyedLock,
}

impl PaymentExecutorBuilder {
    pub fn with_pricing(mut self, pricing: Arc<dyn Pricing>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Time budget for each gateway call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Country sent when tokenizing new cards
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Share a lock table with other executors in the process
    pub fn with_locks(mut self, locks: KeyedLock) -> Self {
        self.locks = locks;
        self
    }

    pub fn build(self) -> PaymentExecutor {
        let gateway: BoxedGateway = Arc::new(TimeoutGateway::new(self.gateway, self.timeout));

        let sources = SourceResolver::new(gateway.clone(), self.stores.profiles.clone())
            .with_country(self.country);
        let biller = SubscriptionBiller::new(
            gateway.clone(),
            self.stores.products.clone(),
            self.stores.invoices.clone(),
            self.pricing,
        )
        .with_hooks(self.hooks.clone());

        PaymentExecutor {
            gateway,
            payments: self.stores.payments,
            invoices: self.stores.invoices,
            sources,
            biller,
            hooks: self.hooks,
            locks: self.locks,
        }
    }
}

/// Top-level payment orchestrator
pub struct PaymentExecutor {
    gateway: BoxedGateway,
    payments: BoxedPaymentStore,
    invoices: BoxedInvoiceStore,
    sources: SourceResolver,
    biller: SubscriptionBiller,
    hooks: Hooks,
    locks: KeyedLock,
}

impl PaymentExecutor {
    pub fn builder(gateway: BoxedGateway, stores: Stores) -> PaymentExecutorBuilder {
        PaymentExecutorBuilder {
            gateway,
            stores,
            pricing: Arc::new(CatalogPricing),
            hooks: Hooks::default(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
            country: DEFAULT_COUNTRY.to_string(),
            locks: KeyedLock::new(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.gateway.provider_name()
    }

    /// Run the payment pipeline for a stored payment.
    ///
    /// Payment-local failures are recorded on the payment and reported as
    /// [`PaymentOutcome::Failed`]; `Err` means a store fault or a missing
    /// record.
    #[instrument(skip(self))]
    pub async fn pay(&self, payment_id: &str) -> PaymentResult<PaymentOutcome> {
        let _guard = self.locks.acquire(payment_id).await;

        let mut payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Payment", payment_id))?;

        if !payment.method.is_eway() {
            debug!(method = %payment.method.method_type, "not an eway payment");
            return Ok(PaymentOutcome::Skipped);
        }
        if payment.is_settled() {
            debug!(complete = payment.complete, "payment already settled");
            return Ok(PaymentOutcome::Skipped);
        }

        let outcome = self.execute(&mut payment).await;
        if let Err(e) = self.payments.save(&payment).await {
            if let Some(data) = &payment.data {
                error!(
                    payment_id,
                    transaction_id = data.charge.transaction_id.as_deref().unwrap_or_default(),
                    "Charged payment could not be saved: {}",
                    e
                );
            }
            return Err(e);
        }

        let outcome = outcome?;
        match outcome {
            PaymentOutcome::Failed => warn!(
                error = payment.error.as_ref().map(|e| e.id.as_str()).unwrap_or_default(),
                "Payment failed"
            ),
            _ => info!(outcome = ?outcome, "Payment finished"),
        }
        Ok(outcome)
    }

    async fn execute(&self, payment: &mut Payment) -> PaymentResult<PaymentOutcome> {
        payment.error = None;
        enter(payment, PaymentStage::ResolvingSource);

        let source = if payment.method.request {
            match payment.method.data.id.clone().filter(|t| !t.is_empty()) {
                Some(token) => Some(ChargeSource::token(token)),
                None => {
                    payment.fail(PaymentFailure::no_token());
                    None
                }
            }
        } else {
            self.sources.resolve(payment).await?
        };

        let Some(source) = source else {
            enter(payment, PaymentStage::Error);
            return Ok(PaymentOutcome::Failed);
        };

        let invoice = self
            .invoices
            .invoice(&payment.invoice)
            .await?
            .ok_or_else(|| PaymentError::not_found("Invoice", &payment.invoice))?;
        let orders = self.load_orders(&invoice.orders).await?;
        let subscriptions = self.load_subscriptions(&orders).await?;

        let currency = amount::currency_or_default(&payment.currency);
        let mut remaining = payment.amount;

        if !subscriptions.is_empty() {
            enter(payment, PaymentStage::BillingSubscriptions);
            let ctx = BillingContext {
                lines: &invoice.lines,
                orders: &orders,
                subscriptions: &subscriptions,
                currency: &currency,
                user: payment.user.as_deref(),
                source: &source,
            };
            match self.biller.bill(&ctx).await {
                Ok(billing) => remaining -= billing.total,
                Err(e) => return record_fault(payment, e),
            }
        }

        if remaining <= Decimal::ZERO {
            payment.complete = true;
            enter(payment, PaymentStage::Complete);
            return Ok(PaymentOutcome::Completed);
        }

        enter(payment, PaymentStage::Charging);
        let total_amount = match amount::normalize(remaining, &currency) {
            Ok(total) => total,
            Err(e) => return record_fault(payment, e),
        };

        let mut request = TransactionRequest {
            total_amount,
            currency_code: currency.to_uppercase(),
            invoice_reference: invoice.id.clone(),
            invoice_description: format!("Payment ID {}", payment.id),
            token_customer_id: source.source.clone(),
            transaction_type: TransactionType::Moto,
            options: Default::default(),
        };
        for order in &orders {
            self.hooks.transaction_request(order, &mut request);
        }

        let response = match self.gateway.create_transaction(request).await {
            Ok(response) => response,
            Err(e) => return record_fault(payment, e),
        };

        if let Some(codes) = response.error_codes() {
            payment.fail(PaymentFailure::gateway_codes(codes));
            enter(payment, PaymentStage::Error);
            return Ok(PaymentOutcome::Failed);
        }
        if !response.is_approved() {
            payment.fail(PaymentFailure::declined(response.response_message.as_deref()));
            enter(payment, PaymentStage::Error);
            return Ok(PaymentOutcome::Failed);
        }

        info!(
            transaction_id = response.transaction_id.as_deref().unwrap_or_default(),
            amount = total_amount,
            "Charged payment"
        );
        payment.data = Some(PaymentData { charge: response });
        payment.complete = true;
        enter(payment, PaymentStage::Complete);

        Ok(PaymentOutcome::Charged)
    }

    async fn load_orders(&self, ids: &[String]) -> PaymentResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            let order = self
                .invoices
                .order(id)
                .await?
                .ok_or_else(|| PaymentError::not_found("Order", id))?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn load_subscriptions(&self, orders: &[Order]) -> PaymentResult<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        for id in orders.iter().flat_map(|order| &order.subscriptions) {
            let subscription = self
                .invoices
                .subscription(id)
                .await?
                .ok_or_else(|| PaymentError::not_found("Subscription", id))?;
            subscriptions.push(subscription);
        }
        Ok(subscriptions)
    }
}

fn enter(payment: &Payment, stage: PaymentStage) {
    debug!(payment_id = %payment.id, stage = %stage, "payment stage");
}

/// Record a gateway or integrity fault on the payment; anything else is
/// infrastructure and goes back to the caller.
fn record_fault(payment: &mut Payment, err: PaymentError) -> PaymentResult<PaymentOutcome> {
    match err {
        PaymentError::Integrity(_) => {
            error!(payment_id = %payment.id, "Integrity fault: {}", err);
            payment.fail(PaymentFailure::integrity(&err));
        }
        PaymentError::ProviderError { .. }
        | PaymentError::NetworkError(_)
        | PaymentError::Timeout { .. }
        | PaymentError::Serialization(_)
        | PaymentError::InvalidAmount { .. } => {
            warn!(payment_id = %payment.id, "Gateway fault: {}", err);
            payment.fail(PaymentFailure::system(&err));
        }
        other => return Err(other),
    }
    enter(payment, PaymentStage::Error);
    Ok(PaymentOutcome::Failed)
}
