//! # Gateway Trait
//!
//! Contract with the card-tokenizing payment gateway.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Gateway (trait)                       │
//! │  ├── create_customer()      tokenize a card                 │
//! │  ├── create_transaction()   one-time charge                 │
//! │  ├── create_plan()          recurring plan template         │
//! │  ├── create_subscription()  bundle plans for a customer     │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┼─────────────────┐
//!  ┌───────┴───────┐ ┌───────┴───────┐ ┌───────┴───────┐
//!  │  EwayClient   │ │TimeoutGateway │ │  MockGateway  │
//!  │  (pay-eway)   │ │  (decorator)  │ │  (tests)      │
//!  └───────────────┘ └───────────────┘ └───────────────┘
//! ```

use crate::error::{PaymentError, PaymentResult};
use crate::order::Interval;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default time budget for one gateway call
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Country sent with new token customers unless configured otherwise
pub const DEFAULT_COUNTRY: &str = "au";

/// Raw card details sent to the gateway for tokenization
#[derive(Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub name: String,
    pub number: String,
    pub cvn: String,
    pub expiry_month: String,
    pub expiry_year: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("name", &self.name)
            .field("number", &"<redacted>")
            .field("cvn", &"<redacted>")
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .finish()
    }
}

/// Create a token customer for a card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub card: CardDetails,
}

/// Card summary returned by the gateway (number is masked)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub name: String,
    pub number: String,
    pub expiry_month: String,
    pub expiry_year: String,
}

/// Result of a create-customer call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerResponse {
    /// Token identifying the stored card at the gateway
    pub token_customer_id: Option<String>,
    pub card: Option<CardSummary>,
    /// Comma separated gateway error codes
    pub errors: Option<String>,
}

/// Transaction type sent with charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Mail order / telephone order (server-side token charge)
    #[serde(rename = "MOTO")]
    Moto,
    Purchase,
    Recurring,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Moto => "MOTO",
            TransactionType::Purchase => "Purchase",
            TransactionType::Recurring => "Recurring",
        }
    }
}

/// One-time charge request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Amount in gateway minor units
    pub total_amount: i64,
    pub currency_code: String,
    pub invoice_reference: String,
    pub invoice_description: String,
    pub token_customer_id: String,
    pub transaction_type: TransactionType,
    /// Free-form fields extensions may attach
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

/// Gateway answer to a charge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl TransactionResponse {
    /// Gateway error codes, if any were reported
    pub fn error_codes(&self) -> Option<&str> {
        self.errors
            .as_deref()
            .map(str::trim)
            .filter(|codes| !codes.is_empty())
    }

    /// True only when the gateway explicitly approved the transaction
    pub fn is_approved(&self) -> bool {
        self.transaction_status == Some(true)
    }
}

/// Recurring plan template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    /// Amount per period in gateway minor units
    pub amount: i64,
    pub currency: String,
    pub interval: Interval,
    pub interval_count: u32,
}

/// Plan created at the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub interval: Interval,
    pub interval_count: u32,
}

/// One plan within a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub plan: String,
    pub quantity: u32,
}

/// Subscribe a customer to a set of plans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub customer: String,
    pub items: Vec<SubscriptionItem>,
}

/// Subscription created at the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub customer: String,
    #[serde(default)]
    pub status: String,
}

/// Card-tokenizing payment gateway.
///
/// All calls are remote and are awaited one at a time for a given payment.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Tokenize a card as a gateway customer.
    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<CustomerResponse>;

    /// Charge a token customer.
    ///
    /// Declines are reported inside the response (`errors`,
    /// `transaction_status`), not as `Err`.
    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> PaymentResult<TransactionResponse>;

    /// Create a recurring plan.
    async fn create_plan(&self, request: PlanRequest) -> PaymentResult<Plan>;

    /// Subscribe a customer to previously created plans.
    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<GatewaySubscription>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Shared gateway handle (dynamic dispatch)
pub type BoxedGateway = Arc<dyn Gateway>;

/// Run a gateway call with a time budget
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, call: F) -> PaymentResult<T>
where
    F: Future<Output = PaymentResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PaymentError::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}

/// Decorator bounding every call of the wrapped gateway
pub struct TimeoutGateway {
    inner: BoxedGateway,
    limit: Duration,
}

impl TimeoutGateway {
    pub fn new(inner: BoxedGateway, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl Gateway for TimeoutGateway {
    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<CustomerResponse> {
        with_timeout(
            self.limit,
            "create_customer",
            self.inner.create_customer(request),
        )
        .await
    }

    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> PaymentResult<TransactionResponse> {
        with_timeout(
            self.limit,
            "create_transaction",
            self.inner.create_transaction(request),
        )
        .await
    }

    async fn create_plan(&self, request: PlanRequest) -> PaymentResult<Plan> {
        with_timeout(self.limit, "create_plan", self.inner.create_plan(request)).await
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<GatewaySubscription> {
        with_timeout(
            self.limit,
            "create_subscription",
            self.inner.create_subscription(request),
        )
        .await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, PaymentError>(1)
        };

        let err = with_timeout(Duration::from_secs(5), "create_transaction", slow)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentError::Timeout {
                operation: "create_transaction",
                secs: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result() {
        let value = with_timeout(Duration::from_secs(5), "create_plan", async {
            Ok::<_, PaymentError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_transaction_response_codes() {
        let response = TransactionResponse {
            errors: Some(" ".into()),
            ..TransactionResponse::default()
        };
        assert_eq!(response.error_codes(), None);
        assert!(!response.is_approved());

        let approved = TransactionResponse {
            transaction_status: Some(true),
            ..TransactionResponse::default()
        };
        assert!(approved.is_approved());
    }
}
