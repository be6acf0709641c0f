//! # Subscription Billing
//!
//! Splits invoice lines into recurring and one-time parts, creates one
//! gateway plan per subscription and a single gateway subscription bundling
//! them, then stores the plan and charge references on each domain record.
//!
//! ```text
//! lines ──► price + line_price hook ──► billed items ──► keep `subscription`
//!                                                          │
//!   subscriptions ──► match (product, period) ◄────────────┘
//!                        │ all matched?
//!                        ▼
//!                  create_plan × N ──► create_subscription ──► save records
//! ```

use crate::amount;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{
    BoxedGateway, GatewaySubscription, Plan, PlanRequest, SubscriptionItem, SubscriptionRequest,
};
use crate::hooks::{Hooks, LinePriceEvent};
use crate::order::{Line, Order, Period, PlanRef, Subscription};
use crate::product::{Pricing, ProductType};
use crate::source::ChargeSource;
use crate::store::{BoxedInvoiceStore, BoxedProductStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything the biller needs about the invoice being paid
#[derive(Debug, Clone, Copy)]
pub struct BillingContext<'a> {
    pub lines: &'a [Line],
    pub orders: &'a [Order],
    pub subscriptions: &'a [Subscription],
    pub currency: &'a str,
    pub user: Option<&'a str>,
    pub source: &'a ChargeSource,
}

/// An invoice line after pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilledItem {
    pub sku: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ProductType,
    pub price: Decimal,
    pub amount: Decimal,
    pub period: Option<Period>,
    pub product: String,
    pub currency: String,
    pub quantity: u32,
}

impl BilledItem {
    fn is_recurring(&self) -> bool {
        self.item_type == ProductType::Subscription
    }
}

/// Result of billing an invoice's subscriptions
#[derive(Debug, Clone)]
pub struct SubscriptionBilling {
    /// Sum of `price * quantity` over recurring items
    pub total: Decimal,
    /// Plans created by this call
    pub plans: Vec<Plan>,
    /// `None` when every subscription was billed by an earlier attempt
    pub subscription: Option<GatewaySubscription>,
}

/// Creates gateway plans and subscriptions for recurring lines
pub struct SubscriptionBiller {
    gateway: BoxedGateway,
    products: BoxedProductStore,
    invoices: BoxedInvoiceStore,
    pricing: Arc<dyn Pricing>,
    hooks: Hooks,
}

impl SubscriptionBiller {
    pub fn new(
        gateway: BoxedGateway,
        products: BoxedProductStore,
        invoices: BoxedInvoiceStore,
        pricing: Arc<dyn Pricing>,
    ) -> Self {
        Self {
            gateway,
            products,
            invoices,
            pricing,
            hooks: Hooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Price every line, firing the `line_price` hook
    pub async fn billed_items(&self, ctx: &BillingContext<'_>) -> PaymentResult<Vec<BilledItem>> {
        let order = match ctx.orders {
            [only] => Some(only.id.clone()),
            _ => None,
        };

        let mut items = Vec::with_capacity(ctx.lines.len());
        for line in ctx.lines {
            let product = self
                .products
                .product(&line.product)
                .await?
                .ok_or_else(|| PaymentError::not_found("Product", &line.product))?;

            let qty = line.quantity();
            let price = self.pricing.price(&product, &line.opts).await?;

            let mut event = LinePriceEvent {
                amount: price.amount * Decimal::from(qty),
                product,
                qty,
                opts: line.opts.clone(),
                user: ctx.user.map(str::to_string),
                order: order.clone(),
                price,
            };
            self.hooks.line_price(&mut event);

            let sku = std::iter::once(event.product.sku.clone())
                .chain(event.opts.values())
                .collect::<Vec<_>>()
                .join("_");

            items.push(BilledItem {
                sku,
                name: event.product.title,
                item_type: event.product.product_type,
                price: event.price.amount,
                amount: event.amount,
                period: event.opts.period,
                product: event.product.id,
                currency: ctx.currency.to_string(),
                quantity: qty,
            });
        }

        Ok(items)
    }

    /// Bill every subscription of the invoice.
    ///
    /// Fails with [`PaymentError::Integrity`] before any gateway call if a
    /// subscription has no matching recurring line. Subscriptions that
    /// already carry a gateway `charge` still count toward `total` but are
    /// not sent to the gateway again.
    #[instrument(skip(self, ctx), fields(subscriptions = ctx.subscriptions.len()))]
    pub async fn bill(&self, ctx: &BillingContext<'_>) -> PaymentResult<SubscriptionBilling> {
        let items: Vec<BilledItem> = self
            .billed_items(ctx)
            .await?
            .into_iter()
            .filter(BilledItem::is_recurring)
            .collect();

        let total: Decimal = items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();

        let mut matched = Vec::with_capacity(ctx.subscriptions.len());
        for subscription in ctx.subscriptions {
            let item = items
                .iter()
                .find(|item| {
                    item.product == subscription.product
                        && item.period == Some(subscription.period)
                })
                .ok_or_else(|| {
                    warn!(subscription = %subscription.id, "no invoice line for subscription");
                    PaymentError::Integrity(format!(
                        "Subscription {} has no matching {} line for product {}",
                        subscription.id, subscription.period, subscription.product
                    ))
                })?;
            matched.push((subscription, item));
        }

        let (billed, matched): (Vec<_>, Vec<_>) = matched
            .into_iter()
            .partition(|(subscription, _)| subscription.charge.is_some());
        if !billed.is_empty() {
            debug!(billed = billed.len(), "skipping subscriptions billed earlier");
        }
        if matched.is_empty() {
            return Ok(SubscriptionBilling {
                total,
                plans: Vec::new(),
                subscription: None,
            });
        }

        let mut plans = Vec::with_capacity(matched.len());
        for (subscription, item) in &matched {
            let (interval, interval_count) = subscription.period.interval();
            let plan = self
                .gateway
                .create_plan(PlanRequest {
                    name: format!("Subscription #{}", subscription.id),
                    amount: amount::normalize(item.price, &item.currency)?,
                    currency: item.currency.clone(),
                    interval,
                    interval_count,
                })
                .await?;
            debug!(plan = %plan.id, subscription = %subscription.id, "created plan");
            plans.push(plan);
        }

        let request = SubscriptionRequest {
            customer: ctx.source.billing_customer().to_string(),
            items: plans
                .iter()
                .zip(&matched)
                .map(|(plan, (_, item))| SubscriptionItem {
                    plan: plan.id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
        };
        let gateway_subscription = self.gateway.create_subscription(request).await?;

        for (plan, (subscription, _)) in plans.iter().zip(&matched) {
            let mut record = (*subscription).clone();
            record.plan = Some(PlanRef {
                id: plan.id.clone(),
                amount: plan.amount,
                interval: plan.interval,
                interval_count: plan.interval_count,
            });
            record.charge = Some(gateway_subscription.id.clone());
            self.invoices.save_subscription(&record).await?;
        }

        info!(
            subscription = %gateway_subscription.id,
            plans = plans.len(),
            total = %total,
            "Billed subscriptions"
        );

        Ok(SubscriptionBilling {
            total,
            plans,
            subscription: Some(gateway_subscription),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::PaymentHook;
    use crate::memory::{CatalogProductStore, InMemoryInvoiceStore};
    use crate::mock::MockGateway;
    use crate::order::Interval;
    use crate::product::{CatalogPricing, Product, ProductCatalog};
    use crate::store::InvoiceStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        gateway: Arc<MockGateway>,
        invoices: Arc<InMemoryInvoiceStore>,
        biller: SubscriptionBiller,
    }

    fn fixture() -> Fixture {
        let mut catalog = ProductCatalog::new();
        catalog.add(Product::simple("mug", "Mug", dec!(5.00)));
        catalog.add(
            Product::subscription("club", "Coffee Club", dec!(12.00))
                .with_period_price(Period::Monthly, dec!(10.00)),
        );

        let gateway = Arc::new(MockGateway::new());
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let biller = SubscriptionBiller::new(
            gateway.clone(),
            Arc::new(CatalogProductStore::new(catalog)),
            invoices.clone(),
            Arc::new(CatalogPricing),
        );

        Fixture {
            gateway,
            invoices,
            biller,
        }
    }

    fn lines() -> Vec<Line> {
        vec![
            Line::new("club", 2).with_period(Period::Monthly),
            Line::new("mug", 1),
        ]
    }

    fn context<'a>(
        lines: &'a [Line],
        orders: &'a [Order],
        subscriptions: &'a [Subscription],
        source: &'a ChargeSource,
    ) -> BillingContext<'a> {
        BillingContext {
            lines,
            orders,
            subscriptions,
            currency: "aud",
            user: Some("user_1"),
            source,
        }
    }

    #[tokio::test]
    async fn test_recurring_total_excludes_one_time_lines() {
        let f = fixture();
        let lines = lines();
        let orders = vec![Order::new("o1")];
        let subs = vec![Subscription::new("s1", "o1", "club", Period::Monthly)];
        let source = ChargeSource::token("tok_1");

        let billing = f
            .biller
            .bill(&context(&lines, &orders, &subs, &source))
            .await
            .unwrap();

        assert_eq!(billing.total, dec!(20.00));
        assert_eq!(billing.plans.len(), 1);

        let plans = f.gateway.plan_requests();
        assert_eq!(plans[0].name, "Subscription #s1");
        assert_eq!(plans[0].amount, 1000);
        assert_eq!(plans[0].interval, Interval::Month);
        assert_eq!(plans[0].interval_count, 1);

        let requests = f.gateway.subscription_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].customer, "tok_1");
        assert_eq!(requests[0].items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_subscription_records_are_updated() {
        let f = fixture();
        let lines = lines();
        let orders = vec![Order::new("o1")];
        let subs = vec![Subscription::new("s1", "o1", "club", Period::Monthly)];
        let source = ChargeSource {
            source: "tok_1".into(),
            customer: Some("cust_9".into()),
        };

        let billing = f
            .biller
            .bill(&context(&lines, &orders, &subs, &source))
            .await
            .unwrap();

        let stored = f.invoices.subscription("s1").await.unwrap().unwrap();
        assert_eq!(stored.plan.unwrap().id, billing.plans[0].id);
        assert_eq!(stored.charge, billing.subscription.map(|s| s.id));
        assert_eq!(f.gateway.subscription_requests()[0].customer, "cust_9");
    }

    #[tokio::test]
    async fn test_billed_subscription_is_not_sent_again() {
        let f = fixture();
        let lines = lines();
        let orders = vec![Order::new("o1")];
        let mut sub = Subscription::new("s1", "o1", "club", Period::Monthly);
        sub.charge = Some("sub_existing".into());
        let subs = vec![sub];
        let source = ChargeSource::token("tok_1");

        let billing = f
            .biller
            .bill(&context(&lines, &orders, &subs, &source))
            .await
            .unwrap();

        assert_eq!(billing.total, dec!(20.00));
        assert!(billing.plans.is_empty());
        assert!(billing.subscription.is_none());
        assert!(f.gateway.plan_requests().is_empty());
        assert!(f.gateway.subscription_requests().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_subscription_is_integrity_fault() {
        let f = fixture();
        let lines = lines();
        let orders = vec![Order::new("o1")];
        // Matches on product and period: the line is monthly
        let subs = vec![
            Subscription::new("s1", "o1", "club", Period::Monthly),
            Subscription::new("s2", "o1", "club", Period::Annually),
        ];
        let source = ChargeSource::token("tok_1");

        let err = f
            .biller
            .bill(&context(&lines, &orders, &subs, &source))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Integrity(_)));
        assert!(f.gateway.plan_requests().is_empty());
        assert!(f.gateway.subscription_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let f = fixture();
        let lines = vec![Line::new("ghost", 1)];
        let source = ChargeSource::token("tok_1");

        let err = f
            .biller
            .bill(&context(&lines, &[], &[], &source))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::NotFound { entity: "Product", .. }));
    }

    #[tokio::test]
    async fn test_line_price_hook_changes_total() {
        struct HalfPrice;

        impl PaymentHook for HalfPrice {
            fn line_price(&self, event: &mut LinePriceEvent) {
                event.price.amount /= dec!(2);
                event.amount = event.price.amount * Decimal::from(event.qty);
            }
        }

        let f = fixture();
        let biller = f.biller.with_hooks(Hooks::new().with_hook(Arc::new(HalfPrice)));
        let lines = lines();
        let orders = vec![Order::new("o1")];
        let subs = vec![Subscription::new("s1", "o1", "club", Period::Monthly)];
        let source = ChargeSource::token("tok_1");

        let billing = biller
            .bill(&context(&lines, &orders, &subs, &source))
            .await
            .unwrap();

        assert_eq!(billing.total, dec!(10.00));
        assert_eq!(f.gateway.plan_requests()[0].amount, 500);
    }

    #[tokio::test]
    async fn test_billed_item_sku_includes_options() {
        let f = fixture();
        let mut line = Line::new("club", 1).with_period(Period::Monthly);
        line.opts.extra.insert("grind".into(), "fine".into());
        let lines = vec![line];
        let source = ChargeSource::token("tok_1");

        let items = f
            .biller
            .billed_items(&context(&lines, &[], &[], &source))
            .await
            .unwrap();

        assert_eq!(items[0].sku, "club_monthly_fine");
        assert_eq!(items[0].currency, "aud");
        assert_eq!(items[0].price, dec!(10.00));
    }
}
