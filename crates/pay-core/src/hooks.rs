//! # Extension Hooks
//!
//! Typed extension points fired by the pipeline. Implement [`PaymentHook`] and
//! override only the events you care about; register it on [`Hooks`].

use crate::gateway::TransactionRequest;
use crate::order::{LineOpts, Order};
use crate::product::{Price, Product};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Price computation for one invoice line.
///
/// Listeners may change `price` and `amount`; the adjusted values are what
/// the subscription split uses.
#[derive(Debug, Clone)]
pub struct LinePriceEvent {
    pub product: Product,
    pub qty: u32,
    pub opts: LineOpts,
    pub user: Option<String>,
    /// Order the invoice was raised for, if it covers exactly one
    pub order: Option<String>,
    pub price: Price,
    pub amount: Decimal,
}

/// Pipeline extension point
#[allow(unused_variables)]
pub trait PaymentHook: Send + Sync {
    /// Called after the unit price of an invoice line is computed
    fn line_price(&self, event: &mut LinePriceEvent) {}

    /// Called once per order before the charge request is sent
    fn transaction_request(&self, order: &Order, request: &mut TransactionRequest) {}
}

/// Ordered set of registered hooks
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: Vec<Arc<dyn PaymentHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook (invoked in registration order)
    pub fn register(&mut self, hook: Arc<dyn PaymentHook>) {
        self.hooks.push(hook);
    }

    /// Register with builder pattern
    pub fn with_hook(mut self, hook: Arc<dyn PaymentHook>) -> Self {
        self.register(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn line_price(&self, event: &mut LinePriceEvent) {
        for hook in &self.hooks {
            hook.line_price(event);
        }
        debug!(
            product = %event.product.id,
            price = %event.price.amount,
            amount = %event.amount,
            "line priced"
        );
    }

    pub fn transaction_request(&self, order: &Order, request: &mut TransactionRequest) {
        for hook in &self.hooks {
            hook.transaction_request(order, request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::TransactionType;
    use rust_decimal_macros::dec;

    struct MemberDiscount;

    impl PaymentHook for MemberDiscount {
        fn line_price(&self, event: &mut LinePriceEvent) {
            if event.user.is_some() {
                event.price.amount -= dec!(1);
                event.amount = event.price.amount * Decimal::from(event.qty);
            }
        }
    }

    struct TagOrder;

    impl PaymentHook for TagOrder {
        fn transaction_request(&self, order: &Order, request: &mut TransactionRequest) {
            request
                .options
                .insert(format!("order:{}", order.id), "checkout".to_string());
        }
    }

    #[test]
    fn test_line_price_hooks_adjust_event() {
        let hooks = Hooks::new().with_hook(Arc::new(MemberDiscount));
        let mut event = LinePriceEvent {
            product: Product::simple("p1", "Beans", dec!(10)),
            qty: 2,
            opts: LineOpts::default(),
            user: Some("user_1".into()),
            order: None,
            price: Price::new(dec!(10)),
            amount: dec!(20),
        };

        hooks.line_price(&mut event);

        assert_eq!(event.price.amount, dec!(9));
        assert_eq!(event.amount, dec!(18));
    }

    #[test]
    fn test_transaction_request_hook_runs_per_order() {
        let hooks = Hooks::new()
            .with_hook(Arc::new(MemberDiscount))
            .with_hook(Arc::new(TagOrder));
        let mut request = TransactionRequest {
            total_amount: 100,
            currency_code: "aud".into(),
            invoice_reference: "inv_1".into(),
            invoice_description: "Payment ID p1".into(),
            token_customer_id: "tok".into(),
            transaction_type: TransactionType::Moto,
            options: Default::default(),
        };

        hooks.transaction_request(&Order::new("o1"), &mut request);
        hooks.transaction_request(&Order::new("o2"), &mut request);

        assert_eq!(hooks.len(), 2);
        assert_eq!(request.options.len(), 2);
        assert!(request.options.contains_key("order:o2"));
    }
}
