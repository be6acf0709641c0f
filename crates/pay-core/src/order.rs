//! # Order Types
//!
//! Invoices, orders, lines and subscription records. Everything except
//! [`Subscription`] is read-only input materialized by the invoicing side.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gateway billing interval unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Week,
    Month,
    Year,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }
}

/// Subscription billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
    Quarterly,
    Biannually,
    Annually,
}

impl Period {
    /// Gateway interval and interval count for this period
    pub fn interval(&self) -> (Interval, u32) {
        match self {
            Period::Weekly => (Interval::Week, 1),
            Period::Monthly => (Interval::Month, 1),
            Period::Quarterly => (Interval::Month, 3),
            Period::Biannually => (Interval::Month, 6),
            Period::Annually => (Interval::Year, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Biannually => "biannually",
            Period::Annually => "annually",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line options (subscription period plus free-form product options)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl LineOpts {
    /// Option values in a stable order, used to build line SKUs
    pub fn values(&self) -> Vec<String> {
        self.period
            .map(|p| p.as_str().to_string())
            .into_iter()
            .chain(self.extra.values().cloned())
            .collect()
    }
}

/// A line on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Product id
    pub product: String,

    #[serde(default)]
    pub sku: String,

    /// Quantity (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,

    /// Unit price as captured by the invoice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    /// Line total as captured by the invoice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    #[serde(default)]
    pub opts: LineOpts,
}

impl Line {
    pub fn new(product: impl Into<String>, qty: u32) -> Self {
        Self {
            product: product.into(),
            sku: String::new(),
            qty: Some(qty),
            price: None,
            amount: None,
            opts: LineOpts::default(),
        }
    }

    /// Builder: mark this line as recurring
    pub fn with_period(mut self, period: Period) -> Self {
        self.opts.period = Some(period);
        self
    }

    /// Builder: set the captured unit price
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self.amount = Some(price * Decimal::from(self.quantity()));
        self
    }

    pub fn quantity(&self) -> u32 {
        self.qty.unwrap_or(1)
    }
}

/// An invoice covering one or more orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,

    /// Order ids covered by this invoice
    #[serde(default)]
    pub orders: Vec<String>,

    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Invoice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            orders: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.orders.push(order_id.into());
        self
    }

    pub fn with_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }
}

/// An order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Subscription ids created for this order
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscriptions.push(subscription_id.into());
        self
    }
}

/// Gateway plan reference stored on a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRef {
    pub id: String,
    pub amount: i64,
    pub interval: Interval,
    pub interval_count: u32,
}

/// Recurring billing record linking an order to a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,

    /// Order that created the subscription
    pub order: String,

    /// Subscribed product id
    pub product: String,

    pub period: Period,

    /// Gateway plan, set once billed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanRef>,

    /// Gateway subscription id, set once billed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<String>,
}

impl Subscription {
    pub fn new(
        id: impl Into<String>,
        order: impl Into<String>,
        product: impl Into<String>,
        period: Period,
    ) -> Self {
        Self {
            id: id.into(),
            order: order.into(),
            product: product.into(),
            period,
            plan: None,
            charge: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_period_table() {
        assert_eq!(Period::Weekly.interval(), (Interval::Week, 1));
        assert_eq!(Period::Monthly.interval(), (Interval::Month, 1));
        assert_eq!(Period::Quarterly.interval(), (Interval::Month, 3));
        assert_eq!(Period::Biannually.interval(), (Interval::Month, 6));
        assert_eq!(Period::Annually.interval(), (Interval::Year, 1));
    }

    #[test]
    fn test_line_defaults() {
        let line: Line = serde_json::from_value(serde_json::json!({
            "product": "p1",
            "opts": { "period": "monthly", "color": "red" }
        }))
        .unwrap();

        assert_eq!(line.quantity(), 1);
        assert_eq!(line.opts.period, Some(Period::Monthly));
        assert_eq!(line.opts.extra.get("color"), Some(&"red".to_string()));
        assert_eq!(line.opts.values(), vec!["monthly", "red"]);
    }

    #[test]
    fn test_line_builder_amount() {
        let line = Line::new("p1", 3).with_price(dec!(4.50));
        assert_eq!(line.amount, Some(dec!(13.50)));
    }
}
