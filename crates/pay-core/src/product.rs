//! # Product Types
//!
//! Product catalog types and the pricing helper used when splitting invoices.
//! Products are loaded from `config/products.toml`.

use crate::error::PaymentResult;
use crate::order::{LineOpts, Period};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// One-off purchase
    #[default]
    Simple,
    /// Billed on a recurring period
    Subscription,
}

/// A unit price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Decimal,
}

impl Price {
    pub fn new(amount: Decimal) -> Self {
        Self { amount }
    }
}

/// Unit price for one subscription period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPrice {
    pub period: Period,
    pub price: Decimal,
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,

    #[serde(default)]
    pub sku: String,

    /// Display title
    pub title: String,

    #[serde(default, rename = "type")]
    pub product_type: ProductType,

    /// Base unit price
    pub price: Decimal,

    /// Per-period unit prices for subscription products
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<PeriodPrice>,
}

impl Product {
    /// Create a one-off product
    pub fn simple(id: impl Into<String>, title: impl Into<String>, price: Decimal) -> Self {
        let id = id.into();
        Self {
            sku: id.clone(),
            id,
            title: title.into(),
            product_type: ProductType::Simple,
            price,
            periods: Vec::new(),
        }
    }

    /// Create a subscription product
    pub fn subscription(id: impl Into<String>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            product_type: ProductType::Subscription,
            ..Self::simple(id, title, price)
        }
    }

    /// Builder: set the unit price for one period
    pub fn with_period_price(mut self, period: Period, price: Decimal) -> Self {
        self.periods.retain(|p| p.period != period);
        self.periods.push(PeriodPrice { period, price });
        self
    }

    /// Unit price for a period, if the product defines one
    pub fn period_price(&self, period: Period) -> Option<Decimal> {
        self.periods
            .iter()
            .find(|p| p.period == period)
            .map(|p| p.price)
    }

    pub fn is_subscription(&self) -> bool {
        self.product_type == ProductType::Subscription
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Pricing helper: unit price of a product for the given line options
#[async_trait]
pub trait Pricing: Send + Sync {
    async fn price(&self, product: &Product, opts: &LineOpts) -> PaymentResult<Price>;
}

/// Prices straight from the catalog entry
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogPricing;

#[async_trait]
impl Pricing for CatalogPricing {
    async fn price(&self, product: &Product, opts: &LineOpts) -> PaymentResult<Price> {
        let amount = opts
            .period
            .and_then(|period| product.period_price(period))
            .unwrap_or(product.price);
        Ok(Price::new(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_catalog_pricing_uses_period_price() {
        let product = Product::subscription("box", "Monthly Box", dec!(12.00))
            .with_period_price(Period::Annually, dec!(120.00));

        let annual = LineOpts {
            period: Some(Period::Annually),
            ..LineOpts::default()
        };
        let weekly = LineOpts {
            period: Some(Period::Weekly),
            ..LineOpts::default()
        };

        assert_eq!(
            CatalogPricing.price(&product, &annual).await.unwrap().amount,
            dec!(120.00)
        );
        assert_eq!(
            CatalogPricing.price(&product, &weekly).await.unwrap().amount,
            dec!(12.00)
        );
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ProductCatalog::from_toml(
            r#"
            [[products]]
            id = "coffee"
            title = "Coffee Beans"
            price = "18.50"

            [[products]]
            id = "club"
            title = "Coffee Club"
            type = "subscription"
            price = "15.00"

            [[products.periods]]
            period = "monthly"
            price = "15.00"

            [[products.periods]]
            period = "annually"
            price = "160.00"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.products.len(), 2);
        // Untyped products are one-off purchases
        assert_eq!(catalog.get("coffee").unwrap().product_type, ProductType::Simple);
        assert_eq!(ProductType::default(), ProductType::Simple);

        let club = catalog.get("club").unwrap();
        assert!(club.is_subscription());
        assert_eq!(club.period_price(Period::Annually), Some(dec!(160.00)));
    }
}
