//! # Store Traits
//!
//! Persistence seams used by the pipeline. Implementations are external; an
//! in-memory set lives in [`crate::memory`].

use crate::error::PaymentResult;
use crate::order::{Invoice, Order, Subscription};
use crate::payment::Payment;
use crate::product::Product;
use crate::profile::StoredPaymentProfile;
use async_trait::async_trait;
use std::sync::Arc;

/// Payment records
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get(&self, id: &str) -> PaymentResult<Option<Payment>>;

    /// Insert or replace
    async fn save(&self, payment: &Payment) -> PaymentResult<()>;
}

/// Stored payment profiles keyed by user
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> PaymentResult<Option<StoredPaymentProfile>>;

    /// Insert or replace
    async fn save(&self, profile: &StoredPaymentProfile) -> PaymentResult<()>;
}

/// Invoices, orders and subscription records
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn invoice(&self, id: &str) -> PaymentResult<Option<Invoice>>;

    async fn order(&self, id: &str) -> PaymentResult<Option<Order>>;

    async fn subscription(&self, id: &str) -> PaymentResult<Option<Subscription>>;

    async fn save_subscription(&self, subscription: &Subscription) -> PaymentResult<()>;
}

/// Product lookup
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn product(&self, id: &str) -> PaymentResult<Option<Product>>;
}

pub type BoxedPaymentStore = Arc<dyn PaymentStore>;
pub type BoxedProfileStore = Arc<dyn ProfileStore>;
pub type BoxedInvoiceStore = Arc<dyn InvoiceStore>;
pub type BoxedProductStore = Arc<dyn ProductStore>;

/// Every store the pipeline reads or writes
#[derive(Clone)]
pub struct Stores {
    pub payments: BoxedPaymentStore,
    pub profiles: BoxedProfileStore,
    pub invoices: BoxedInvoiceStore,
    pub products: BoxedProductStore,
}
