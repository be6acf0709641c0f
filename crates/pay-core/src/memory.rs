//! In-memory store implementations.
//!
//! Backed by `tokio::sync::RwLock` maps. Used by the API binary when no
//! external persistence is wired in, and by tests.

use crate::error::PaymentResult;
use crate::order::{Invoice, Order, Subscription};
use crate::payment::Payment;
use crate::product::{Product, ProductCatalog};
use crate::profile::StoredPaymentProfile;
use crate::store::{InvoiceStore, PaymentStore, ProductStore, ProfileStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<String, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn get(&self, id: &str) -> PaymentResult<Option<Payment>> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn save(&self, payment: &Payment) -> PaymentResult<()> {
        self.payments
            .write()
            .await
            .insert(payment.id.clone(), payment.clone());
        Ok(())
    }
}

/// Profiles keyed by user id
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, StoredPaymentProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_user(&self, user_id: &str) -> PaymentResult<Option<StoredPaymentProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn save(&self, profile: &StoredPaymentProfile) -> PaymentResult<()> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<String, Invoice>>,
    orders: RwLock<HashMap<String, Order>>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_invoice(&self, invoice: Invoice) {
        self.invoices
            .write()
            .await
            .insert(invoice.id.clone(), invoice);
    }

    pub async fn insert_order(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id.clone(), subscription);
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn invoice(&self, id: &str) -> PaymentResult<Option<Invoice>> {
        Ok(self.invoices.read().await.get(id).cloned())
    }

    async fn order(&self, id: &str) -> PaymentResult<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn subscription(&self, id: &str) -> PaymentResult<Option<Subscription>> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> PaymentResult<()> {
        self.insert_subscription(subscription.clone()).await;
        Ok(())
    }
}

/// Read-only product store over a loaded catalog
#[derive(Default)]
pub struct CatalogProductStore {
    catalog: ProductCatalog,
}

impl CatalogProductStore {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self { catalog }
    }

    pub fn len(&self) -> usize {
        self.catalog.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.products.is_empty()
    }
}

#[async_trait]
impl ProductStore for CatalogProductStore {
    async fn product(&self, id: &str) -> PaymentResult<Option<Product>> {
        Ok(self.catalog.get(id).cloned())
    }
}
