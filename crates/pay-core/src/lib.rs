//! # pay-core
//!
//! Core types, traits and the payment execution pipeline for eway-checkout.
//!
//! This crate provides:
//! - `PaymentExecutor`, the orchestrator that drives a payment to completion
//! - `SourceResolver` for saved-card lookup and new-card tokenization
//! - `SubscriptionBiller` for recurring plans and subscriptions
//! - `KeyedLock`, one in-flight charge per payment id
//! - `Gateway` and the store traits the pipeline talks to
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{PaymentExecutor, PaymentOutcome, Stores};
//!
//! let executor = PaymentExecutor::builder(gateway, stores)
//!     .with_timeout(Duration::from_secs(20))
//!     .build();
//!
//! match executor.pay("pay_123").await? {
//!     PaymentOutcome::Charged | PaymentOutcome::Completed => { /* paid */ }
//!     PaymentOutcome::Failed => { /* see payment.error */ }
//!     PaymentOutcome::Skipped => {}
//! }
//! ```

pub mod amount;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod hooks;
pub mod lock;
pub mod memory;
pub mod method;
pub mod order;
pub mod payment;
pub mod product;
pub mod profile;
pub mod source;
pub mod store;
pub mod subscription;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use executor::{PaymentExecutor, PaymentExecutorBuilder, PaymentOutcome, PaymentStage};
pub use gateway::{
    BoxedGateway, CardDetails, CardSummary, CustomerRequest, CustomerResponse, Gateway,
    GatewaySubscription, Plan, PlanRequest, SubscriptionItem, SubscriptionRequest,
    TimeoutGateway, TransactionRequest, TransactionResponse, TransactionType,
};
pub use hooks::{Hooks, LinePriceEvent, PaymentHook};
pub use lock::{KeyedGuard, KeyedLock};
pub use method::{MethodLister, PaymentMethodEntry};
pub use order::{Interval, Invoice, Line, LineOpts, Order, Period, PlanRef, Subscription};
pub use payment::{
    CardExpiry, CardInput, MethodData, Payment, PaymentData, PaymentFailure, PaymentMethod,
};
pub use product::{CatalogPricing, Price, Pricing, Product, ProductCatalog, ProductType};
pub use profile::{Card, SanitisedProfile, StoredPaymentProfile};
pub use source::{ChargeSource, SourceResolver};
pub use store::{InvoiceStore, PaymentStore, ProductStore, ProfileStore, Stores};
pub use subscription::{BillingContext, BilledItem, SubscriptionBiller, SubscriptionBilling};
