//! # pay-eway
//!
//! eWAY Rapid gateway client for eway-checkout-rs.
//!
//! [`EwayClient`] implements [`pay_core::Gateway`] over the Rapid REST API:
//!
//! - **create_customer** - tokenizes a card (`CreateTokenCustomer`)
//! - **create_transaction** - charges a token customer (`ProcessPayment`, MOTO)
//! - **create_plan** / **create_subscription** - recurring billing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_eway::EwayClient;
//! use pay_core::{PaymentExecutor, Stores};
//! use std::sync::Arc;
//!
//! // Create client from environment
//! let client = EwayClient::from_env()?;
//! let timeout = client.config().timeout;
//!
//! let executor = PaymentExecutor::builder(Arc::new(client), stores)
//!     .with_timeout(timeout)
//!     .build();
//!
//! executor.pay("pay_123").await?;
//! ```

pub mod client;
pub mod config;

// Re-exports
pub use client::EwayClient;
pub use config::{EwayConfig, PRODUCTION_ENDPOINT, SANDBOX_ENDPOINT};
