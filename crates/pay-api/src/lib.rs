//! # pay-api
//!
//! HTTP API layer for eway-checkout-rs.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/checkout` | Store checkout records and pay |
//! | GET | `/api/v1/payments/{id}` | Get payment |
//! | POST | `/api/v1/payments/{id}/pay` | Re-run payment |
//! | GET | `/api/v1/users/{user_id}/methods` | Payment-method entry |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
