//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! The invoicing side posts materialized payments, invoices and orders; the
//! handlers store them and run the payment pipeline.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use pay_core::{
    Invoice, InvoiceStore, Order, Payment, PaymentError, PaymentMethodEntry, PaymentOutcome,
    PaymentStore, Subscription,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Checkout request: everything the pipeline needs for one payment
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub payment: Payment,
    pub invoice: Invoice,
    /// Orders covered by the invoice
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Subscriptions created for those orders
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

/// Pipeline result
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub outcome: PaymentOutcome,
    /// Payment as stored after the run
    pub payment: Payment,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "eway-checkout",
        "provider": state.executor.provider_name(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Store a checkout's records and run the payment pipeline
#[instrument(skip(state, request), fields(payment_id = %request.payment.id))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let CheckoutRequest {
        payment,
        invoice,
        orders,
        subscriptions,
    } = request;

    if payment.invoice != invoice.id {
        return Err(payment_error_to_response(PaymentError::InvalidRequest(
            format!(
                "Payment {} is for invoice {}, not {}",
                payment.id, payment.invoice, invoice.id
            ),
        )));
    }

    info!(
        "Checkout: invoice={}, {} orders, {} subscriptions, amount={} {}",
        invoice.id,
        orders.len(),
        subscriptions.len(),
        payment.amount,
        payment.currency
    );

    // A settled payment is never replaced by a resubmission, nor are its records
    let existing = state
        .payments
        .get(&payment.id)
        .await
        .map_err(payment_error_to_response)?;
    if existing.is_some_and(|p| p.is_settled()) {
        info!(payment_id = %payment.id, "Payment already settled, keeping stored records");
        return run_payment(&state, &payment.id).await;
    }

    for order in orders {
        state.invoices.insert_order(order).await;
    }
    for subscription in subscriptions {
        // Billed subscriptions keep their gateway plan and charge
        let stored = state
            .invoices
            .subscription(&subscription.id)
            .await
            .map_err(payment_error_to_response)?;
        if stored.is_some_and(|s| s.charge.is_some()) {
            continue;
        }
        state.invoices.insert_subscription(subscription).await;
    }
    state.invoices.insert_invoice(invoice).await;

    state
        .payments
        .save(&payment)
        .await
        .map_err(payment_error_to_response)?;

    run_payment(&state, &payment.id).await
}

/// Re-run the pipeline for a stored payment
#[instrument(skip(state))]
pub async fn pay_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    run_payment(&state, &payment_id).await
}

/// Get a stored payment
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .get(&payment_id)
        .await
        .map_err(payment_error_to_response)?
        .ok_or_else(|| payment_error_to_response(PaymentError::not_found("Payment", &payment_id)))?;

    Ok(Json(payment))
}

/// Payment-method listing entry for a user
pub async fn list_methods(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PaymentMethodEntry>, ApiError> {
    let entry = state
        .methods
        .method_for(Some(&user_id))
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(entry))
}

async fn run_payment(state: &AppState, payment_id: &str) -> Result<Json<CheckoutResponse>, ApiError> {
    let outcome = state.executor.pay(payment_id).await.map_err(|e| {
        error!("Payment pipeline failed: {}", e);
        payment_error_to_response(e)
    })?;

    let payment = state
        .payments
        .get(payment_id)
        .await
        .map_err(payment_error_to_response)?
        .ok_or_else(|| payment_error_to_response(PaymentError::not_found("Payment", payment_id)))?;

    Ok(Json(CheckoutResponse { outcome, payment }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_payment_error_conversion() {
        let err = PaymentError::InvalidRequest("Bad data".to_string());
        let (status, json) = payment_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.details.is_none());

        let (status, json) = payment_error_to_response(PaymentError::Timeout {
            operation: "create_transaction",
            secs: 30,
        });
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json.details.as_deref(), Some("retryable"));
    }
}
