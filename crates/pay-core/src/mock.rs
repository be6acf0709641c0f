//! Mock gateway for testing the pipeline.
//!
//! Records every request, answers with deterministic ids, and can be told to
//! fail, decline or stall the next calls.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{
    CardSummary, CustomerRequest, CustomerResponse, Gateway, GatewaySubscription, Plan,
    PlanRequest, SubscriptionRequest, TransactionRequest, TransactionResponse,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    customers: Vec<CustomerRequest>,
    transactions: Vec<TransactionRequest>,
    plans: Vec<PlanRequest>,
    subscriptions: Vec<SubscriptionRequest>,
    customer_response: Option<CustomerResponse>,
    transaction_response: Option<TransactionResponse>,
    fail_next: Option<String>,
    delay: Option<Duration>,
    sequence: u64,
}

/// In-memory gateway that records calls
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next gateway call return a provider error
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    /// Stall every call for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Answer create-customer calls with this response
    pub fn respond_to_customers_with(&self, response: CustomerResponse) {
        self.state().customer_response = Some(response);
    }

    /// Answer create-transaction calls with this response
    pub fn respond_to_transactions_with(&self, response: TransactionResponse) {
        self.state().transaction_response = Some(response);
    }

    /// Go back to approving every transaction
    pub fn approve_transactions(&self) {
        self.state().transaction_response = None;
    }

    pub fn customer_requests(&self) -> Vec<CustomerRequest> {
        self.state().customers.clone()
    }

    pub fn transaction_requests(&self) -> Vec<TransactionRequest> {
        self.state().transactions.clone()
    }

    pub fn plan_requests(&self) -> Vec<PlanRequest> {
        self.state().plans.clone()
    }

    pub fn subscription_requests(&self) -> Vec<SubscriptionRequest> {
        self.state().subscriptions.clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.state().transactions.len()
    }

    /// Shared prologue: next id, optional stall, optional injected failure
    async fn begin(&self) -> PaymentResult<u64> {
        let (sequence, delay, failure) = {
            let mut state = self.state();
            state.sequence += 1;
            (state.sequence, state.delay, state.fail_next.take())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(message) => Err(PaymentError::ProviderError {
                provider: "mock".to_string(),
                message,
            }),
            None => Ok(sequence),
        }
    }
}

fn mask(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("XXXXXXXXXXXX{tail}")
}

#[async_trait]
impl Gateway for MockGateway {
    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<CustomerResponse> {
        self.state().customers.push(request.clone());
        let sequence = self.begin().await?;

        if let Some(response) = self.state().customer_response.clone() {
            return Ok(response);
        }

        Ok(CustomerResponse {
            token_customer_id: Some(format!("tok_mock_{sequence}")),
            card: Some(CardSummary {
                name: request.card.name.clone(),
                number: mask(&request.card.number),
                expiry_month: request.card.expiry_month.clone(),
                expiry_year: request.card.expiry_year.clone(),
            }),
            errors: None,
        })
    }

    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> PaymentResult<TransactionResponse> {
        self.state().transactions.push(request.clone());
        let sequence = self.begin().await?;

        if let Some(response) = self.state().transaction_response.clone() {
            return Ok(response);
        }

        Ok(TransactionResponse {
            transaction_id: Some(format!("txn_mock_{sequence}")),
            transaction_status: Some(true),
            response_code: Some("00".to_string()),
            response_message: Some("A2000".to_string()),
            total_amount: Some(request.total_amount),
            errors: None,
        })
    }

    async fn create_plan(&self, request: PlanRequest) -> PaymentResult<Plan> {
        self.state().plans.push(request.clone());
        let sequence = self.begin().await?;

        Ok(Plan {
            id: format!("plan_mock_{sequence}"),
            amount: request.amount,
            currency: request.currency,
            interval: request.interval,
            interval_count: request.interval_count,
        })
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<GatewaySubscription> {
        self.state().subscriptions.push(request.clone());
        let sequence = self.begin().await?;

        Ok(GatewaySubscription {
            id: format!("sub_mock_{sequence}"),
            customer: request.customer,
            status: "active".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask("4444 3333 2222 1111"), "XXXXXXXXXXXX1111");
        assert_eq!(mask("12"), "XXXXXXXXXXXX12");
    }
}
