//! # eWAY Rapid Client
//!
//! [`Gateway`] implementation over the eWAY Rapid REST API. Card tokenization
//! and charges go through the Direct Connection endpoint; recurring plans and
//! subscriptions through their own resources.

use crate::config::EwayConfig;
use async_trait::async_trait;
use pay_core::{
    CardSummary, CustomerRequest, CustomerResponse, Gateway, GatewaySubscription, Interval,
    PaymentError, PaymentResult, Plan, PlanRequest, SubscriptionRequest, TransactionRequest,
    TransactionResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "eway";

const DIRECT_PAYMENT_PATH: &str = "/DirectPayment.json";
const PLANS_PATH: &str = "/Plans";
const SUBSCRIPTIONS_PATH: &str = "/Subscriptions";

/// eWAY Rapid API client
pub struct EwayClient {
    config: EwayConfig,
    client: Client,
}

impl EwayClient {
    /// Create a new client
    pub fn new(config: EwayConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(EwayConfig::from_env()?)
    }

    pub fn config(&self) -> &EwayConfig {
        &self.config
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> PaymentResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.endpoint, path);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.password))
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("eWAY API error: status={}, body={}", status, body);

            let message = serde_json::from_str::<EwayErrorResponse>(&body)
                .ok()
                .and_then(EwayErrorResponse::message)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse eWAY response: {}", e))
        })
    }
}

#[async_trait]
impl Gateway for EwayClient {
    #[instrument(skip(self, request))]
    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<CustomerResponse> {
        let body = EwayDirectRequest {
            customer: EwayCustomer {
                token_customer_id: None,
                title: Some(request.title),
                first_name: Some(request.first_name),
                last_name: Some(request.last_name),
                country: Some(request.country),
                card_details: Some(EwayCardDetails {
                    name: request.card.name,
                    number: request.card.number,
                    expiry_month: request.card.expiry_month,
                    expiry_year: request.card.expiry_year,
                    cvn: Some(request.card.cvn),
                }),
            },
            payment: None,
            method: "CreateTokenCustomer",
            transaction_type: "Purchase",
        };

        let response: EwayDirectResponse = self.post(DIRECT_PAYMENT_PATH, &body).await?;
        let customer = response.customer.unwrap_or_default();

        let token_customer_id = id_string(customer.token_customer_id);
        if let Some(ref token) = token_customer_id {
            info!("Created eWAY token customer: {}", token);
        }

        Ok(CustomerResponse {
            token_customer_id,
            card: customer.card_details.map(|card| CardSummary {
                name: card.name,
                number: card.number,
                expiry_month: card.expiry_month,
                expiry_year: card.expiry_year,
            }),
            errors: non_empty(response.errors),
        })
    }

    #[instrument(skip(self, request), fields(invoice = %request.invoice_reference))]
    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> PaymentResult<TransactionResponse> {
        let body = EwayDirectRequest {
            customer: EwayCustomer {
                token_customer_id: Some(Value::String(request.token_customer_id)),
                ..EwayCustomer::default()
            },
            payment: Some(EwayPayment {
                total_amount: request.total_amount,
                invoice_reference: request.invoice_reference,
                invoice_description: request.invoice_description,
                currency_code: request.currency_code,
                options: request.options,
            }),
            method: "ProcessPayment",
            transaction_type: request.transaction_type.as_str(),
        };

        let response: EwayDirectResponse = self.post(DIRECT_PAYMENT_PATH, &body).await?;

        debug!(
            "eWAY transaction: status={:?}, message={:?}",
            response.transaction_status, response.response_message
        );

        Ok(TransactionResponse {
            transaction_id: id_string(response.transaction_id),
            transaction_status: response.transaction_status,
            response_code: non_empty(response.response_code),
            response_message: non_empty(response.response_message),
            total_amount: response.payment.map(|p| p.total_amount),
            errors: non_empty(response.errors),
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_plan(&self, request: PlanRequest) -> PaymentResult<Plan> {
        let body = EwayPlanRequest {
            name: &request.name,
            amount: request.amount,
            currency: &request.currency,
            interval: request.interval,
            interval_count: request.interval_count,
        };

        let response: EwayResourceResponse = self.post(PLANS_PATH, &body).await?;
        let id = response.into_id("plan")?;
        info!("Created eWAY plan: {}", id);

        Ok(Plan {
            id,
            amount: request.amount,
            currency: request.currency,
            interval: request.interval,
            interval_count: request.interval_count,
        })
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<GatewaySubscription> {
        let body = EwaySubscriptionRequest {
            token_customer_id: &request.customer,
            items: request
                .items
                .iter()
                .map(|item| EwaySubscriptionItem {
                    plan_id: &item.plan,
                    quantity: item.quantity,
                })
                .collect(),
        };

        let response: EwayResourceResponse = self.post(SUBSCRIPTIONS_PATH, &body).await?;
        let status = response.status.clone().unwrap_or_else(|| "active".to_string());
        let id = response.into_id("subscription")?;
        info!("Created eWAY subscription: {}", id);

        Ok(GatewaySubscription {
            id,
            customer: request.customer,
            status,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// eWAY ids arrive as numbers on some resources and strings on others
fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// eWAY API Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EwayDirectRequest<'a> {
    customer: EwayCustomer,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<EwayPayment>,
    method: &'a str,
    transaction_type: &'a str,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayCustomer {
    #[serde(rename = "TokenCustomerID", skip_serializing_if = "Option::is_none")]
    token_customer_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_details: Option<EwayCardDetails>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayCardDetails {
    #[serde(default)]
    name: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    expiry_month: String,
    #[serde(default)]
    expiry_year: String,
    #[serde(rename = "CVN", skip_serializing_if = "Option::is_none", default)]
    cvn: Option<String>,
}

impl std::fmt::Debug for EwayCardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EwayCardDetails")
            .field("name", &self.name)
            .field("number", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayPayment {
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    invoice_reference: String,
    #[serde(default)]
    invoice_description: String,
    #[serde(default)]
    currency_code: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayDirectResponse {
    #[serde(default)]
    customer: Option<EwayCustomer>,
    #[serde(default)]
    payment: Option<EwayPayment>,
    #[serde(default, rename = "TransactionID")]
    transaction_id: Option<Value>,
    #[serde(default)]
    transaction_status: Option<bool>,
    #[serde(default)]
    response_code: Option<String>,
    #[serde(default)]
    response_message: Option<String>,
    #[serde(default)]
    errors: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EwayPlanRequest<'a> {
    name: &'a str,
    amount: i64,
    currency: &'a str,
    interval: Interval,
    interval_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EwaySubscriptionRequest<'a> {
    #[serde(rename = "TokenCustomerID")]
    token_customer_id: &'a str,
    items: Vec<EwaySubscriptionItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EwaySubscriptionItem<'a> {
    #[serde(rename = "PlanID")]
    plan_id: &'a str,
    quantity: u32,
}

/// Response of the plan and subscription resources
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayResourceResponse {
    #[serde(default, alias = "PlanID", alias = "SubscriptionID", rename = "ID")]
    id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Option<String>,
}

impl EwayResourceResponse {
    fn into_id(self, resource: &str) -> PaymentResult<String> {
        if let Some(errors) = non_empty(self.errors) {
            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: errors,
            });
        }
        id_string(self.id).ok_or_else(|| PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("eWAY returned no {} id", resource),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EwayErrorResponse {
    #[serde(default)]
    errors: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl EwayErrorResponse {
    fn message(self) -> Option<String> {
        non_empty(self.errors).or_else(|| non_empty(self.message))
    }
}
