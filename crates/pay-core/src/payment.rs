//! # Payment Types
//!
//! The payment record driven by the executor, the method data supplied by the
//! client, and the `{id, text}` failure record written on payment-local errors.

use crate::gateway::TransactionResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Method type tag handled by this gateway
pub const METHOD_TYPE: &str = "eway";

/// Prefix of every failure id recorded on a payment
pub const ERROR_PREFIX: &str = "eway";

/// Failure ids recorded on payments
pub mod failure_ids {
    pub const NO_USER: &str = "eway.nouser";
    pub const NOT_FOUND: &str = "eway.notfound";
    pub const NO_TOKEN: &str = "eway.notoken";
    pub const DECLINED: &str = "eway.declined";
    pub const ERROR: &str = "eway.error";
    pub const INTEGRITY: &str = "eway.integrity";
}

/// Message shown to the customer for any card or charge rejection
pub const CARD_REJECTED_TEXT: &str =
    "Your card could not be charged. Please check your details or try another card.";

/// Card expiry as entered by the customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardExpiry {
    pub month: String,
    pub year: String,
}

/// Card fields submitted by the client.
///
/// Either `id` (a previously saved card) or the raw fields are set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CardInput {
    /// Saved card id chosen by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Cardholder name
    #[serde(default)]
    pub name: String,

    /// Card number
    #[serde(default, skip_serializing)]
    pub number: String,

    /// Card verification number
    #[serde(default, skip_serializing)]
    pub cvc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<CardExpiry>,
}

impl std::fmt::Debug for CardInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardInput")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("number", &"<redacted>")
            .field("cvc", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl CardInput {
    /// Reference a saved card
    pub fn saved(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Raw card details for tokenization
    pub fn new(
        name: impl Into<String>,
        number: impl Into<String>,
        cvc: impl Into<String>,
        month: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            number: number.into(),
            cvc: cvc.into(),
            expiry: Some(CardExpiry {
                month: month.into(),
                year: year.into(),
            }),
        }
    }

    /// Split the cardholder name into first name and the remainder
    pub fn split_name(&self) -> (String, String) {
        let name = self.name.trim();
        match name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.trim().to_string()),
            None => (name.to_string(), String::new()),
        }
    }
}

/// Method-specific data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodData {
    /// Gateway token supplied directly by a payment-request checkout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardInput>,

    /// Save a newly entered card to the user's profile
    #[serde(default)]
    pub save: bool,
}

/// The payment method selected for a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Method type tag (e.g. "eway")
    #[serde(rename = "type")]
    pub method_type: String,

    /// Payment-request flow: the client already holds a gateway token
    #[serde(default)]
    pub request: bool,

    #[serde(default)]
    pub data: MethodData,
}

impl PaymentMethod {
    /// Card checkout through this gateway
    pub fn card(card: CardInput, save: bool) -> Self {
        Self {
            method_type: METHOD_TYPE.to_string(),
            request: false,
            data: MethodData {
                id: None,
                card: Some(card),
                save,
            },
        }
    }

    /// Payment-request checkout with a pre-issued token
    pub fn request(token: impl Into<String>) -> Self {
        Self {
            method_type: METHOD_TYPE.to_string(),
            request: true,
            data: MethodData {
                id: Some(token.into()),
                card: None,
                save: false,
            },
        }
    }

    /// Whether this method is handled by this gateway
    pub fn is_eway(&self) -> bool {
        self.method_type == METHOD_TYPE
    }
}

/// Structured failure recorded on a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailure {
    pub id: String,
    pub text: String,
}

impl PaymentFailure {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn no_user() -> Self {
        Self::new(failure_ids::NO_USER, "Invalid user")
    }

    pub fn card_not_found() -> Self {
        Self::new(failure_ids::NOT_FOUND, "Credit card not found")
    }

    pub fn no_token() -> Self {
        Self::new(failure_ids::NO_TOKEN, "Payment request token missing")
    }

    /// System fault: the raw error text is kept for diagnostics
    pub fn system(err: impl std::fmt::Display) -> Self {
        Self::new(failure_ids::ERROR, err.to_string())
    }

    pub fn integrity(err: impl std::fmt::Display) -> Self {
        Self::new(failure_ids::INTEGRITY, err.to_string())
    }

    /// Gateway-reported error codes, e.g. `"V6000,V6011"` -> `eway.V6000`
    pub fn gateway_codes(codes: &str) -> Self {
        let first = codes
            .split(',')
            .map(str::trim)
            .find(|code| !code.is_empty())
            .unwrap_or("declined");
        Self::new(format!("{ERROR_PREFIX}.{first}"), CARD_REJECTED_TEXT)
    }

    /// Transaction rejected without gateway error codes
    pub fn declined(response_message: Option<&str>) -> Self {
        match response_message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(codes) => Self::gateway_codes(codes),
            None => Self::new(failure_ids::DECLINED, CARD_REJECTED_TEXT),
        }
    }

    /// Terminal failures stop any further attempt on the payment
    pub fn is_terminal(&self) -> bool {
        self.id == failure_ids::INTEGRITY
    }
}

/// Result payload stored on a successful payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentData {
    pub charge: TransactionResponse,
}

/// A payment created by the invoicing side and completed by the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,

    pub method: PaymentMethod,

    /// Amount before minor-unit conversion
    pub amount: Decimal,

    /// ISO currency code
    #[serde(default)]
    pub currency: String,

    /// Paying user (absent for guest checkout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Invoice being paid
    pub invoice: String,

    #[serde(default)]
    pub complete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentFailure>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PaymentData>,
}

impl Payment {
    /// Create a pending payment
    pub fn new(
        id: impl Into<String>,
        method: PaymentMethod,
        amount: Decimal,
        currency: impl Into<String>,
        invoice: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            method,
            amount,
            currency: currency.into(),
            user: None,
            invoice: invoice.into(),
            complete: false,
            error: None,
            data: None,
        }
    }

    /// Builder: set paying user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Record a payment-local failure
    pub fn fail(&mut self, failure: PaymentFailure) {
        self.error = Some(failure);
    }

    /// Whether the executor may still work on this payment
    pub fn is_settled(&self) -> bool {
        self.complete || self.error.as_ref().is_some_and(PaymentFailure::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gateway_codes_use_first_code() {
        let failure = PaymentFailure::gateway_codes("V6000,V6011");
        assert_eq!(failure.id, "eway.V6000");
        assert_eq!(failure.text, CARD_REJECTED_TEXT);
    }

    #[test]
    fn test_declined_without_message() {
        assert_eq!(PaymentFailure::declined(None).id, "eway.declined");
        assert_eq!(PaymentFailure::declined(Some("D4405")).id, "eway.D4405");
        assert_eq!(PaymentFailure::declined(Some(" ")).id, "eway.declined");
    }

    #[test]
    fn test_split_name() {
        let card = CardInput::new("Jane van Dyke", "4444333322221111", "123", "12", "30");
        assert_eq!(
            card.split_name(),
            ("Jane".to_string(), "van Dyke".to_string())
        );

        let single = CardInput::new("Cher", "4444333322221111", "123", "12", "30");
        assert_eq!(single.split_name(), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_card_debug_is_redacted() {
        let card = CardInput::new("Jane Doe", "4444333322221111", "123", "12", "30");
        let printed = format!("{:?}", card);
        assert!(!printed.contains("4444333322221111"));
        assert!(!printed.contains("123\""));
    }

    #[test]
    fn test_card_number_never_serialized() {
        let card = CardInput::new("Jane Doe", "4444333322221111", "123", "12", "30");
        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("4444333322221111"));
    }

    #[test]
    fn test_method_deserializes_from_client_shape() {
        let method: PaymentMethod = serde_json::from_value(serde_json::json!({
            "type": "eway",
            "data": { "card": { "id": "card_1" } }
        }))
        .unwrap();

        assert!(method.is_eway());
        assert!(!method.request);
        assert_eq!(
            method.data.card.and_then(|c| c.id),
            Some("card_1".to_string())
        );
    }

    #[test]
    fn test_settled_states() {
        let mut payment = Payment::new(
            "p1",
            PaymentMethod::request("tok"),
            dec!(10),
            "usd",
            "inv1",
        );
        assert!(!payment.is_settled());

        payment.fail(PaymentFailure::card_not_found());
        assert!(!payment.is_settled());

        payment.fail(PaymentFailure::integrity("no line"));
        assert!(payment.is_settled());
    }
}
