//! # Source Resolution
//!
//! Turns a payment's method data into a reusable [`ChargeSource`]: either a
//! saved card from the user's profile, or a freshly tokenized card.
//!
//! Payment-local failures are written to `payment.error` and reported as
//! `Ok(None)`. `Err` is reserved for store faults.

use crate::error::PaymentResult;
use crate::gateway::{BoxedGateway, CardDetails, CardSummary, CustomerRequest, DEFAULT_COUNTRY};
use crate::payment::{CardInput, Payment, PaymentFailure};
use crate::profile::{Card, StoredPaymentProfile};
use crate::store::BoxedProfileStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Token (and optional customer) to charge for one attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSource {
    pub source: String,
    pub customer: Option<String>,
}

impl ChargeSource {
    pub fn token(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            customer: None,
        }
    }

    /// Customer to bill recurring plans to; token customers double as one
    pub fn billing_customer(&self) -> &str {
        self.customer.as_deref().unwrap_or(&self.source)
    }
}

/// Resolves charge sources for card payments
pub struct SourceResolver {
    gateway: BoxedGateway,
    profiles: BoxedProfileStore,
    country: String,
}

impl SourceResolver {
    pub fn new(gateway: BoxedGateway, profiles: BoxedProfileStore) -> Self {
        Self {
            gateway,
            profiles,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Builder: country sent with new token customers
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Resolve the charge source for a payment
    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    pub async fn resolve(&self, payment: &mut Payment) -> PaymentResult<Option<ChargeSource>> {
        let user = payment.user.clone();
        let save = payment.method.data.save;

        let Some(card) = payment.method.data.card.clone() else {
            payment.fail(PaymentFailure::system("Card details missing"));
            return Ok(None);
        };

        let mut profile = match user.as_deref() {
            Some(user_id) => self.profiles.find_by_user(user_id).await?,
            None => None,
        };

        if let Some(card_id) = card.id.as_deref() {
            if user.is_none() {
                payment.fail(PaymentFailure::no_user());
                return Ok(None);
            }

            let source = profile.as_ref().and_then(|profile| {
                profile.card(card_id).map(|saved| ChargeSource {
                    source: saved.source.clone(),
                    customer: profile.customer.clone(),
                })
            });

            return match source {
                Some(source) => {
                    debug!(card_id, "using saved card");
                    Ok(Some(source))
                }
                None => {
                    payment.fail(PaymentFailure::card_not_found());
                    Ok(None)
                }
            };
        }

        let response = match self.gateway.create_customer(self.customer_request(&card)).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Tokenization failed: {}", e);
                payment.fail(PaymentFailure::system(&e));
                return Ok(None);
            }
        };

        if let Some(codes) = response
            .errors
            .as_deref()
            .map(str::trim)
            .filter(|codes| !codes.is_empty())
        {
            warn!(codes, "gateway rejected card");
            payment.fail(PaymentFailure::gateway_codes(codes));
            return Ok(None);
        }

        let Some(token) = response.token_customer_id.filter(|t| !t.is_empty()) else {
            payment.fail(PaymentFailure::system("Gateway returned no customer token"));
            return Ok(None);
        };

        info!("Tokenized new card");

        if save {
            if let Some(user_id) = user.as_deref() {
                let profile =
                    profile.get_or_insert_with(|| StoredPaymentProfile::new(user_id));
                profile.add_card(saved_card(&token, response.card, &card));
                self.profiles.save(profile).await?;
                debug!(user_id, cards = profile.cards.len(), "saved card to profile");
            }
        }

        Ok(Some(ChargeSource::token(token)))
    }

    fn customer_request(&self, card: &CardInput) -> CustomerRequest {
        let (first_name, last_name) = card.split_name();
        let (expiry_month, expiry_year) = card
            .expiry
            .as_ref()
            .map(|e| (e.month.clone(), e.year.clone()))
            .unwrap_or_default();

        CustomerRequest {
            title: "Mr.".to_string(),
            first_name,
            last_name,
            country: self.country.clone(),
            card: CardDetails {
                name: card.name.clone(),
                number: card.number.clone(),
                cvn: card.cvc.clone(),
                expiry_month,
                expiry_year,
            },
        }
    }
}

fn saved_card(token: &str, summary: Option<CardSummary>, input: &CardInput) -> Card {
    let summary = summary.unwrap_or_else(|| CardSummary {
        name: input.name.clone(),
        ..CardSummary::default()
    });

    Card {
        name: summary.name,
        number: summary.number,
        expiry_month: summary.expiry_month,
        expiry_year: summary.expiry_year,
        ..Card::new(token)
    }
}
