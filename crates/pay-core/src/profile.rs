//! # Stored Payment Profiles
//!
//! Per-user saved cards and gateway customer reference. Card `source` tokens
//! stay server-side; clients only ever see a [`SanitisedProfile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,

    /// Gateway token used to charge this card
    pub source: String,

    /// Cardholder name
    #[serde(default)]
    pub name: String,

    /// Masked card number as returned by the gateway
    #[serde(default)]
    pub number: String,

    #[serde(default)]
    pub expiry_month: String,

    #[serde(default)]
    pub expiry_year: String,

    pub created_at: DateTime<Utc>,
}

impl Card {
    /// New card with a generated id
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            name: String::new(),
            number: String::new(),
            expiry_month: String::new(),
            expiry_year: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// A user's stored payment profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPaymentProfile {
    pub id: String,

    pub user_id: String,

    /// Gateway customer reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    #[serde(default)]
    pub cards: Vec<Card>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredPaymentProfile {
    /// Empty profile for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            customer: None,
            cards: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Find a saved card by id
    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }

    /// Append a card; the first saved token becomes the customer reference
    pub fn add_card(&mut self, card: Card) {
        if self.customer.is_none() {
            self.customer = Some(card.source.clone());
        }
        self.cards.push(card);
        self.updated_at = Utc::now();
    }

    /// Client-safe view without card tokens
    pub fn sanitise(&self) -> SanitisedProfile {
        SanitisedProfile {
            id: Some(self.id.clone()),
            cards: self
                .cards
                .iter()
                .map(|card| SanitisedCard {
                    id: card.id.clone(),
                    name: card.name.clone(),
                    number: card.number.clone(),
                    expiry_month: card.expiry_month.clone(),
                    expiry_year: card.expiry_year.clone(),
                })
                .collect(),
        }
    }
}

/// Saved card as shown to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitisedCard {
    pub id: String,
    pub name: String,
    pub number: String,
    pub expiry_month: String,
    pub expiry_year: String,
}

/// Stored profile as shown to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitisedProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub cards: Vec<SanitisedCard>,
}
