//! Payment-method listing entry for the checkout page.

use crate::error::PaymentResult;
use crate::payment::METHOD_TYPE;
use crate::profile::SanitisedProfile;
use crate::store::BoxedProfileStore;
use serde::{Deserialize, Serialize};

/// One entry of the client-side payment method list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodEntry {
    #[serde(rename = "type")]
    pub method_type: String,

    /// Saved cards without their gateway tokens
    pub data: SanitisedProfile,

    /// Public client-side encryption key
    pub public: String,

    pub priority: i32,
}

/// Contributes the eWAY entry to the method list
pub struct MethodLister {
    profiles: BoxedProfileStore,
    client_key: String,
}

impl MethodLister {
    pub fn new(profiles: BoxedProfileStore, client_key: impl Into<String>) -> Self {
        Self {
            profiles,
            client_key: client_key.into(),
        }
    }

    /// Entry for a user, or a guest when `user_id` is `None`
    pub async fn method_for(&self, user_id: Option<&str>) -> PaymentResult<PaymentMethodEntry> {
        let data = match user_id {
            Some(user_id) => self
                .profiles
                .find_by_user(user_id)
                .await?
                .map(|profile| profile.sanitise())
                .unwrap_or_default(),
            None => SanitisedProfile::default(),
        };

        Ok(PaymentMethodEntry {
            method_type: METHOD_TYPE.to_string(),
            data,
            public: self.client_key.clone(),
            priority: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProfileStore;
    use crate::profile::{Card, StoredPaymentProfile};
    use crate::store::ProfileStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_entry_never_exposes_card_source() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let mut profile = StoredPaymentProfile::new("user_1");
        profile.add_card(Card::new("tok_secret"));
        profiles.save(&profile).await.unwrap();

        let lister = MethodLister::new(profiles, "epk-public");
        let entry = lister.method_for(Some("user_1")).await.unwrap();

        assert_eq!(entry.method_type, "eway");
        assert_eq!(entry.public, "epk-public");
        assert_eq!(entry.priority, 0);
        assert_eq!(entry.data.cards.len(), 1);

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("tok_secret"));
    }

    #[tokio::test]
    async fn test_guest_gets_empty_data() {
        let lister = MethodLister::new(Arc::new(InMemoryProfileStore::new()), "epk");

        let guest = lister.method_for(None).await.unwrap();
        let unknown = lister.method_for(Some("user_2")).await.unwrap();

        assert_eq!(guest.data, SanitisedProfile::default());
        assert_eq!(unknown.data, SanitisedProfile::default());
    }
}
