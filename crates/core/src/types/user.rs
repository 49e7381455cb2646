//! User profile and shipping address types.
//!
//! The profile document stores addresses as a list of JSON-encoded strings
//! (same embedding quirk as cart lines and orders). Field names in the
//! stored document are PascalCase, inherited from the backend schema.

use serde::{Deserialize, Serialize};

use crate::types::id::{AddressId, UserId};
use crate::types::product::DecodeError;

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Create a fresh address with a generated ID.
    #[must_use]
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(uuid::Uuid::new_v4().to_string()),
            street: street.into(),
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            is_default: false,
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

/// A user's profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Not stored in the document body (the document is keyed by it);
    /// [`UserProfile::from_document`] fills it from the document ID.
    #[serde(rename = "Id", default, skip_serializing)]
    pub id: UserId,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "ImagePath", default)]
    pub image_path: Option<String>,
    #[serde(rename = "SavedAddresses", default)]
    pub saved_addresses: Vec<String>,
}

impl UserProfile {
    /// An empty profile for a freshly registered user.
    #[must_use]
    pub fn empty(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            image_path: None,
            saved_addresses: Vec::new(),
        }
    }

    /// Decode the profile from a stored document's body.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Document`] on schema mismatch.
    pub fn from_document(id: &UserId, data: &serde_json::Value) -> Result<Self, DecodeError> {
        let mut profile: Self =
            serde_json::from_value(data.clone()).map_err(|source| DecodeError::Document {
                id: id.to_string(),
                source,
            })?;
        profile.id = id.clone();
        Ok(profile)
    }

    /// Decode the embedded address list.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Embedded`] if any stored address string is
    /// malformed.
    pub fn addresses(&self) -> Result<Vec<Address>, DecodeError> {
        self.saved_addresses
            .iter()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|source| DecodeError::Embedded {
                    id: self.id.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// The default shipping address, if one is marked.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Embedded`] if the stored addresses are
    /// malformed.
    pub fn default_address(&self) -> Result<Option<Address>, DecodeError> {
        Ok(self.addresses()?.into_iter().find(|a| a.is_default))
    }

    /// Replace the embedded address list.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Embedded`] if an address fails to encode
    /// (practically unreachable for these field types).
    pub fn set_addresses(&mut self, addresses: &[Address]) -> Result<(), DecodeError> {
        self.saved_addresses = addresses
            .iter()
            .map(|a| {
                serde_json::to_string(a).map_err(|source| DecodeError::Embedded {
                    id: self.id.to_string(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}
