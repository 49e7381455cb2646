//! User profile document access.
//!
//! The users collection is keyed by the auth user ID, one document each,
//! with Pascal-case attribute names and addresses embedded as JSON-encoded
//! strings. Profile images go through the file store; the document only
//! carries the resolved view URL.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use thriftr_core::{Address, AddressId, UserId, UserProfile};

use crate::backend::{BackendError, DocumentStore, FileStore};
use crate::error::{AppError, Result};
use crate::repository::{read_err, write_err};

/// Reads and writes one user's profile document.
pub struct ProfileRepository<B> {
    backend: Arc<B>,
    collection: String,
    image_bucket: String,
    user: UserId,
    email: String,
}

impl<B: DocumentStore + FileStore> ProfileRepository<B> {
    /// Scope a repository to one user's profile. The email seeds empty
    /// profiles for users who have never saved one.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        collection: impl Into<String>,
        image_bucket: impl Into<String>,
        user: UserId,
        email: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            collection: collection.into(),
            image_bucket: image_bucket.into(),
            user,
            email: email.into(),
        }
    }

    /// Fetch the profile. A user who has never saved one gets an empty
    /// profile rather than an error.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self) -> Result<UserProfile> {
        match self
            .backend
            .get_document(&self.collection, self.user.as_str())
            .await
        {
            Ok(doc) => Ok(UserProfile::from_document(&self.user, &doc.data)?),
            Err(BackendError::NotFound(_)) => {
                Ok(UserProfile::empty(self.user.clone(), self.email.clone()))
            }
            Err(e) => Err(read_err(e)),
        }
    }

    /// Persist the profile, creating the document on first save.
    #[instrument(skip(self, profile), level = "debug")]
    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        let body = encode_profile(profile)?;
        match self
            .backend
            .update_document(&self.collection, self.user.as_str(), body.clone())
            .await
        {
            Ok(_) => Ok(()),
            Err(BackendError::NotFound(_)) => self
                .backend
                .create_document(&self.collection, self.user.as_str(), body)
                .await
                .map(drop)
                .map_err(write_err),
            Err(e) => Err(write_err(e)),
        }
    }

    /// Upload a new profile image and record its view URL.
    #[instrument(skip(self, bytes), level = "debug")]
    pub async fn set_image(&self, bytes: Vec<u8>, filename: &str, mime_type: &str) -> Result<String> {
        let stored = self
            .backend
            .upload(&self.image_bucket, bytes, filename, mime_type)
            .await
            .map_err(write_err)?;
        let url = self.backend.view_url(&self.image_bucket, &stored.id);

        let mut profile = self.fetch().await?;
        profile.image_path = Some(url.clone());
        self.save(&profile).await?;
        Ok(url)
    }

    /// Append a saved address. A new default demotes the previous one.
    #[instrument(skip(self, address), level = "debug")]
    pub async fn add_address(&self, address: Address) -> Result<UserProfile> {
        let mut profile = self.fetch().await?;
        let mut addresses = profile.addresses()?;
        if address.is_default {
            for a in &mut addresses {
                a.is_default = false;
            }
        }
        addresses.push(address);
        profile.set_addresses(&addresses)?;
        self.save(&profile).await?;
        Ok(profile)
    }

    /// Remove a saved address by ID.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove_address(&self, address_id: &AddressId) -> Result<UserProfile> {
        let mut profile = self.fetch().await?;
        let mut addresses = profile.addresses()?;
        addresses.retain(|a| &a.id != address_id);
        profile.set_addresses(&addresses)?;
        self.save(&profile).await?;
        Ok(profile)
    }
}

/// Serialize a profile to its document body. The ID attribute is skipped
/// at the type level since the document is keyed by it.
fn encode_profile(profile: &UserProfile) -> Result<Value> {
    serde_json::to_value(profile).map_err(|e| AppError::RemoteWrite(BackendError::Parse(e)))
}
