//! Collaborator contracts for the hosted backend.
//!
//! The client core consumes, but does not implement, three services: a
//! document store, a file store, and an auth provider. [`appwrite`] is the
//! production implementation over the Appwrite REST API; [`memory`] is an
//! in-process implementation used by tests.
//!
//! All traits use native async methods. Implementations are injected
//! explicitly at construction - there is no process-wide client singleton.

pub mod appwrite;
pub mod memory;

use serde_json::Value;
use thiserror::Error;

use thriftr_core::{FileId, UserId};

pub use appwrite::AppwriteBackend;
pub use memory::MemoryBackend;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document or resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call did not complete within its bound.
    #[error("timed out")]
    Timeout,
}

/// A stored document: an opaque ID plus a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// A query term against a collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Attribute equals value.
    Equal { attribute: String, value: Value },
    /// Attribute differs from value.
    NotEqual { attribute: String, value: Value },
    /// Free-text match against a string attribute.
    Search { attribute: String, term: String },
    /// Any of the nested terms matches.
    Or(Vec<Query>),
    /// Page size cap.
    Limit(u32),
    /// Number of matching documents to skip.
    Offset(u32),
}

impl Query {
    /// Equality filter.
    #[must_use]
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Inequality filter.
    #[must_use]
    pub fn not_equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Free-text search on a string attribute.
    #[must_use]
    pub fn search(attribute: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Search {
            attribute: attribute.into(),
            term: term.into(),
        }
    }

    /// Logical OR of nested terms.
    #[must_use]
    pub fn any_of(terms: Vec<Self>) -> Self {
        Self::Or(terms)
    }

    /// Encode to the Appwrite wire representation.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Equal { attribute, value } => serde_json::json!({
                "method": "equal",
                "attribute": attribute,
                "values": [value],
            }),
            Self::NotEqual { attribute, value } => serde_json::json!({
                "method": "notEqual",
                "attribute": attribute,
                "values": [value],
            }),
            Self::Search { attribute, term } => serde_json::json!({
                "method": "search",
                "attribute": attribute,
                "values": [term],
            }),
            Self::Or(terms) => serde_json::json!({
                "method": "or",
                "values": terms.iter().map(Self::to_wire).collect::<Vec<_>>(),
            }),
            Self::Limit(limit) => serde_json::json!({
                "method": "limit",
                "values": [limit],
            }),
            Self::Offset(offset) => serde_json::json!({
                "method": "offset",
                "values": [offset],
            }),
        }
    }
}

/// A reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
}

/// The authenticated user identity returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

/// Document CRUD against a named collection.
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch one document by ID.
    fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> impl Future<Output = Result<Document, BackendError>> + Send;

    /// List documents matching the query terms.
    fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> impl Future<Output = Result<Vec<Document>, BackendError>> + Send;

    /// Create a document with an explicit ID.
    fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> impl Future<Output = Result<Document, BackendError>> + Send;

    /// Replace a document's body.
    fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> impl Future<Output = Result<Document, BackendError>> + Send;

    /// Delete a document.
    fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Binary upload into a named bucket.
pub trait FileStore: Send + Sync + 'static {
    /// Upload bytes, returning the stored file reference.
    fn upload(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> impl Future<Output = Result<StoredFile, BackendError>> + Send;

    /// A resolvable view URL for a stored file.
    fn view_url(&self, bucket: &str, file_id: &FileId) -> String;
}

/// Session management against the auth provider.
pub trait AuthApi: Send + Sync + 'static {
    /// The currently authenticated user, if any session exists.
    fn current_user(&self) -> impl Future<Output = Result<AuthUser, BackendError>> + Send;

    /// Register a new account.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, BackendError>> + Send;

    /// Open an email/password session.
    fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Close the current session.
    fn delete_session(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Start a password recovery flow.
    fn create_recovery(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
