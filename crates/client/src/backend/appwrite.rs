//! Appwrite REST backend implementation.
//!
//! One explicitly constructed client implements all three collaborator
//! contracts. Requests authenticate with the project ID and API key
//! headers; response bodies are read as text first so parse failures can
//! be logged with context.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::instrument;

use thriftr_core::FileId;

use crate::backend::{AuthApi, AuthUser, BackendError, Document, DocumentStore, FileStore, Query, StoredFile};
use crate::config::AppConfig;

/// Client for the Appwrite REST API.
///
/// Cheaply cloneable via `Arc`; construct once at startup and inject into
/// every repository that needs it.
#[derive(Clone)]
pub struct AppwriteBackend {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: SecretString,
    database_id: String,
}

impl AppwriteBackend {
    /// Create a new backend client from configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
                project_id: config.project_id.clone(),
                api_key: config.api_key.clone(),
                database_id: config.database_id.clone(),
            }),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .http
            .request(method, format!("{}{path}", self.inner.endpoint))
            .header("X-Appwrite-Project", &self.inner.project_id)
            .header("X-Appwrite-Key", self.inner.api_key.expose_secret())
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{collection}/documents",
            self.inner.database_id
        )
    }

    /// Send a request and decode the response body.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            let message = extract_api_message(&body);
            return Err(BackendError::NotFound(message));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Appwrite API returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: extract_api_message(&body),
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse Appwrite response"
                );
                Err(BackendError::Parse(e))
            }
        }
    }
}

/// Pull the human-readable message out of an Appwrite error body.
fn extract_api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Split an Appwrite document payload into its ID and attribute body.
///
/// Appwrite returns user attributes at the top level alongside `$`-prefixed
/// metadata; the metadata is stripped from the body.
fn split_document(value: Value) -> Result<Document, BackendError> {
    let Value::Object(map) = value else {
        return Err(BackendError::Api {
            status: 200,
            message: "expected a document object".to_string(),
        });
    };

    let id = map
        .get("$id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| BackendError::Api {
            status: 200,
            message: "document missing $id".to_string(),
        })?;

    let data = map
        .into_iter()
        .filter(|(k, _)| !k.starts_with('$'))
        .collect::<serde_json::Map<_, _>>();

    Ok(Document {
        id,
        data: Value::Object(data),
    })
}

impl DocumentStore for AppwriteBackend {
    #[instrument(skip(self), level = "debug")]
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Document, BackendError> {
        let path = format!("{}/{document_id}", self.documents_path(collection));
        let value = self
            .execute(self.request(reqwest::Method::GET, &path))
            .await?;
        split_document(value)
    }

    #[instrument(skip(self, queries), level = "debug")]
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, BackendError> {
        let path = self.documents_path(collection);
        let params: Vec<(String, String)> = queries
            .iter()
            .map(|q| ("queries[]".to_string(), q.to_wire().to_string()))
            .collect();

        let value = self
            .execute(self.request(reqwest::Method::GET, &path).query(&params))
            .await?;

        let documents = value
            .get("documents")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| BackendError::Api {
                status: 200,
                message: "listing missing documents array".to_string(),
            })?;

        documents.into_iter().map(split_document).collect()
    }

    #[instrument(skip(self, data), level = "debug")]
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, BackendError> {
        let path = self.documents_path(collection);
        let body = serde_json::json!({
            "documentId": document_id,
            "data": data,
        });
        let value = self
            .execute(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;
        split_document(value)
    }

    #[instrument(skip(self, data), level = "debug")]
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, BackendError> {
        let path = format!("{}/{document_id}", self.documents_path(collection));
        let body = serde_json::json!({ "data": data });
        let value = self
            .execute(self.request(reqwest::Method::PATCH, &path).json(&body))
            .await?;
        split_document(value)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError> {
        let path = format!("{}/{document_id}", self.documents_path(collection));
        self.execute(self.request(reqwest::Method::DELETE, &path))
            .await?;
        Ok(())
    }
}

impl FileStore for AppwriteBackend {
    #[instrument(skip(self, bytes), level = "debug")]
    async fn upload(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<StoredFile, BackendError> {
        let path = format!("/storage/buckets/{bucket}/files");
        let file_id = uuid::Uuid::new_v4().to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new()
            .text("fileId", file_id)
            .part("file", part);

        let value = self
            .execute(self.request(reqwest::Method::POST, &path).multipart(form))
            .await?;

        let id = value
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::Api {
                status: 200,
                message: "upload response missing $id".to_string(),
            })?;

        Ok(StoredFile {
            id: FileId::new(id),
        })
    }

    fn view_url(&self, bucket: &str, file_id: &FileId) -> String {
        format!(
            "{}/storage/buckets/{bucket}/files/{file_id}/view?project={}",
            self.inner.endpoint, self.inner.project_id
        )
    }
}

/// Decode the `{ "$id", "email" }` shape shared by account responses.
fn auth_user_from(value: &Value) -> Result<AuthUser, BackendError> {
    let id = value
        .get("$id")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Api {
            status: 200,
            message: "account response missing $id".to_string(),
        })?;
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(AuthUser {
        id: id.into(),
        email: email.to_string(),
    })
}

impl AuthApi for AppwriteBackend {
    #[instrument(skip(self), level = "debug")]
    async fn current_user(&self) -> Result<AuthUser, BackendError> {
        let value = self
            .execute(self.request(reqwest::Method::GET, "/account"))
            .await?;
        auth_user_from(&value)
    }

    #[instrument(skip(self, password), level = "debug")]
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let body = serde_json::json!({
            "userId": uuid::Uuid::new_v4().to_string(),
            "email": email,
            "password": password,
        });
        let value = self
            .execute(self.request(reqwest::Method::POST, "/account").json(&body))
            .await?;
        auth_user_from(&value)
    }

    #[instrument(skip(self, password), level = "debug")]
    async fn create_session(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.execute(
            self.request(reqwest::Method::POST, "/account/sessions/email")
                .json(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_session(&self) -> Result<(), BackendError> {
        self.execute(self.request(reqwest::Method::DELETE, "/account/sessions/current"))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_recovery(&self, email: &str, redirect_url: &str) -> Result<(), BackendError> {
        let body = serde_json::json!({ "email": email, "url": redirect_url });
        self.execute(
            self.request(reqwest::Method::POST, "/account/recovery")
                .json(&body),
        )
        .await?;
        Ok(())
    }
}
