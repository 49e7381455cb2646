//! In-memory backend used by unit and integration tests.
//!
//! Interprets the same [`Query`] terms as the Appwrite implementation over
//! plain maps, preserving document insertion order so pagination is
//! deterministic. Writes can be forced to fail to exercise the error
//! channels.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use thriftr_core::FileId;

use crate::backend::{
    AuthApi, AuthUser, BackendError, Document, DocumentStore, FileStore, Query, StoredFile,
};

/// An uploaded file's recorded metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub bucket: String,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Default)]
struct State {
    // collection -> ordered (id, body) pairs
    collections: Vec<(String, Vec<(String, Value)>)>,
    files: Vec<UploadedFile>,
    session: Option<AuthUser>,
    accounts: Vec<(String, String, AuthUser)>, // email, password, user
}

/// In-process implementation of all three backend contracts.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (create/update/delete/upload) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing the store API.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn seed(&self, collection: &str, id: &str, data: Value) {
        let mut state = self.state.lock().expect("lock");
        let docs = collection_mut(&mut state, collection);
        docs.push((id.to_string(), data));
    }

    /// Open a session for `user` directly, bypassing credentials.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn set_session(&self, user: AuthUser) {
        self.state.lock().expect("lock").session = Some(user);
    }

    /// Uploaded files recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn uploaded_files(&self) -> Vec<UploadedFile> {
        self.state.lock().expect("lock").files.clone()
    }

    /// Number of documents currently in a collection.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        let state = self.state.lock().expect("lock");
        state
            .collections
            .iter()
            .find(|(name, _)| name == collection)
            .map_or(0, |(_, docs)| docs.len())
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "writes disabled by test".to_string(),
            });
        }
        Ok(())
    }
}

fn collection_mut<'a>(state: &'a mut State, collection: &str) -> &'a mut Vec<(String, Value)> {
    if let Some(pos) = state
        .collections
        .iter()
        .position(|(name, _)| name == collection)
    {
        &mut state
            .collections
            .get_mut(pos)
            .expect("position just found")
            .1
    } else {
        state.collections.push((collection.to_string(), Vec::new()));
        &mut state.collections.last_mut().expect("just pushed").1
    }
}

/// Whether a document body matches one filter term.
fn matches(data: &Value, query: &Query) -> bool {
    match query {
        Query::Equal { attribute, value } => data.get(attribute) == Some(value),
        Query::NotEqual { attribute, value } => data.get(attribute) != Some(value),
        Query::Search { attribute, term } => data
            .get(attribute)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&term.to_lowercase())),
        Query::Or(terms) => terms.iter().any(|t| matches(data, t)),
        // Paging terms are not filters
        Query::Limit(_) | Query::Offset(_) => true,
    }
}

impl DocumentStore for MemoryBackend {
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Document, BackendError> {
        let state = self.state.lock().expect("lock");
        state
            .collections
            .iter()
            .find(|(name, _)| name == collection)
            .and_then(|(_, docs)| docs.iter().find(|(id, _)| id == document_id))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .ok_or_else(|| BackendError::NotFound(format!("{collection}/{document_id}")))
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, BackendError> {
        let state = self.state.lock().expect("lock");
        let docs = state
            .collections
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, docs)| docs.as_slice())
            .unwrap_or_default();

        let mut limit = None;
        let mut offset = 0usize;
        for q in queries {
            match q {
                Query::Limit(n) => limit = Some(*n as usize),
                Query::Offset(n) => offset = *n as usize,
                _ => {}
            }
        }

        let filtered = docs
            .iter()
            .filter(|(_, data)| queries.iter().all(|q| matches(data, q)))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();

        Ok(filtered)
    }

    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, BackendError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("lock");
        let docs = collection_mut(&mut state, collection);
        if docs.iter().any(|(id, _)| id == document_id) {
            return Err(BackendError::Api {
                status: 409,
                message: format!("document {document_id} already exists"),
            });
        }
        docs.push((document_id.to_string(), data.clone()));
        Ok(Document {
            id: document_id.to_string(),
            data,
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, BackendError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("lock");
        let docs = collection_mut(&mut state, collection);
        let slot = docs
            .iter_mut()
            .find(|(id, _)| id == document_id)
            .ok_or_else(|| BackendError::NotFound(format!("{collection}/{document_id}")))?;
        slot.1 = data.clone();
        Ok(Document {
            id: document_id.to_string(),
            data,
        })
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("lock");
        let docs = collection_mut(&mut state, collection);
        let before = docs.len();
        docs.retain(|(id, _)| id != document_id);
        if docs.len() == before {
            return Err(BackendError::NotFound(format!(
                "{collection}/{document_id}"
            )));
        }
        Ok(())
    }
}

impl FileStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<StoredFile, BackendError> {
        self.check_writable()?;
        let file = UploadedFile {
            id: FileId::new(uuid::Uuid::new_v4().to_string()),
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
        };
        let id = file.id.clone();
        self.state.lock().expect("lock").files.push(file);
        Ok(StoredFile { id })
    }

    fn view_url(&self, bucket: &str, file_id: &FileId) -> String {
        format!("memory://storage/buckets/{bucket}/files/{file_id}/view")
    }
}

impl AuthApi for MemoryBackend {
    async fn current_user(&self) -> Result<AuthUser, BackendError> {
        self.state
            .lock()
            .expect("lock")
            .session
            .clone()
            .ok_or_else(|| BackendError::Api {
                status: 401,
                message: "no active session".to_string(),
            })
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("lock");
        if state.accounts.iter().any(|(e, _, _)| e == email) {
            return Err(BackendError::Api {
                status: 409,
                message: "account already exists".to_string(),
            });
        }
        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string().into(),
            email: email.to_string(),
        };
        state
            .accounts
            .push((email.to_string(), password.to_string(), user.clone()));
        Ok(user)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().expect("lock");
        let user = state
            .accounts
            .iter()
            .find(|(e, p, _)| e == email && p == password)
            .map(|(_, _, user)| user.clone())
            .ok_or_else(|| BackendError::Api {
                status: 401,
                message: "invalid credentials".to_string(),
            })?;
        state.session = Some(user);
        Ok(())
    }

    async fn delete_session(&self) -> Result<(), BackendError> {
        self.state.lock().expect("lock").session = None;
        Ok(())
    }

    async fn create_recovery(&self, _email: &str, _redirect_url: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_filters_and_paging() {
        let backend = MemoryBackend::new();
        for i in 0..6 {
            backend.seed(
                "products",
                &format!("p{i}"),
                json!({ "name": format!("item {i}"), "category": if i % 2 == 0 { "Books" } else { "Toys" } }),
            );
        }

        let books = backend
            .list_documents("products", &[Query::equal("category", "Books")])
            .await
            .expect("list");
        assert_eq!(books.len(), 3);

        let page = backend
            .list_documents(
                "products",
                &[
                    Query::equal("category", "Books"),
                    Query::Limit(2),
                    Query::Offset(2),
                ],
            )
            .await
            .expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page.first().map(|d| d.id.as_str()), Some("p4"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_or() {
        let backend = MemoryBackend::new();
        backend.seed("products", "p1", json!({ "name": "Desk Lamp", "category": "Furniture" }));
        backend.seed("products", "p2", json!({ "name": "Novel", "category": "Books" }));

        let hits = backend
            .list_documents(
                "products",
                &[Query::any_of(vec![
                    Query::search("name", "lamp"),
                    Query::search("category", "lamp"),
                ])],
            )
            .await
            .expect("list");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_fail_writes_blocks_mutations_only() {
        let backend = MemoryBackend::new();
        backend.seed("carts", "c1", json!({ "userId": "u1" }));
        backend.set_fail_writes(true);

        assert!(backend
            .create_document("carts", "c2", json!({}))
            .await
            .is_err());
        assert!(backend.delete_document("carts", "c1").await.is_err());
        // Reads still work
        assert!(backend.get_document("carts", "c1").await.is_ok());
    }
}
