//! Document store client.
//!
//! The store exposes point reads, ordered/limited queries, full listings and
//! create/replace writes. It has no offset or cursor primitive that callers
//! can rely on, which is why paging is built on top of `run_query` limits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, Fields};

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("store response could not be decoded: {0}")]
    Decode(String),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("`{0}` cannot name a document")]
    InvalidDocumentId(String),
    #[error("store url `{0}` cannot carry document paths")]
    InvalidUrl(String),
}

const MAX_DOCUMENT_ID_BYTES: usize = 1500;

/// Whether `id` names exactly one document inside a collection. Ids are a
/// single path segment: no `/`, not `.` or `..`, and not a reserved `__x__`
/// name.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_DOCUMENT_ID_BYTES
        && !id.contains('/')
        && id != "."
        && id != ".."
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
}

pub(crate) fn checked_document_id(id: &str) -> Result<&str, StoreError> {
    if is_valid_document_id(id) {
        Ok(id)
    } else {
        Err(StoreError::InvalidDocumentId(id.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), order_by: None, limit: None }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy { field: field.into(), direction });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. A missing document is `Ok(None)`, not an error. So is an
    /// id that cannot name a document.
    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// Ordered, limited query. Documents lacking the order field are skipped.
    async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>, StoreError>;

    /// Every document in the collection, in store order.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Fails with `InvalidDocumentId` unless `is_valid_document_id(id)`.
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    /// Full replace: fields absent from `fields` are removed from the document.
    /// Fails with `InvalidDocumentId` unless `is_valid_document_id(id)`.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::is_valid_document_id;

    #[test]
    fn document_ids_are_single_path_segments() {
        for id in ["c-1", "3f2b9c1e-0d4a-4b7e-9a51-2c8d6f0e1a77", "c 1?x#y", "顧客-1", "_a_", "..."] {
            assert!(is_valid_document_id(id), "{id} should be accepted");
        }
        for id in ["", "nope/../c-1", "../orders/o-1", "c-1/", ".", "..", "__name__"] {
            assert!(!is_valid_document_id(id), "{id} should be rejected");
        }
        assert!(!is_valid_document_id(&"x".repeat(1501)));
    }
}
