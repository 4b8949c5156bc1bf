use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tokio::sync::RwLock;

use super::{
    checked_document_id, is_valid_document_id, CollectionQuery, Direction, DocumentStore,
    StoreError,
};
use crate::document::{Document, Fields};

/// Process-local document store with the same query semantics as the REST
/// backend. Used for local development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Stores a document exactly as given, bypassing the create/update rules.
    /// Lets tests plant malformed or foreign-written records.
    pub async fn insert_raw(&self, collection: &str, id: &str, fields: Fields) {
        let mut collections = self.collections.write().await;
        let now = Utc::now().trunc_subsecs(6);
        collections.entry(collection.to_string()).or_default().insert(
            id.to_string(),
            Document {
                name: document_name(collection, id),
                fields,
                create_time: Some(now),
                update_time: Some(now),
            },
        );
    }
}

fn document_name(collection: &str, id: &str) -> String {
    format!("memory/documents/{collection}/{id}")
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|documents| documents.get(id)).cloned())
    }

    async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = match &query.order_by {
            Some(order) => {
                let mut ordered: Vec<Document> = documents
                    .values()
                    .filter(|document| document.fields.contains_key(&order.field))
                    .cloned()
                    .collect();
                ordered.sort_by(|left, right| {
                    let by_value = match (left.get(&order.field), right.get(&order.field)) {
                        (Some(left_value), Some(right_value)) => left_value.compare(right_value),
                        _ => std::cmp::Ordering::Equal,
                    };
                    let by_value = match order.direction {
                        Direction::Ascending => by_value,
                        Direction::Descending => by_value.reverse(),
                    };
                    by_value.then_with(|| left.name.cmp(&right.name))
                });
                ordered
            }
            None => documents.values().cloned().collect(),
        };

        if let Some(limit) = query.limit {
            matched.truncate(limit as usize);
        }
        Ok(matched)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let id = checked_document_id(id)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(id) {
            return Err(StoreError::AlreadyExists(format!("{collection}/{id}")));
        }

        let now = Utc::now().trunc_subsecs(6);
        let document = Document {
            name: document_name(collection, id),
            fields,
            create_time: Some(now),
            update_time: Some(now),
        };
        documents.insert(id.to_string(), document.clone());
        Ok(document)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let id = checked_document_id(id)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        let now = Utc::now().trunc_subsecs(6);
        let create_time =
            documents.get(id).and_then(|existing| existing.create_time).unwrap_or(now);
        let document = Document {
            name: document_name(collection, id),
            fields,
            create_time: Some(create_time),
            update_time: Some(now),
        };
        documents.insert(id.to_string(), document.clone());
        Ok(document)
    }
}
