use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use rolodex_core::config::FirestoreCredentials;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_document_id, is_valid_document_id, CollectionQuery, Direction, DocumentStore,
    StoreError,
};
use crate::document::{Document, Fields};

const LIST_PAGE_SIZE: u32 = 300;

/// Firestore REST v1 client scoped to one project database.
pub struct FirestoreStore {
    client: Client,
    documents_url: Url,
    access_token: SecretString,
}

impl FirestoreStore {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// base url cannot be extended with document paths.
    pub fn new(
        base_url: &str,
        credentials: FirestoreCredentials,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        let raw = format!(
            "{}/projects/{}/databases/{}/documents",
            base_url.trim_end_matches('/'),
            credentials.project_id,
            credentials.database_id
        );
        let documents_url = Url::parse(&raw).map_err(|_| StoreError::InvalidUrl(raw.clone()))?;
        if documents_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(raw));
        }

        Ok(Self { client, documents_url, access_token: credentials.access_token })
    }

    pub fn documents_url(&self) -> &str {
        self.documents_url.as_str()
    }

    /// Appends each segment percent-encoded, so `/`, `?` and `#` inside a
    /// segment never change the path.
    fn url_with(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidUrl(self.documents_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, collection: &str) -> Result<Url, StoreError> {
        self.url_with(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        self.url_with(&[collection, checked_document_id(id)?])
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.access_token.expose_secret())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest<'a> {
    structured_query: StructuredQuery<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery<'a> {
    from: [CollectionSelector<'a>; 1],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<QueryOrder<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector<'a> {
    collection_id: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryOrder<'a> {
    field: FieldReference<'a>,
    direction: Direction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference<'a> {
    field_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunQueryEntry {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct DocumentBody<'a> {
    fields: &'a Fields,
}

impl<'a> From<&'a CollectionQuery> for RunQueryRequest<'a> {
    fn from(query: &'a CollectionQuery) -> Self {
        let order_by = query
            .order_by
            .iter()
            .map(|order| QueryOrder {
                field: FieldReference { field_path: &order.field },
                direction: order.direction,
            })
            .collect();

        Self {
            structured_query: StructuredQuery {
                from: [CollectionSelector { collection_id: &query.collection }],
                order_by,
                limit: query.limit,
            },
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        let response =
            self.authorized(self.client.get(self.document_url(collection, id)?)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        decode_response(response).await.map(Some)
    }

    async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>, StoreError> {
        let response = self
            .authorized(self.client.post(format!("{}:runQuery", self.documents_url)))
            .json(&RunQueryRequest::from(query))
            .send()
            .await?;

        let entries: Vec<RunQueryEntry> = decode_response(response).await?;
        let documents: Vec<Document> =
            entries.into_iter().filter_map(|entry| entry.document).collect();
        debug!(
            event_name = "store.firestore.run_query",
            collection = %query.collection,
            limit = ?query.limit,
            returned = documents.len(),
            "firestore query completed"
        );
        Ok(documents)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.collection_url(collection)?)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse =
                decode_response(self.authorized(request).send().await?).await?;
            let received = page.documents.len();
            documents.extend(page.documents);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) if received > 0 => page_token = Some(token),
                _ => break,
            }
        }

        debug!(
            event_name = "store.firestore.list_documents",
            collection = %collection,
            returned = documents.len(),
            "firestore listing completed"
        );
        Ok(documents)
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let id = checked_document_id(id)?;
        let response = self
            .authorized(self.client.post(self.collection_url(collection)?))
            .query(&[("documentId", id)])
            .json(&DocumentBody { fields: &fields })
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::AlreadyExists(format!("{collection}/{id}")));
        }
        decode_response(response).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let response = self
            .authorized(self.client.patch(self.document_url(collection, id)?))
            .json(&DocumentBody { fields: &fields })
            .send()
            .await?;

        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::Status { status: status.as_u16(), message: error_message(&body) });
    }

    serde_json::from_str(&body).map_err(|error| StoreError::Decode(error.to_string()))
}

/// Pulls `error.message` out of a Google API error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
