//! Customer repository over the document store.
//!
//! Listing uses the accumulative-limit scheme from `rolodex_core::paging`;
//! search is a full collection scan filtered in memory. Read paths never fail
//! on upstream errors: they log and return an empty result.

use std::str::FromStr;
use std::sync::Arc;

use rolodex_core::domain::customer::{
    store_timestamp, Customer, CustomerId, CustomerInput, CustomerPage,
};
use rolodex_core::errors::DomainError;
use rolodex_core::paging::PageWindow;
use tracing::{debug, error, info, warn};

use super::RepositoryError;
use crate::codec::{
    decode_customer, encode_customer, FIELD_CREATED_AT, FIELD_EMAIL, FIELD_NAME, FIELD_STATUS,
    FIELD_UPDATED_AT,
};
use crate::document::Document;
use crate::store::{CollectionQuery, Direction, DocumentStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Name,
    Email,
    Status,
}

impl SortField {
    pub fn field_path(&self) -> &'static str {
        match self {
            Self::CreatedAt => FIELD_CREATED_AT,
            Self::UpdatedAt => FIELD_UPDATED_AT,
            Self::Name => FIELD_NAME,
            Self::Email => FIELD_EMAIL,
            Self::Status => FIELD_STATUS,
        }
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "status" => Ok(Self::Status),
            other => Err(DomainError::InvalidArgument(format!(
                "unsupported sort field `{other}` (expected createdAt|updatedAt|name|email|status)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomerOrder {
    pub field: SortField,
    pub direction: Direction,
}

impl Default for CustomerOrder {
    fn default() -> Self {
        Self { field: SortField::CreatedAt, direction: Direction::Descending }
    }
}

impl CustomerOrder {
    /// Parses the optional `sortField` / `sortOrder` pair. Missing or blank
    /// parts fall back to `createdAt` / `desc`.
    pub fn parse(field: Option<&str>, order: Option<&str>) -> Result<Self, DomainError> {
        let defaults = Self::default();
        let field = match field.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => raw.parse()?,
            None => defaults.field,
        };
        let direction = match order.map(|raw| raw.trim().to_ascii_lowercase()) {
            None => defaults.direction,
            Some(raw) if raw.is_empty() => defaults.direction,
            Some(raw) if raw == "asc" || raw == "ascending" => Direction::Ascending,
            Some(raw) if raw == "desc" || raw == "descending" => Direction::Descending,
            Some(other) => {
                return Err(DomainError::InvalidArgument(format!(
                    "unsupported sort order `{other}` (expected asc|desc)"
                )))
            }
        };
        Ok(Self { field, direction })
    }
}

pub struct CustomerRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl CustomerRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self { store, collection: collection.into() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Page `page` of customers, newest first.
    pub async fn get_customers(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<CustomerPage, RepositoryError> {
        self.get_customers_sorted(page, page_size, CustomerOrder::default()).await
    }

    pub async fn get_customers_sorted(
        &self,
        page: u32,
        page_size: u32,
        order: CustomerOrder,
    ) -> Result<CustomerPage, RepositoryError> {
        let window = PageWindow::new(page, page_size)?;
        let query = CollectionQuery::new(&self.collection)
            .order_by(order.field.field_path(), order.direction)
            .limit(window.fetch_limit());

        let documents = match self.store.run_query(&query).await {
            Ok(documents) => documents,
            Err(error) => {
                warn!(
                    event_name = "customer.list.upstream_failure",
                    collection = %self.collection,
                    page,
                    page_size,
                    error = %error,
                    "customer listing failed; returning empty page"
                );
                return Ok(window.empty());
            }
        };

        debug!(
            event_name = "customer.list.fetched",
            collection = %self.collection,
            page,
            page_size,
            fetch_limit = window.fetch_limit(),
            fetched = documents.len(),
            "customer window fetched"
        );
        Ok(window.paginate(documents).filter_map_items(|document| decode_or_skip(&document)))
    }

    /// Case-insensitive keyword search over name and email, verbatim over
    /// phone. Scans the whole collection; results are newest first.
    pub async fn search_customers(&self, query: &str) -> Vec<Customer> {
        let documents = match self.store.list_documents(&self.collection).await {
            Ok(documents) => documents,
            Err(error) => {
                warn!(
                    event_name = "customer.search.upstream_failure",
                    collection = %self.collection,
                    error = %error,
                    "customer search failed; returning no results"
                );
                return Vec::new();
            }
        };

        let scanned = documents.len();
        let mut matches: Vec<Customer> = documents
            .iter()
            .filter_map(decode_or_skip)
            .filter(|customer| customer.matches_query(query))
            .collect();
        matches.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        debug!(
            event_name = "customer.search.completed",
            collection = %self.collection,
            scanned,
            matched = matches.len(),
            "customer search completed"
        );
        matches
    }

    /// Point lookup. Missing, malformed and unreachable records all read as
    /// `None`.
    pub async fn get_customer_by_id(&self, id: &str) -> Option<Customer> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        match self.store.get_document(&self.collection, id).await {
            Ok(Some(document)) => decode_or_skip(&document),
            Ok(None) => None,
            Err(error) => {
                error!(
                    event_name = "customer.get.upstream_failure",
                    collection = %self.collection,
                    customer_id = %id,
                    error = %error,
                    "customer lookup failed; reporting not found"
                );
                None
            }
        }
    }

    pub async fn create_customer(&self, input: CustomerInput) -> Result<Customer, RepositoryError> {
        input.validate()?;

        let now = store_timestamp();
        let customer = input.into_customer(CustomerId::generate(), now, now);
        let document = self
            .store
            .create_document(&self.collection, customer.id.as_str(), encode_customer(&customer))
            .await?;
        let created = decode_customer(&document)?;

        info!(
            event_name = "customer.created",
            collection = %self.collection,
            customer_id = %created.id,
            status = %created.status,
            "customer created"
        );
        Ok(created)
    }

    /// Full replace of an existing customer. `createdAt` is carried over from
    /// the stored record; the read and the write are not atomic. A missing
    /// customer is reported before the input is validated.
    pub async fn update_customer(
        &self,
        id: &str,
        input: CustomerInput,
    ) -> Result<Customer, RepositoryError> {
        let id = id.trim();
        let not_found = || DomainError::CustomerNotFound(id.to_string());
        if id.is_empty() {
            return Err(not_found().into());
        }

        let existing = self
            .store
            .get_document(&self.collection, id)
            .await?
            .and_then(|document| decode_or_skip(&document))
            .ok_or_else(not_found)?;
        input.validate()?;

        let customer =
            input.into_customer(existing.id, existing.created_at, store_timestamp());
        let document = self
            .store
            .update_document(&self.collection, id, encode_customer(&customer))
            .await?;
        let updated = decode_customer(&document)?;

        info!(
            event_name = "customer.updated",
            collection = %self.collection,
            customer_id = %updated.id,
            status = %updated.status,
            "customer updated"
        );
        Ok(updated)
    }

    /// Cheapest possible round trip, used by readiness checks.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        let query = CollectionQuery::new(&self.collection).limit(1);
        self.store.run_query(&query).await?;
        Ok(())
    }
}

fn decode_or_skip(document: &Document) -> Option<Customer> {
    match decode_customer(document) {
        Ok(customer) => Some(customer),
        Err(error) => {
            warn!(
                event_name = "customer.decode.skipped",
                document = %document.name,
                error = %error,
                "skipping malformed customer document"
            );
            None
        }
    }
}
