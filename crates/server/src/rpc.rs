//! Named RPC operations with positional JSON arguments.
//!
//! Every call answers with the same envelope, `{"status":"success","data":...}`
//! or `{"status":"error","message":...}`, whatever went wrong on the way.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use rolodex_core::domain::customer::CustomerInput;
use rolodex_core::errors::{ApplicationError, DomainError};
use rolodex_db::{CustomerOrder, CustomerRepository};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::address::AddressLookup;

/// Page size used by the unpaginated customer listing.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A repository, or the configuration message explaining why there is none.
pub type RepositorySlot = Result<Arc<CustomerRepository>, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    GetCustomers,
    GetCustomersPaginated,
    SearchCustomers,
    GetCustomerById,
    CreateCustomer,
    UpdateCustomer,
    GetAddressByZipCode,
    GetZipCodeByAddress,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Self::GetCustomers,
        Self::GetCustomersPaginated,
        Self::SearchCustomers,
        Self::GetCustomerById,
        Self::CreateCustomer,
        Self::UpdateCustomer,
        Self::GetAddressByZipCode,
        Self::GetZipCodeByAddress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetCustomers => "getCustomers",
            Self::GetCustomersPaginated => "getCustomersPaginated",
            Self::SearchCustomers => "searchCustomers",
            Self::GetCustomerById => "getCustomerById",
            Self::CreateCustomer => "createCustomer",
            Self::UpdateCustomer => "updateCustomer",
            Self::GetAddressByZipCode => "getAddressByZipCode",
            Self::GetZipCodeByAddress => "getZipCodeByAddress",
        }
    }
}

impl FromStr for Operation {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == value)
            .ok_or_else(|| DomainError::InvalidArgument(format!("unknown operation `{value}`")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success { data: Value },
    Error { message: String },
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Positional argument list of one call.
struct Args {
    values: Vec<Value>,
}

impl Args {
    fn optional<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<Option<T>, DomainError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value).map(Some).map_err(|error| {
                DomainError::InvalidArgument(format!("argument `{name}` is invalid: {error}"))
            }),
        }
    }

    fn required<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T, DomainError> {
        self.optional(index, name)?.ok_or_else(|| {
            DomainError::InvalidArgument(format!("argument `{name}` is required"))
        })
    }
}

pub struct Dispatcher {
    customers: RepositorySlot,
    address: Arc<dyn AddressLookup>,
}

impl Dispatcher {
    pub fn new(customers: RepositorySlot, address: Arc<dyn AddressLookup>) -> Self {
        Self { customers, address }
    }

    pub fn customers(&self) -> &RepositorySlot {
        &self.customers
    }

    pub async fn dispatch(&self, operation: Operation, args: Vec<Value>) -> Envelope {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "rpc.dispatch.start",
            correlation_id = %correlation_id,
            operation = operation.as_str(),
            arg_count = args.len(),
            "dispatching rpc call"
        );

        match self.call(operation, Args { values: args }).await {
            Ok(data) => {
                info!(
                    event_name = "rpc.dispatch.success",
                    correlation_id = %correlation_id,
                    operation = operation.as_str(),
                    "rpc call succeeded"
                );
                Envelope::Success { data }
            }
            Err(error) if error.is_not_found() => {
                info!(
                    event_name = "rpc.dispatch.not_found",
                    correlation_id = %correlation_id,
                    operation = operation.as_str(),
                    error = %error,
                    "rpc call found nothing"
                );
                Envelope::error(error.to_string())
            }
            Err(error) => {
                warn!(
                    event_name = "rpc.dispatch.error",
                    correlation_id = %correlation_id,
                    operation = operation.as_str(),
                    error_class = error.error_class(),
                    error = %error,
                    "rpc call failed"
                );
                Envelope::error(error.to_string())
            }
        }
    }

    fn repository(&self) -> Result<&CustomerRepository, ApplicationError> {
        self.customers
            .as_deref()
            .map_err(|message| ApplicationError::Configuration(message.clone()))
    }

    async fn call(&self, operation: Operation, args: Args) -> Result<Value, ApplicationError> {
        match operation {
            Operation::GetCustomers => {
                let page = self.repository()?.get_customers(1, DEFAULT_PAGE_SIZE).await?;
                to_data(page.items)
            }
            Operation::GetCustomersPaginated => {
                let page: u32 = args.required(0, "page")?;
                let page_size: u32 = args.required(1, "pageSize")?;
                let sort_field: Option<String> = args.optional(2, "sortField")?;
                let sort_order: Option<String> = args.optional(3, "sortOrder")?;
                let order = CustomerOrder::parse(sort_field.as_deref(), sort_order.as_deref())?;
                to_data(self.repository()?.get_customers_sorted(page, page_size, order).await?)
            }
            Operation::SearchCustomers => {
                let query: String = args.optional(0, "query")?.unwrap_or_default();
                to_data(self.repository()?.search_customers(&query).await)
            }
            Operation::GetCustomerById => {
                let id: String = args.required(0, "id")?;
                match self.repository()?.get_customer_by_id(&id).await {
                    Some(customer) => to_data(customer),
                    None => Err(DomainError::CustomerNotFound(id).into()),
                }
            }
            Operation::CreateCustomer => {
                let input: CustomerInput = args.required(0, "customer")?;
                to_data(self.repository()?.create_customer(input).await?)
            }
            Operation::UpdateCustomer => {
                let id: String = args.required(0, "id")?;
                let input: CustomerInput = args.required(1, "customer")?;
                to_data(self.repository()?.update_customer(&id, input).await?)
            }
            Operation::GetAddressByZipCode => {
                let zip_code: String = args.required(0, "zipCode")?;
                let candidates = self.address.lookup_by_zip(&zip_code).await;
                if candidates.is_empty() {
                    return Err(DomainError::AddressNotFound(format!("zip code {zip_code}")).into());
                }
                to_data(candidates)
            }
            Operation::GetZipCodeByAddress => {
                let prefecture: String = args.optional(0, "prefecture")?.unwrap_or_default();
                let city: String = args.optional(1, "city")?.unwrap_or_default();
                let address1: String = args.optional(2, "address1")?.unwrap_or_default();
                match self.address.lookup_zip_by_address(&prefecture, &city, &address1).await {
                    Some(zip_code) => to_data(zip_code),
                    None => Err(DomainError::AddressNotFound(format!(
                        "no zip code for {prefecture}{city}{address1}"
                    ))
                    .into()),
                }
            }
        }
    }
}

fn to_data<T: Serialize>(value: T) -> Result<Value, ApplicationError> {
    serde_json::to_value(value)
        .map_err(|error| ApplicationError::Integration(format!("response encoding failed: {error}")))
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().route("/api/rpc/{operation}", post(handle)).with_state(dispatcher)
}

async fn handle(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(operation): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<Envelope>) {
    let operation = match operation.parse::<Operation>() {
        Ok(operation) => operation,
        Err(error) => return (StatusCode::NOT_FOUND, Json(Envelope::error(error.to_string()))),
    };

    let args = match parse_args(&body) {
        Ok(args) => args,
        Err(message) => return (StatusCode::BAD_REQUEST, Json(Envelope::error(message))),
    };

    (StatusCode::OK, Json(dispatcher.dispatch(operation, args).await))
}

fn parse_args(body: &[u8]) -> Result<Vec<Value>, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(body)
        .map_err(|error| format!("request body must be a JSON array of arguments: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rolodex_core::domain::address::AddressCandidate;
    use rolodex_db::{CustomerRepository, InMemoryStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, Dispatcher, Envelope, Operation, RepositorySlot};
    use crate::address::AddressLookup;

    struct FixedAddress;

    #[async_trait]
    impl AddressLookup for FixedAddress {
        async fn lookup_by_zip(&self, zip_code: &str) -> Vec<AddressCandidate> {
            if zip_code.replace('-', "") == "1000001" {
                vec![AddressCandidate {
                    prefecture: "東京都".to_string(),
                    city: "千代田区".to_string(),
                    address1: "千代田".to_string(),
                }]
            } else {
                Vec::new()
            }
        }

        async fn lookup_zip_by_address(
            &self,
            prefecture: &str,
            city: &str,
            _address1: &str,
        ) -> Option<String> {
            (prefecture == "東京都" && city == "千代田区").then(|| "1000001".to_string())
        }
    }

    fn memory_repository() -> RepositorySlot {
        Ok(Arc::new(CustomerRepository::new(Arc::new(InMemoryStore::new()), "customers")))
    }

    fn dispatcher(customers: RepositorySlot) -> Dispatcher {
        Dispatcher::new(customers, Arc::new(FixedAddress))
    }

    fn data(envelope: Envelope) -> Value {
        match envelope {
            Envelope::Success { data } => data,
            Envelope::Error { message } => panic!("expected success, got error `{message}`"),
        }
    }

    fn message(envelope: Envelope) -> String {
        match envelope {
            Envelope::Error { message } => message,
            Envelope::Success { data } => panic!("expected error, got data {data}"),
        }
    }

    #[test]
    fn envelope_serializes_with_status_tag() {
        let success = serde_json::to_value(Envelope::Success { data: json!([1]) }).expect("json");
        assert_eq!(success, json!({ "status": "success", "data": [1] }));

        let error = serde_json::to_value(Envelope::error("boom")).expect("json");
        assert_eq!(error, json!({ "status": "error", "message": "boom" }));
    }

    #[test]
    fn operation_names_round_trip() {
        for operation in Operation::ALL {
            assert_eq!(operation.as_str().parse::<Operation>(), Ok(operation));
        }
        assert!("dropTables".parse::<Operation>().is_err());
    }

    #[tokio::test]
    async fn create_then_fetch_customer() {
        let dispatcher = dispatcher(memory_repository());

        let created = data(
            dispatcher
                .dispatch(
                    Operation::CreateCustomer,
                    vec![json!({ "name": "山田 太郎", "email": "taro.yamada@example.com" })],
                )
                .await,
        );
        assert_eq!(created["status"], "lead");
        let id = created["id"].as_str().expect("id").to_string();

        let fetched = data(dispatcher.dispatch(Operation::GetCustomerById, vec![json!(id)]).await);
        assert_eq!(fetched, created);

        let listed = data(dispatcher.dispatch(Operation::GetCustomers, Vec::new()).await);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let found = data(dispatcher.dispatch(Operation::SearchCustomers, vec![json!("YAMADA")]).await);
        assert_eq!(found[0]["email"], "taro.yamada@example.com");
    }

    #[tokio::test]
    async fn paginated_listing_returns_page_shape() {
        let dispatcher = dispatcher(memory_repository());
        for index in 0..3 {
            dispatcher
                .dispatch(
                    Operation::CreateCustomer,
                    vec![json!({ "name": format!("C{index}"), "email": format!("c{index}@example.com") })],
                )
                .await;
        }

        let page = data(
            dispatcher
                .dispatch(Operation::GetCustomersPaginated, vec![json!(1), json!(2), json!("name"), json!("asc")])
                .await,
        );

        assert_eq!(page["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(page["items"][0]["name"], "C0");
        assert_eq!(page["total"], -1);
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 2);
    }

    #[tokio::test]
    async fn argument_errors_become_error_envelopes() {
        let dispatcher = dispatcher(memory_repository());

        let missing = message(dispatcher.dispatch(Operation::GetCustomersPaginated, Vec::new()).await);
        assert!(missing.contains("page"), "{missing}");

        let zero = message(
            dispatcher.dispatch(Operation::GetCustomersPaginated, vec![json!(0), json!(10)]).await,
        );
        assert!(zero.contains("page must be at least 1"), "{zero}");

        let bad_sort = message(
            dispatcher
                .dispatch(Operation::GetCustomersPaginated, vec![json!(1), json!(10), json!("phone")])
                .await,
        );
        assert!(bad_sort.contains("sort field"), "{bad_sort}");

        let invalid = message(
            dispatcher.dispatch(Operation::CreateCustomer, vec![json!({ "name": "No Email" })]).await,
        );
        assert!(invalid.contains("email is required"), "{invalid}");
    }

    #[tokio::test]
    async fn missing_customer_is_an_error_envelope() {
        let dispatcher = dispatcher(memory_repository());

        let lookup = message(dispatcher.dispatch(Operation::GetCustomerById, vec![json!("missing-id")]).await);
        assert_eq!(lookup, "Customer not found: missing-id");

        let update = message(
            dispatcher
                .dispatch(
                    Operation::UpdateCustomer,
                    vec![json!("missing-id"), json!({ "name": "X", "email": "x@example.com" })],
                )
                .await,
        );
        assert_eq!(update, "Customer not found: missing-id");
    }

    #[tokio::test]
    async fn unconfigured_store_fails_customer_calls_but_not_address_calls() {
        let dispatcher =
            dispatcher(Err("store.project_id is required for the firestore backend".to_string()));

        let listing = message(dispatcher.dispatch(Operation::GetCustomers, Vec::new()).await);
        assert!(listing.contains("store.project_id is required"), "{listing}");

        let address = data(dispatcher.dispatch(Operation::GetAddressByZipCode, vec![json!("100-0001")]).await);
        assert_eq!(address[0]["prefecture"], "東京都");
    }

    #[tokio::test]
    async fn empty_address_lookups_are_errors() {
        let dispatcher = dispatcher(memory_repository());

        let by_zip = message(dispatcher.dispatch(Operation::GetAddressByZipCode, vec![json!("1234567")]).await);
        assert!(by_zip.starts_with("Address not found"), "{by_zip}");

        let zip = data(
            dispatcher
                .dispatch(
                    Operation::GetZipCodeByAddress,
                    vec![json!("東京都"), json!("千代田区"), json!("千代田")],
                )
                .await,
        );
        assert_eq!(zip, json!("1000001"));

        let none = dispatcher
            .dispatch(Operation::GetZipCodeByAddress, vec![json!("大阪府"), json!(""), json!("")])
            .await;
        assert!(!none.is_success());
    }

    async fn post(body: &str, operation: &str) -> (StatusCode, Value) {
        let app = router(Arc::new(dispatcher(memory_repository())));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/rpc/{operation}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn http_route_wraps_results_in_envelope() {
        let (status, body) = post("", "getCustomers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "success", "data": [] }));

        let (status, body) = post(r#"["missing-id"]"#, "getCustomerById").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn http_route_rejects_unknown_operation_and_bad_body() {
        let (status, body) = post("[]", "deleteEverything").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");

        let (status, body) = post(r#"{"page":1}"#, "getCustomersPaginated").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }
}
