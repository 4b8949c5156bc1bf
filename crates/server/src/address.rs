//! Postal-code and reverse-geocoding lookups.
//!
//! Neither lookup ever fails: every upstream problem is logged and reported as
//! "nothing found".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rolodex_core::config::GeocodingConfig;
use rolodex_core::domain::address::{normalize_zip_code, strip_hyphens, AddressCandidate};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

const ZIPCLOUD_STATUS_OK: u16 = 200;
const GEOCODE_STATUS_OK: &str = "OK";
const POSTAL_CODE_COMPONENT: &str = "postal_code";

#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Address candidates for a 7-digit postal code (hyphens allowed).
    async fn lookup_by_zip(&self, zip_code: &str) -> Vec<AddressCandidate>;

    /// Postal code for an address, hyphens stripped.
    async fn lookup_zip_by_address(
        &self,
        prefecture: &str,
        city: &str,
        address1: &str,
    ) -> Option<String>;
}

pub struct HttpAddressLookup {
    client: Client,
    postal_code_url: String,
    geocode_url: String,
    api_key: Option<SecretString>,
}

impl HttpAddressLookup {
    pub fn new(config: &GeocodingConfig) -> Result<Self, reqwest::Error> {
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1))).build()?;
        Ok(Self {
            client,
            postal_code_url: config.postal_code_url.clone(),
            geocode_url: config.geocode_url.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.expose_secret().trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| format!("request failed: {error}"))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| format!("body read failed: {error}"))?;
        if !status.is_success() {
            return Err(format!("upstream returned HTTP {}", status.as_u16()));
        }

        // zipcloud answers with a text/plain content type, so decode the body
        // directly instead of going through `Response::json`.
        serde_json::from_str(&body).map_err(|error| format!("undecodable response: {error}"))
    }
}

#[derive(Debug, Deserialize)]
struct ZipcloudResponse {
    status: u16,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Option<Vec<ZipcloudResult>>,
}

#[derive(Debug, Deserialize)]
struct ZipcloudResult {
    #[serde(default)]
    address1: String,
    #[serde(default)]
    address2: String,
    #[serde(default)]
    address3: String,
}

impl From<ZipcloudResult> for AddressCandidate {
    fn from(result: ZipcloudResult) -> Self {
        Self { prefecture: result.address1, city: result.address2, address1: result.address3 }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup_by_zip(&self, zip_code: &str) -> Vec<AddressCandidate> {
        let Some(digits) = normalize_zip_code(zip_code) else {
            debug!(
                event_name = "address.zip.rejected",
                zip_code = %zip_code,
                "postal code is not a 7-digit number; skipping lookup"
            );
            return Vec::new();
        };

        let response: ZipcloudResponse =
            match self.get_json(&self.postal_code_url, &[("zipcode", digits.as_str())]).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(
                        event_name = "address.zip.upstream_failure",
                        zip_code = %digits,
                        error = %error,
                        "postal code lookup failed"
                    );
                    return Vec::new();
                }
            };

        if response.status != ZIPCLOUD_STATUS_OK {
            warn!(
                event_name = "address.zip.rejected_upstream",
                zip_code = %digits,
                status = response.status,
                message = response.message.as_deref().unwrap_or(""),
                "postal code service rejected the request"
            );
            return Vec::new();
        }

        let candidates: Vec<AddressCandidate> = response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(AddressCandidate::from)
            .collect();
        debug!(
            event_name = "address.zip.resolved",
            zip_code = %digits,
            candidates = candidates.len(),
            "postal code lookup completed"
        );
        candidates
    }

    async fn lookup_zip_by_address(
        &self,
        prefecture: &str,
        city: &str,
        address1: &str,
    ) -> Option<String> {
        let Some(api_key) = &self.api_key else {
            warn!(
                event_name = "address.geocode.unconfigured",
                "geocoding api key is not configured; skipping reverse lookup"
            );
            return None;
        };

        let address = format!("{}{}{}", prefecture.trim(), city.trim(), address1.trim());
        let query = [
            ("address", address.as_str()),
            ("key", api_key.expose_secret()),
            ("language", "ja"),
            ("region", "jp"),
        ];
        let response: GeocodeResponse = match self.get_json(&self.geocode_url, &query).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "address.geocode.upstream_failure",
                    address = %address,
                    error = %error,
                    "geocoding lookup failed"
                );
                return None;
            }
        };

        if response.status != GEOCODE_STATUS_OK {
            warn!(
                event_name = "address.geocode.no_match",
                address = %address,
                status = %response.status,
                "geocoding returned no usable result"
            );
            return None;
        }

        let zip_code = response.results.into_iter().next().and_then(|result| {
            result
                .address_components
                .into_iter()
                .find(|component| component.types.iter().any(|kind| kind == POSTAL_CODE_COMPONENT))
                .map(|component| strip_hyphens(&component.long_name))
        });
        if zip_code.is_none() {
            warn!(
                event_name = "address.geocode.no_postal_code",
                address = %address,
                "geocoding result carries no postal code component"
            );
        }
        zip_code
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use rolodex_core::config::AppConfig;
    use rolodex_core::domain::address::AddressCandidate;
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use super::{AddressLookup, HttpAddressLookup};

    #[derive(Clone, Default)]
    struct Upstream {
        calls: Arc<AtomicUsize>,
    }

    async fn zipcloud(
        State(upstream): State<Upstream>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        upstream.calls.fetch_add(1, Ordering::SeqCst);
        let body = match params.get("zipcode").map(String::as_str) {
            Some("1000001") => json!({
                "status": 200,
                "message": null,
                "results": [{
                    "address1": "東京都",
                    "address2": "千代田区",
                    "address3": "千代田",
                    "kana1": "ﾄｳｷｮｳﾄ",
                    "prefcode": "13",
                    "zipcode": "1000001"
                }]
            }),
            Some("9999999") => json!({ "status": 400, "message": "invalid", "results": null }),
            _ => json!({ "status": 200, "message": null, "results": null }),
        };
        Json(body)
    }

    async fn geocode(
        State(upstream): State<Upstream>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        upstream.calls.fetch_add(1, Ordering::SeqCst);
        let expected = params.get("language").map(String::as_str) == Some("ja")
            && params.get("region").map(String::as_str) == Some("jp")
            && params.get("key").map(String::as_str) == Some("test-key");
        if expected && params.get("address").map(String::as_str) == Some("東京都千代田区千代田") {
            return Json(json!({
                "status": "OK",
                "results": [{
                    "address_components": [
                        { "long_name": "千代田", "types": ["sublocality"] },
                        { "long_name": "100-0001", "types": ["postal_code"] }
                    ]
                }]
            }));
        }
        Json(json!({ "status": "ZERO_RESULTS", "results": [] }))
    }

    async fn spawn_upstream(upstream: Upstream) -> String {
        let router = Router::new()
            .route("/zip", get(zipcloud))
            .route("/geocode", get(geocode))
            .with_state(upstream);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    async fn fake_backed_lookup(api_key: Option<&str>) -> (HttpAddressLookup, Upstream) {
        let upstream = Upstream::default();
        let base = spawn_upstream(upstream.clone()).await;
        let mut config = AppConfig::default().geocoding;
        config.postal_code_url = format!("{base}/zip");
        config.geocode_url = format!("{base}/geocode");
        config.api_key = api_key.map(|key| SecretString::from(key.to_string()));
        (HttpAddressLookup::new(&config).expect("client"), upstream)
    }

    #[tokio::test]
    async fn zip_lookup_maps_zipcloud_fields() {
        let (lookup, _) = fake_backed_lookup(None).await;

        let candidates = lookup.lookup_by_zip("100-0001").await;

        assert_eq!(
            candidates,
            vec![AddressCandidate {
                prefecture: "東京都".to_string(),
                city: "千代田区".to_string(),
                address1: "千代田".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn zip_lookup_with_no_results_is_empty() {
        let (lookup, upstream) = fake_backed_lookup(None).await;

        assert!(lookup.lookup_by_zip("1234567").await.is_empty());
        assert!(lookup.lookup_by_zip("9999999").await.is_empty());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_zip_never_reaches_upstream() {
        let (lookup, upstream) = fake_backed_lookup(None).await;

        assert!(lookup.lookup_by_zip("123-456").await.is_empty());
        assert!(lookup.lookup_by_zip("abcdefg").await.is_empty());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_upstream_reads_as_empty() {
        let mut config = AppConfig::default().geocoding;
        config.postal_code_url = "http://127.0.0.1:9/zip".to_string();
        config.timeout_secs = 2;
        let lookup = HttpAddressLookup::new(&config).expect("client");

        assert!(lookup.lookup_by_zip("1000001").await.is_empty());
    }

    #[tokio::test]
    async fn reverse_lookup_returns_stripped_postal_code() {
        let (lookup, _) = fake_backed_lookup(Some("test-key")).await;

        let zip = lookup.lookup_zip_by_address("東京都", "千代田区", "千代田").await;

        assert_eq!(zip.as_deref(), Some("1000001"));
        assert_eq!(lookup.lookup_zip_by_address("東京都", "どこか", "").await, None);
    }

    #[tokio::test]
    async fn reverse_lookup_without_key_skips_upstream() {
        let (lookup, upstream) = fake_backed_lookup(None).await;

        assert!(!lookup.has_api_key());
        assert_eq!(lookup.lookup_zip_by_address("東京都", "千代田区", "千代田").await, None);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }
}
