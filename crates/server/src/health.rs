use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::rpc::RepositorySlot;

#[derive(Clone)]
pub struct HealthState {
    customers: RepositorySlot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(customers: RepositorySlot) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { customers })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(&state.customers).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "rolodex-server runtime initialized".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(customers: &RepositorySlot) -> HealthCheck {
    let repository = match customers {
        Ok(repository) => repository,
        Err(message) => {
            return HealthCheck {
                status: "degraded",
                detail: format!("store is not configured: {message}"),
            }
        }
    };

    match repository.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: "store query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("store query failed: {error}") }
        }
    }
}
