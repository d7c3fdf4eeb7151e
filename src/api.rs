use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ProviderError;
use crate::provider::AcmeDnsProvider;
use crate::record::{Record, RecordAppender, RecordDeleter, RecordGetter, RecordSetter};

pub struct AppState {
    pub config: Config,
    pub client: Client,
}

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    records: Vec<Record>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

#[derive(Deserialize)]
struct RecordsRequest {
    records: Vec<Record>,
}

/// Builds the relay router. Every provider shares `client`.
pub fn create_router(config: Config, client: Client) -> Router {
    let state = Arc::new(AppState { config, client });

    Router::new()
        .route(
            "/zones/{provider}/{zone}/records",
            get(get_records)
                .post(append_records)
                .put(set_records)
                .delete(delete_records),
        )
        .route("/health", get(health_check))
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    // Query may carry the relay key, so only the path is logged.
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or("-").trim().to_string())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let length = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let duration = start.elapsed();

    // method path "user-agent" ip status length duration
    info!(
        target: "access",
        "{} {} \"{}\" {} {} {} {:.3}ms",
        method, path, user_agent, ip, status, length, duration.as_secs_f64() * 1000.0
    );

    response
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn get_records(
    State(state): State<Arc<AppState>>,
    Path((provider_name, zone)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Response {
    let provider = match authorize(&state, &provider_name, &query) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    respond(&provider_name, provider.get_records(&zone).await)
}

async fn append_records(
    State(state): State<Arc<AppState>>,
    Path((provider_name, zone)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<RecordsRequest>,
) -> Response {
    let provider = match authorize(&state, &provider_name, &query) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    respond(&provider_name, provider.append_records(&zone, body.records).await)
}

async fn set_records(
    State(state): State<Arc<AppState>>,
    Path((provider_name, zone)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<RecordsRequest>,
) -> Response {
    let provider = match authorize(&state, &provider_name, &query) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    respond(&provider_name, provider.set_records(&zone, body.records).await)
}

async fn delete_records(
    State(state): State<Arc<AppState>>,
    Path((provider_name, zone)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<RecordsRequest>,
) -> Response {
    let provider = match authorize(&state, &provider_name, &query) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    respond(&provider_name, provider.delete_records(&zone, body.records).await)
}

/// Looks up the provider and checks its access key, if one is configured.
fn authorize(
    state: &AppState,
    provider_name: &str,
    query: &KeyQuery,
) -> Result<AcmeDnsProvider, Response> {
    let provider_config = match state.config.get_provider(provider_name) {
        Some(config) => config,
        None => {
            return Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Provider not found: {}", provider_name),
            ));
        }
    };

    if let Some(ref config_key) = provider_config.key {
        let request_key = query.key.as_deref().unwrap_or("");
        if request_key != config_key {
            warn!("Invalid key for provider: {}", provider_name);
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid key".to_string(),
            ));
        }
    }

    Ok(AcmeDnsProvider::with_client(
        provider_config.account.clone(),
        state.client.clone(),
    ))
}

fn respond(provider_name: &str, result: crate::error::Result<Vec<Record>>) -> Response {
    match result {
        Ok(records) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                records,
            }),
        )
            .into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Provider {} failed: {}", provider_name, e);
            } else {
                warn!("Provider {} refused request: {}", provider_name, e);
            }
            error_response(status, e.to_string())
        }
    }
}

fn status_for(err: &ProviderError) -> StatusCode {
    match err {
        ProviderError::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
        ProviderError::Unsupported(_) => StatusCode::BAD_REQUEST,
        ProviderError::Transport(_) | ProviderError::RemoteRejected { .. } => StatusCode::BAD_GATEWAY,
        ProviderError::InvalidEndpoint(_) | ProviderError::Encode(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
        .into_response()
}
