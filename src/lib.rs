//! Core library for Larder.  This module wires together the request
//! handler, the per-client rate limiter, the prompt builder and the
//! completion provider into a single axum router.

mod config;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod recipe;

pub use config::AppConfig;
pub use error::RecipeError;
pub use recipe::RecipeSuggestion;

use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{
    rejection::{BytesRejection, FailedToBufferBody},
    DefaultBodyLimit, State,
};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;

use crate::prompt::build_messages;
use crate::provider::{CompletionProvider, OpenAiChatProvider};
use crate::rate_limit::{RateLimiter, UNKNOWN_CLIENT};
use crate::recipe::{parse_model_json, sanitize, INGREDIENTS_MAX_CHARS};

/// Headers consulted, in order, to identify the calling client.
const CLIENT_ADDRESS_HEADERS: [&str; 2] = ["x-real-ip", "x-forwarded-for"];

/// Application state shared across handlers.  Cloned per request; all
/// heavy members sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Provider secret. `None` makes every recipe request fail with 500.
    pub api_key: Option<Arc<str>>,
    pub model: String,
    pub max_request_bytes: usize,
}

impl AppState {
    pub fn new(config: &AppConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            rate_limiter: Arc::new(RateLimiter::new(config.cooldown)),
            api_key: config.api_key.as_deref().map(Arc::from),
            model: config.model.clone(),
            max_request_bytes: config.max_request_bytes,
        }
    }
}

/// Build state from environment variables:
///
/// * `OPENAI_API_KEY` – provider secret; may be absent.
/// * `LARDER_PROVIDER_URL`, `LARDER_MODEL` – completion endpoint and model.
/// * `LARDER_PROVIDER_TIMEOUT_MS` – outbound timeout, `0` disables it.
/// * `LARDER_COOLDOWN_MS` – per-client cooldown window.
/// * `LARDER_MAX_REQUEST_BYTES` – inbound body cap.
pub async fn build_state_from_env() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    let provider = OpenAiChatProvider::new(
        config.provider_url.clone(),
        config.model.clone(),
        config.provider_timeout,
    )
    .context("failed to build provider HTTP client")?;

    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; recipe requests will fail until it is configured");
    }
    tracing::info!(
        model = %provider.model(),
        url = %provider.url(),
        cooldown_ms = config.cooldown.as_millis() as u64,
        timeout_ms = ?config.provider_timeout.map(|t| t.as_millis() as u64),
        "provider configured"
    );

    Ok(AppState::new(&config, Arc::new(provider)))
}

/// Build the Axum router and attach handlers.
pub fn app(state: AppState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    Router::new()
        .route("/", any(recipe_handler))
        .route("/api/recipe", any(recipe_handler))
        .route("/healthz", get(healthz_handler))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Pick the client identifier from the address headers, falling back to
/// [`UNKNOWN_CLIENT`].
pub fn client_id(headers: &HeaderMap) -> String {
    CLIENT_ADDRESS_HEADERS
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Extract the sanitised, trimmed `ingredients` field. A body that is not
/// JSON is treated like an empty object.
pub fn ingredients_from_body(body: &[u8]) -> String {
    let value: Value =
        serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()));
    sanitize(value.get("ingredients"), INGREDIENTS_MAX_CHARS)
        .trim()
        .to_string()
}

/// Handler for the recipe endpoint.  Runs the whole request flow and turns
/// any terminal error into its plain-text response.
async fn recipe_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match suggest(&state, &method, &headers, body).await {
        Ok(recipe) => (StatusCode::OK, Json(recipe)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn suggest(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<RecipeSuggestion, RecipeError> {
    if *method != Method::POST {
        return Err(RecipeError::MethodNotAllowed);
    }

    let client = client_id(headers);
    if !state.rate_limiter.allow(&client) {
        tracing::info!(client = %client, "rate limited");
        return Err(RecipeError::RateLimited);
    }

    let body = match body {
        Ok(bytes) => bytes,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_))) => {
            tracing::warn!(limit = state.max_request_bytes, "request body exceeded configured limit");
            return Err(RecipeError::PayloadTooLarge);
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "failed to read request body");
            Bytes::new()
        }
    };
    let ingredients = ingredients_from_body(&body);
    if ingredients.is_empty() {
        return Err(RecipeError::MissingIngredients);
    }

    let Some(api_key) = state.api_key.as_deref() else {
        tracing::error!("provider api key not configured");
        return Err(RecipeError::MissingApiKey);
    };

    tracing::debug!(client = %client, ingredients_len = ingredients.chars().count(), "requesting recipe");
    let messages = build_messages(&ingredients);
    let text = state
        .provider
        .complete(api_key, &messages)
        .await
        .inspect_err(|err| {
            tracing::error!(provider = %state.provider.name(), error = %err, "provider call failed")
        })?;

    let value = parse_model_json(&text).inspect_err(|_| {
        tracing::error!(reply_len = text.len(), "model did not return JSON")
    })?;
    Ok(RecipeSuggestion::from_model_value(&value))
}

/// Liveness endpoint.  Reports whether a provider key is present, never
/// the key itself.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    let json = serde_json::json!({
        "status": "ok",
        "model": state.model,
        "configured": state.api_key.is_some(),
        "ts": chrono::Utc::now().to_rfc3339(),
    });
    (StatusCode::OK, Json(json)).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "request handler panicked");
    error::server_error()
}
