use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::provider::ProviderError;
use crate::recipe::NotJson;

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please slow down and try again in a moment.";
pub const MISSING_INGREDIENTS_MESSAGE: &str = "Missing ingredients";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request too large";
pub const MISSING_CONFIGURATION_MESSAGE: &str = "Missing server configuration";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Recipe provider request failed";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Every way a recipe request can end other than with a suggestion.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("client is inside its cooldown window")]
    RateLimited,
    #[error("request body exceeded the configured limit")]
    PayloadTooLarge,
    #[error("ingredients missing or empty")]
    MissingIngredients,
    #[error("provider api key not configured")]
    MissingApiKey,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    NotJson(#[from] NotJson),
}

impl RecipeError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecipeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RecipeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RecipeError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RecipeError::MissingIngredients => StatusCode::BAD_REQUEST,
            RecipeError::Provider(ProviderError::Status { .. }) => StatusCode::BAD_GATEWAY,
            RecipeError::MissingApiKey
            | RecipeError::Provider(ProviderError::Transport(_))
            | RecipeError::NotJson(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecipeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            RecipeError::MethodNotAllowed => {
                return (
                    status,
                    [(header::ALLOW, "POST")],
                    METHOD_NOT_ALLOWED_MESSAGE,
                )
                    .into_response();
            }
            RecipeError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            RecipeError::PayloadTooLarge => PAYLOAD_TOO_LARGE_MESSAGE.to_string(),
            RecipeError::MissingIngredients => MISSING_INGREDIENTS_MESSAGE.to_string(),
            RecipeError::MissingApiKey => MISSING_CONFIGURATION_MESSAGE.to_string(),
            // Provider text is the only internal detail passed through.
            RecipeError::Provider(ProviderError::Status { body, .. }) if !body.is_empty() => body,
            RecipeError::Provider(ProviderError::Status { .. }) => {
                UPSTREAM_FAILURE_MESSAGE.to_string()
            }
            RecipeError::Provider(ProviderError::Transport(_)) | RecipeError::NotJson(_) => {
                SERVER_ERROR_MESSAGE.to_string()
            }
        };
        (status, body).into_response()
    }
}

/// Response for a panic caught by the outermost layer.
pub fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE).into_response()
}
