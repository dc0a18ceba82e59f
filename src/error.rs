use crate::models::ProviderId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every failure the routing layer can surface. `Display` is the technical
/// message; [`AppError::user_message`] is what a rider should see.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("no network connection available")]
    NoInternet,

    #[error("network too slow to complete the request")]
    SlowConnection,

    #[error("routing server did not respond in time")]
    ServerTimeout,

    #[error("routing provider rejected the API key")]
    ApiKeyInvalid,

    #[error("routing provider rate limit exceeded")]
    RateLimitExceeded,

    #[error("no route found between the requested locations")]
    LocationNotFound,

    #[error("routing server error (HTTP {0})")]
    ServerError(u16),

    #[error("unexpected routing failure: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NoInternet
            | AppError::SlowConnection
            | AppError::ServerTimeout
            | AppError::RateLimitExceeded
            | AppError::Unknown(_) => true,
            AppError::ApiKeyInvalid | AppError::LocationNotFound => false,
            AppError::ServerError(code) => (500..=599).contains(code),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::NoInternet => "You appear to be offline.",
            AppError::SlowConnection => "Your connection is too slow right now.",
            AppError::ServerTimeout => "The routing service is taking too long to respond.",
            AppError::ApiKeyInvalid => "Routing is temporarily unavailable.",
            AppError::RateLimitExceeded => "Too many route requests. Please wait a moment.",
            AppError::LocationNotFound => "We couldn't find a route between these locations.",
            AppError::ServerError(_) => "The routing service is having problems.",
            AppError::Unknown(_) => "Something went wrong while finding your route.",
        }
    }

    pub fn technical_message(&self) -> String {
        self.to_string()
    }

    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::NoInternet => Some("Check your connection and try again."),
            AppError::SlowConnection => {
                Some("Move to an area with better signal or switch to Wi-Fi.")
            }
            AppError::ServerTimeout | AppError::ServerError(_) => {
                Some("Try again in a few minutes.")
            }
            AppError::RateLimitExceeded => Some("Wait a few seconds before retrying."),
            AppError::LocationNotFound => Some("Adjust the pickup or dropoff point."),
            AppError::ApiKeyInvalid => Some("Contact support if this persists."),
            AppError::Unknown(_) => None,
        }
    }

    /// Stable identifier for logs and response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoInternet => "no_internet",
            AppError::SlowConnection => "slow_connection",
            AppError::ServerTimeout => "server_timeout",
            AppError::ApiKeyInvalid => "api_key_invalid",
            AppError::RateLimitExceeded => "rate_limit_exceeded",
            AppError::LocationNotFound => "location_not_found",
            AppError::ServerError(_) => "server_error",
            AppError::Unknown(_) => "unknown",
        }
    }
}

/// Terminal error from one provider during a resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: AppError,
}

/// Terminal state of a failed resolution: the last error, the provider that
/// produced it, and every provider failure in the order attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFailure {
    pub error: AppError,
    pub provider: Option<ProviderId>,
    pub attempts: Vec<ProviderFailure>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("{} (provider: {})", .0.error, provider_label(.0.provider))]
    Failed(RouteFailure),

    #[error("route resolution cancelled")]
    Cancelled,
}

fn provider_label(provider: Option<ProviderId>) -> String {
    provider
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl RouteError {
    pub fn app_error(&self) -> Option<&AppError> {
        match self {
            RouteError::Failed(failure) => Some(&failure.error),
            RouteError::Cancelled => None,
        }
    }

    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            RouteError::Failed(failure) => failure.provider,
            RouteError::Cancelled => None,
        }
    }
}

// Convert RouteError into HTTP responses
impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let failure = match self {
            RouteError::Cancelled => {
                tracing::info!("Route resolution cancelled before completion");
                let body = Json(json!({
                    "error": "cancelled",
                    "message": "The request was cancelled.",
                }));
                return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
            }
            RouteError::Failed(failure) => failure,
        };

        let status = match failure.error {
            AppError::NoInternet | AppError::SlowConnection => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ServerTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::ApiKeyInvalid | AppError::ServerError(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::LocationNotFound => StatusCode::NOT_FOUND,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(
                provider = %provider_label(failure.provider),
                code = failure.error.code(),
                "Route resolution failed: {}",
                failure.error
            );
        } else {
            tracing::warn!(
                provider = %provider_label(failure.provider),
                code = failure.error.code(),
                "Route resolution rejected: {}",
                failure.error
            );
        }

        let body = Json(json!({
            "error": failure.error.code(),
            "message": failure.error.user_message(),
            "technical_message": failure.error.technical_message(),
            "retryable": failure.error.is_retryable(),
            "suggested_action": failure.error.suggested_action(),
            "provider": failure.provider,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RouteError>;
