use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;

use crate::database::AppState;

/// An authenticated user, as reported by the identity proxy in front of the
/// service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// Identity of the caller, if any
///
/// Identity is only read when `IDENTITY_HEADER` is configured, since the
/// header is trustworthy only behind a proxy that sets it. Without it every
/// request is anonymous.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<Principal>);

impl Identity {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = state.config.identity_header.as_deref() else {
            return Ok(Identity(None));
        };

        let email = parts
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|email| !email.is_empty());

        let principal = email.map(|email| Principal {
            email: email.to_string(),
        });

        Ok(Identity(principal))
    }
}

/// Middleware to check for the Authorization header on API routes
///
/// When an API secret is configured (`AUTHORIZATION`), requests must carry
/// an `Authorization` header with exactly that value. Without a configured
/// secret the check is skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(auth_secret) = state.config.api_secret.as_deref() {
        let authorized = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == auth_secret);

        if !authorized {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": "Invalid or missing authorization header"
                })),
            )
                .into_response());
        }
    }

    Ok(next.run(request).await)
}
