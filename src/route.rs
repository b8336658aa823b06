//! Route definitions and request path classification
//!
//! Short links live directly under the root, so axum's router only handles
//! the fixed endpoints (`/` and `/api`). Everything else reaches
//! [`crate::handler::resolve_path`], which uses [`classify`] to pick a
//! resolution mode.

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{create_link_api, index, list_links, resolve_path};
use crate::middleware::auth_middleware;
use crate::model::PathKind;

/// Resolution mode of a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`: index and creation form
    Root,
    /// A short link path, without the leading `/`
    Link { kind: PathKind, path: String },
    /// Anything else: 404
    Unmatched,
}

/// Classifies an already percent-decoded request path.
///
/// First match wins:
///
/// 1. `/` is [`Route::Root`].
/// 2. `/TOKEN` or `/TOKEN/`, with TOKEN made of uppercase letters, digits
///    and `-`, is an auto link.
/// 3. A path whose first character is a lowercase letter is a manual link;
///    the rest of the path is kept verbatim.
pub fn classify(path: &str) -> Route {
    let Some(rest) = path.strip_prefix('/') else {
        return Route::Unmatched;
    };
    if rest.is_empty() {
        return Route::Root;
    }

    let token = rest.strip_suffix('/').unwrap_or(rest);
    if !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
    {
        return Route::Link {
            kind: PathKind::Auto,
            path: token.to_string(),
        };
    }

    if rest.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Route::Link {
            kind: PathKind::Manual,
            path: rest.to_string(),
        };
    }

    Route::Unmatched
}

/// Creates and configures the application router
///
/// # Route Definitions
///
/// - `GET|POST /` - Index view and link creation form
/// - `GET /api/links` - Recently created links
/// - `POST /api/links` - Creates a link from a JSON payload
/// - `GET /{path}` - Redirects a short link (see [`classify`])
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/links", get(list_links).post(create_link_api))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(index).post(index))
        .nest("/api", api_routes)
        .fallback(resolve_path)
        .with_state(state)
}
