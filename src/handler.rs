//! HTTP request handlers
//!
//! - The index handler shows recent links and creates links from the form
//! - The path resolver redirects short links (auto or manual)
//! - The API handlers create and list links as JSON

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::json;

use crate::codec;
use crate::creation::{create_link, CreateLink};
use crate::database::AppState;
use crate::error::LinkError;
use crate::middleware::Identity;
use crate::model::{
    CreateRequest, CreateResponse, IndexForm, IndexView, LinkRecord, ListParams, PathKind,
    ResolveParams,
};
use crate::route::{classify, Route};

/// Index view and creation form
///
/// `GET /?path=..&chatID=..` renders the view; when `path` does not resolve
/// the view carries a "does not exist, create it?" message. `POST /` creates
/// a link from the form fields (`path`, `target`, `chatID`, `creator`).
///
/// # Response
///
/// - **200 OK** - View rendered
/// - **201 Created** - Link created, `created_url` is set
/// - **4xx** - Creation rejected, `message` explains why
/// - **500** - Storage failure
pub async fn index(
    State(state): State<AppState>,
    identity: Identity,
    method: Method,
    headers: HeaderMap,
    Form(form): Form<IndexForm>,
) -> Result<Response, LinkError> {
    let host = service_host(&state, &headers);
    let mut view = IndexView {
        host: host.clone(),
        path: form.path.clone().unwrap_or_default(),
        target: form.target.clone().unwrap_or_default(),
        message: None,
        created_url: None,
        past_links: Vec::new(),
    };
    let mut status = StatusCode::OK;

    if method == Method::POST {
        let outcome = match parse_chat_id(form.chat_id.as_deref()) {
            Ok(chat_id) => {
                let request = CreateLink {
                    path: view.path.clone(),
                    target: view.target.clone(),
                    chat_id,
                    creator: form.creator.clone(),
                };
                create_link(&state, request, identity.principal(), &host).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(record) => {
                view.created_url = Some(short_url(&host, &record.path));
                status = StatusCode::CREATED;
            }
            Err(err) if err.is_server_error() => return Err(err),
            Err(err) => {
                view.message = Some(err.user_message());
                status = err.status_code();
            }
        }
    } else if !view.path.is_empty() {
        match find_link(&state, &view.path, form.chat_id.as_deref()) {
            Ok(Some(_)) => {}
            Ok(None) | Err(LinkError::InvalidChatId) => {
                view.message = Some(format!("/{} does not exist. Create it?", view.path));
            }
            Err(err) => return Err(err),
        }
    }

    view.past_links = state.links.list_recent(state.config.recent_limit)?;

    Ok((status, Json(view)).into_response())
}

/// Redirects a short link
///
/// Installed as the router fallback, so it sees every path the fixed routes
/// do not claim. Auto paths are decoded back to a record identifier; manual
/// paths are looked up in the scope given by the `chatID` query parameter.
///
/// # Response
///
/// - **307 Temporary Redirect** - To the target, or to the creation prompt
///   (`/?path=..&chatID=..`) when a manual path does not exist
/// - **400 Bad Request** - `chatID` is not an integer
/// - **404 Not Found** - Unknown auto path or unroutable path
/// - **405 Method Not Allowed** - Anything but GET/HEAD
pub async fn resolve_path(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(params): Query<ResolveParams>,
) -> Result<Response, LinkError> {
    if method != Method::GET && method != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let Ok(path) = urlencoding::decode(uri.path()) else {
        return Err(LinkError::NotFound);
    };

    match classify(&path) {
        Route::Link {
            kind: PathKind::Auto,
            path,
        } => redirect_auto(&state, &path),
        Route::Link {
            kind: PathKind::Manual,
            path,
        } => redirect_manual(&state, &path, params.chat_id.as_deref()),
        Route::Root => Ok(Redirect::temporary("/").into_response()),
        Route::Unmatched => Err(LinkError::NotFound),
    }
}

fn redirect_auto(state: &AppState, token: &str) -> Result<Response, LinkError> {
    let record_id = codec::decode(token).ok_or(LinkError::NotFound)?;

    // The identifier alone is not enough: manual links have identifiers
    // too, and must only resolve under their own path.
    let record = state
        .links
        .get_by_id(record_id)?
        .filter(|record| record.path_kind == PathKind::Auto && record.path == token)
        .ok_or(LinkError::NotFound)?;

    tracing::debug!(record_id, "auto redirect");
    Ok(Redirect::temporary(&record.target_url).into_response())
}

fn redirect_manual(
    state: &AppState,
    path: &str,
    raw_chat_id: Option<&str>,
) -> Result<Response, LinkError> {
    if let Some(record) = find_link(state, path, raw_chat_id)? {
        return Ok(Redirect::temporary(&record.target_url).into_response());
    }

    let prompt = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("path", path)
        .append_pair("chatID", raw_chat_id.unwrap_or_default())
        .finish();
    Ok(Redirect::temporary(&format!("/?{prompt}")).into_response())
}

/// Looks up a manual path in the scope named by a raw `chatID` value.
///
/// A chat that was never registered holds no links, so it resolves to
/// `None` without creating the chat.
fn find_link(
    state: &AppState,
    path: &str,
    raw_chat_id: Option<&str>,
) -> Result<Option<LinkRecord>, LinkError> {
    let tenant = match parse_chat_id(raw_chat_id)? {
        Some(external_id) => match state.chats.find(external_id)? {
            Some(chat) => Some(chat.internal_ref),
            None => return Ok(None),
        },
        None => None,
    };

    state.links.get_by_path(path, tenant)
}

/// Creates a link from a JSON payload
///
/// # Response
///
/// - **201 Created** - Link created
/// - **400 Bad Request** - Validation failed
/// - **409 Conflict** - Path already taken in that scope
pub async fn create_link_api(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
    Json(payload): Json<CreateRequest>,
) -> Result<Response, LinkError> {
    let host = service_host(&state, &headers);
    let request = CreateLink {
        path: payload.path.unwrap_or_default(),
        target: payload.target,
        chat_id: payload.chat_id,
        creator: payload.creator,
    };

    let record = create_link(&state, request, identity.principal(), &host).await?;

    let response = CreateResponse {
        short_url: short_url(&host, &record.path),
        path: record.path,
        target_url: record.target_url,
        created_at: record.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Lists recently created links, newest first
///
/// `GET /api/links?limit=20`
pub async fn list_links(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, LinkError> {
    let limit = params
        .limit
        .unwrap_or(state.config.recent_limit)
        .clamp(1, 100);

    let links = state.links.list_recent(limit)?;

    Ok(Json(json!({
        "limit": limit,
        "total_fetched": links.len(),
        "data": links
    }))
    .into_response())
}

/// Parses a raw `chatID` value; absent or blank means "no chat".
fn parse_chat_id(raw: Option<&str>) -> Result<Option<i64>, LinkError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| LinkError::InvalidChatId),
    }
}

/// Host this service is reachable under: the configured public host, else
/// the request's `Host` header.
fn service_host(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(host) = state.config.public_host.as_deref() {
        return host.to_string();
    }
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

fn short_url(host: &str, path: &str) -> String {
    format!("http://{host}/{path}")
}
