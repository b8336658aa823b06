//! Link creation
//!
//! [`create_link`] validates a request, checks for collisions, performs the
//! optional enrichment lookup and then commits everything in one write
//! transaction. Validation and collision failures happen before any write,
//! and enrichment runs outside the transaction.

use chrono::Utc;
use url::Url;

use crate::codec;
use crate::database::AppState;
use crate::error::LinkError;
use crate::middleware::Principal;
use crate::model::{LinkRecord, NewLink, PathKind};

/// Input of one creation attempt.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    /// Requested path; empty means "derive one from the record identifier"
    pub path: String,
    pub target: String,
    /// External identifier of the chat to scope the link to
    pub chat_id: Option<i64>,
    /// Creator name used when the request is anonymous
    pub creator: Option<String>,
}

/// Creates a link and returns the stored record; `record.path` is the final
/// path.
///
/// `service_host` is the host this service is reachable under. Targets
/// pointing back at it are rejected.
///
/// Retrying an auto-path creation with identical inputs is safe: it
/// converges on the record created by the first successful attempt.
pub async fn create_link(
    state: &AppState,
    request: CreateLink,
    principal: Option<&Principal>,
    service_host: &str,
) -> Result<LinkRecord, LinkError> {
    if request.target.is_empty() {
        return Err(LinkError::EmptyTarget);
    }
    if !request.path.is_empty() {
        validate_manual_path(&request.path)?;
    }
    let target = parse_target(&request.target, service_host)?;

    // A chat that does not exist yet cannot hold a colliding path; it gets
    // created inside the commit below, which repeats the collision check.
    let scope = match request.chat_id {
        Some(external_id) => state
            .chats
            .find(external_id)?
            .map(|chat| Some(chat.internal_ref)),
        None => Some(None),
    };

    if let Some(tenant) = scope {
        if !request.path.is_empty() && state.links.count_by_path(&request.path, tenant)? > 0 {
            return Err(LinkError::PathTaken);
        }
    }

    let creator = resolve_creator(principal, request.creator.as_deref())?;
    let enrichment = state.enricher.lookup(&target).await;

    let draft = NewLink {
        path: request.path,
        target_url: target.to_string(),
        creator,
        created_at: Utc::now(),
        tenant_ref: scope.flatten(),
        enrichment,
    };

    let record = state.links.write(|w| {
        let mut draft = draft;
        if let Some(external_id) = request.chat_id {
            draft.tenant_ref = Some(w.resolve_chat(external_id)?);
        }

        let record_id = w.insert_incomplete(&draft)?;
        match draft.path_kind() {
            PathKind::Auto => w.finalize_path(record_id, &codec::encode(record_id)),
            PathKind::Manual => w.get_by_id(record_id)?.ok_or(LinkError::NotFound),
        }
    })?;

    tracing::info!(
        record_id = record.record_id,
        path = %record.path,
        kind = ?record.path_kind,
        chat_id = ?request.chat_id,
        target = %record.target_url,
        "created link"
    );

    Ok(record)
}

/// Manual paths must start with a lowercase letter, which keeps them apart
/// from auto paths, and cannot contain a path separator.
pub fn validate_manual_path(path: &str) -> Result<(), LinkError> {
    if path.contains('/') {
        return Err(LinkError::InvalidPath("paths may not contain '/'"));
    }
    if !path.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(LinkError::InvalidPath(
            "custom paths must begin with a lowercase letter",
        ));
    }
    Ok(())
}

/// Parses `raw` as an absolute http(s) URL that does not point back at
/// `service_host`.
pub fn parse_target(raw: &str, service_host: &str) -> Result<Url, LinkError> {
    let url = Url::parse(raw).map_err(|_| LinkError::InvalidTarget)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(LinkError::UnsupportedScheme);
    }

    let host = url.host_str().ok_or(LinkError::InvalidTarget)?;
    if host.eq_ignore_ascii_case(strip_port(service_host)) {
        return Err(LinkError::RedirectLoop);
    }

    Ok(url)
}

fn resolve_creator(principal: Option<&Principal>, hint: Option<&str>) -> Result<String, LinkError> {
    if let Some(principal) = principal {
        return Ok(principal.email.clone());
    }
    match hint.map(str::trim) {
        Some(creator) if !creator.is_empty() => Ok(creator.to_string()),
        _ => Err(LinkError::MissingCreator),
    }
}

/// "example.com:8080" -> "example.com", "[::1]:8080" -> "[::1]"
fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, _port)) => host,
        None => authority,
    }
}
