//! Data models for the link shortener
//!
//! This module defines the persisted records (links and chats) and the
//! request/response shapes used by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a link's path came to be
///
/// Stored on every record so resolution never has to guess the origin of a
/// path from its spelling.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    /// Derived from the record identifier through [`crate::codec::encode`]
    Auto,
    /// Chosen by the creator
    Manual,
}

/// Internal reference to a chat record, usable to scope links
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChatRef(pub u64);

/// Returns the uniqueness scope a path lives in.
///
/// Paths are unique per chat, or globally for links without a chat.
pub fn scope_key(tenant: Option<ChatRef>) -> String {
    match tenant {
        Some(ChatRef(internal_ref)) => format!("chat-{internal_ref}"),
        None => "global".to_string(),
    }
}

/// Optional media metadata attached to a link after creation
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
}

/// A link stored in the database
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LinkRecord {
    /// Store-assigned identifier, set once at first insert
    pub record_id: u64,

    /// Path the link resolves under; for auto links this is
    /// `encode(record_id)` once finalized
    pub path: String,

    pub path_kind: PathKind,

    /// Re-serialized absolute http(s) URL
    pub target_url: String,

    /// Email of the authenticated principal, or the supplied creator name
    pub creator: String,

    pub created_at: DateTime<Utc>,

    /// Chat the link is scoped to; `None` means global
    pub tenant_ref: Option<ChatRef>,

    #[serde(default)]
    pub enrichment: Option<MediaInfo>,
}

/// A validated link waiting to be persisted
///
/// An empty `path` asks the repository to derive one from the identifier.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub path: String,
    pub target_url: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub tenant_ref: Option<ChatRef>,
    pub enrichment: Option<MediaInfo>,
}

impl NewLink {
    pub fn path_kind(&self) -> PathKind {
        if self.path.is_empty() {
            PathKind::Auto
        } else {
            PathKind::Manual
        }
    }
}

/// A chat (tenant) record
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatRecord {
    /// Identifier of the chat on the messaging platform
    pub external_id: i64,

    /// Display name; empty until the chat registry names it
    #[serde(default)]
    pub name: String,

    pub internal_ref: ChatRef,

    pub created_at: DateTime<Utc>,
}

/// Fields of the index creation form
///
/// Read from the query string on `GET /` and from the urlencoded body on
/// `POST /`.
#[derive(Deserialize, Debug, Default)]
pub struct IndexForm {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    /// Raw `chatID` value; validated by the handler
    #[serde(default, rename = "chatID")]
    pub chat_id: Option<String>,

    /// Required only when the request carries no authenticated identity
    #[serde(default)]
    pub creator: Option<String>,
}

/// Query parameters accepted by path redirects
#[derive(Deserialize, Debug, Default)]
pub struct ResolveParams {
    #[serde(default, rename = "chatID")]
    pub chat_id: Option<String>,
}

/// View model handed to the index template
#[derive(Serialize, Debug)]
pub struct IndexView {
    pub host: String,
    pub path: String,
    pub target: String,
    pub message: Option<String>,
    pub created_url: Option<String>,
    pub past_links: Vec<LinkRecord>,
}

/// Request payload for `POST /api/links`
///
/// # Example
/// ```json
/// {
///   "target": "https://example.com/very/long/url",
///   "path": "my-link",
///   "chat_id": 123456,
///   "creator": "alice"
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct CreateRequest {
    pub target: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub chat_id: Option<i64>,

    #[serde(default)]
    pub creator: Option<String>,
}

/// Response returned after successfully creating a link
#[derive(Serialize, Debug)]
pub struct CreateResponse {
    pub path: String,
    pub short_url: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing recent links
#[derive(Deserialize, Debug)]
pub struct ListParams {
    /// Defaults to the configured recent limit, maximum is 100
    pub limit: Option<usize>,
}
