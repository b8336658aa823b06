//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database and the
//! application state shared by all handlers.

use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;

use crate::chat::ChatRepository;
use crate::config::AppConfig;
use crate::enrichment::Enricher;
use crate::repository::LinkRepository;

/// Link records keyed by their store-assigned identifier
///
/// Key: record_id (ascending order is creation order)
/// Value: JSON-serialized LinkRecord
pub const TABLE_LINKS: TableDefinition<u64, &str> = TableDefinition::new("links_v1");

/// Lookup of finalized paths
///
/// Key: "{scope}/{path}", where scope is "global" or "chat-{internal_ref}".
/// Paths never contain '/', so the first '/' always ends the scope.
/// Value: record_id
pub const TABLE_PATH_INDEX: TableDefinition<&str, u64> = TableDefinition::new("path_index_v1");

/// Idempotency keys of auto-path creations
///
/// Key: JSON array `[scope, creator, target_url]`
/// Value: record_id of the link that creation produced
pub const TABLE_AUTO_INDEX: TableDefinition<&str, u64> = TableDefinition::new("auto_index_v1");

/// Chat records keyed by their external (messaging platform) identifier
pub const TABLE_CHATS: TableDefinition<i64, &str> = TableDefinition::new("chats_v1");

/// Monotonic counters ("links", "chats")
pub const TABLE_SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub links: LinkRepository,
    pub chats: ChatRepository,
    pub enricher: Enricher,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let db = Arc::new(db);
        let enricher = Enricher::new(config.enrichment_url.as_deref(), config.enrichment_timeout);

        Self {
            links: LinkRepository::new(db.clone()),
            chats: ChatRepository::new(db),
            config: Arc::new(config),
            enricher,
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Example
///
/// ```no_run
/// # use chatlink::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_PATH_INDEX)?;
        write_txn.open_table(TABLE_AUTO_INDEX)?;
        write_txn.open_table(TABLE_CHATS)?;
        write_txn.open_table(TABLE_SEQUENCES)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Allocates the next value of a named counter inside `txn`.
///
/// Counters start at 1. The increment commits or aborts with the rest of
/// the transaction.
pub(crate) fn next_sequence(
    txn: &redb::WriteTransaction,
    name: &str,
) -> Result<u64, crate::error::LinkError> {
    let mut table = txn.open_table(TABLE_SEQUENCES)?;
    let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(name, next)?;
    Ok(next)
}
