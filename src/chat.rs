//! Chat (tenant) records
//!
//! Chats are keyed by their external identifier, so get-or-create is an
//! upsert on a deterministic key. redb runs one write transaction at a time,
//! which means two callers racing on the first use of a chat cannot both
//! observe "absent" and create two records.

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use std::sync::Arc;

use crate::database::{next_sequence, TABLE_CHATS};
use crate::error::LinkError;
use crate::model::{ChatRecord, ChatRef};

#[derive(Clone)]
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Looks up a chat without creating it.
    pub fn find(&self, external_id: i64) -> Result<Option<ChatRecord>, LinkError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_CHATS)?;

        let chat = match table.get(external_id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(chat)
    }

    /// Returns the reference of the chat with `external_id`, creating the
    /// chat on first use.
    pub fn resolve(&self, external_id: i64) -> Result<ChatRef, LinkError> {
        let write_txn = self.db.begin_write()?;
        let chat = get_or_create(&write_txn, external_id)?;
        write_txn.commit()?;
        Ok(chat.internal_ref)
    }
}

/// Get-or-create inside a caller-owned write transaction.
pub(crate) fn get_or_create(
    txn: &WriteTransaction,
    external_id: i64,
) -> Result<ChatRecord, LinkError> {
    {
        let table = txn.open_table(TABLE_CHATS)?;
        let existing: Option<ChatRecord> = match table.get(external_id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        if let Some(chat) = existing {
            return Ok(chat);
        }
    }

    let chat = ChatRecord {
        external_id,
        name: String::new(),
        internal_ref: ChatRef(next_sequence(txn, "chats")?),
        created_at: Utc::now(),
    };
    let chat_json = serde_json::to_string(&chat)?;

    let mut table = txn.open_table(TABLE_CHATS)?;
    table.insert(external_id, chat_json.as_str())?;
    tracing::info!(external_id, internal_ref = chat.internal_ref.0, "created chat");

    Ok(chat)
}
