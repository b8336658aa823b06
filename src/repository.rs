//! Link persistence
//!
//! Reads go through [`LinkRepository`] directly. Writes happen inside
//! [`LinkRepository::write`], which hands a [`LinkWriter`] to a closure and
//! commits the underlying redb transaction only if the closure succeeds.
//!
//! Creating a link is a two-step protocol on the writer:
//!
//! 1. [`LinkWriter::insert_incomplete`] stores the record and returns its
//!    identifier. Manual paths are indexed (and checked for uniqueness) here.
//! 2. [`LinkWriter::finalize_path`] makes an auto-path record readable under
//!    `encode(record_id)`. It is idempotent: running it again with the same
//!    arguments changes nothing.

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use std::sync::Arc;

use crate::chat;
use crate::database::{next_sequence, TABLE_AUTO_INDEX, TABLE_LINKS, TABLE_PATH_INDEX};
use crate::error::LinkError;
use crate::model::{scope_key, ChatRef, LinkRecord, NewLink, PathKind};

#[derive(Clone)]
pub struct LinkRepository {
    db: Arc<Database>,
}

impl LinkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Runs `f` inside a single write transaction.
    ///
    /// Nothing `f` writes is visible to anyone until it returns `Ok`; on
    /// `Err` the transaction is dropped and aborted.
    pub fn write<T, F>(&self, f: F) -> Result<T, LinkError>
    where
        F: FnOnce(&LinkWriter<'_>) -> Result<T, LinkError>,
    {
        let write_txn = self.db.begin_write()?;
        let out = f(&LinkWriter { txn: &write_txn })?;
        write_txn.commit()?;
        Ok(out)
    }

    pub fn get_by_id(&self, record_id: u64) -> Result<Option<LinkRecord>, LinkError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;

        let record = match table.get(record_id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Exact lookup of `path` within one scope.
    ///
    /// With a tenant only that chat's links match; without one only global
    /// links match.
    pub fn get_by_path(
        &self,
        path: &str,
        tenant: Option<ChatRef>,
    ) -> Result<Option<LinkRecord>, LinkError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_PATH_INDEX)?;

        let record_id = match index.get(path_key(path, tenant).as_str())? {
            Some(value) => value.value(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TABLE_LINKS)?;
        let record = match table.get(record_id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Number of links readable under `path` in the given scope (0 or 1).
    pub fn count_by_path(&self, path: &str, tenant: Option<ChatRef>) -> Result<u64, LinkError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_PATH_INDEX)?;
        let found = index.get(path_key(path, tenant).as_str())?.is_some();
        Ok(u64::from(found))
    }

    /// Most recent finalized links, newest first.
    ///
    /// Identifiers are allocated in increasing order, so walking the links
    /// table backwards yields creation order reversed.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<LinkRecord>, LinkError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;

        let mut links = Vec::with_capacity(limit.min(100));
        for entry in table.iter()?.rev() {
            if links.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            let record: LinkRecord = serde_json::from_str(value.value())?;
            if !record.path.is_empty() {
                links.push(record);
            }
        }

        Ok(links)
    }
}

/// Write access scoped to one open transaction.
pub struct LinkWriter<'txn> {
    txn: &'txn WriteTransaction,
}

impl LinkWriter<'_> {
    /// Persists `draft` and returns its identifier.
    ///
    /// A manual path is indexed right away and fails with
    /// [`LinkError::PathTaken`] when its scope already holds it. An auto
    /// draft (empty path) that repeats an earlier creation, meaning the same
    /// scope, creator and target, returns the earlier identifier and writes
    /// nothing, so a retried creation converges on one record.
    pub fn insert_incomplete(&self, draft: &NewLink) -> Result<u64, LinkError> {
        let idempotency_key = match draft.path_kind() {
            PathKind::Auto => {
                let key = auto_key(draft)?;
                let index = self.txn.open_table(TABLE_AUTO_INDEX)?;
                if let Some(existing) = index.get(key.as_str())? {
                    let record_id = existing.value();
                    tracing::debug!(record_id, "auto link already exists, reusing it");
                    return Ok(record_id);
                }
                Some(key)
            }
            PathKind::Manual => {
                let index = self.txn.open_table(TABLE_PATH_INDEX)?;
                if index.get(path_key(&draft.path, draft.tenant_ref).as_str())?.is_some() {
                    return Err(LinkError::PathTaken);
                }
                None
            }
        };

        let record_id = next_sequence(self.txn, "links")?;
        let record = LinkRecord {
            record_id,
            path: draft.path.clone(),
            path_kind: draft.path_kind(),
            target_url: draft.target_url.clone(),
            creator: draft.creator.clone(),
            created_at: draft.created_at,
            tenant_ref: draft.tenant_ref,
            enrichment: draft.enrichment.clone(),
        };
        self.put(&record)?;

        match idempotency_key {
            Some(key) => {
                let mut index = self.txn.open_table(TABLE_AUTO_INDEX)?;
                index.insert(key.as_str(), record_id)?;
            }
            None => {
                let mut index = self.txn.open_table(TABLE_PATH_INDEX)?;
                index.insert(path_key(&record.path, record.tenant_ref).as_str(), record_id)?;
            }
        }

        Ok(record_id)
    }

    /// Ensures record `record_id` is readable under `path` in its scope.
    ///
    /// Idempotent: a record that already carries `path` is returned as is.
    /// Fails with [`LinkError::PathTaken`] if another record holds `path`,
    /// and [`LinkError::NotFound`] if the record does not exist.
    pub fn finalize_path(&self, record_id: u64, path: &str) -> Result<LinkRecord, LinkError> {
        let mut record = self.get_by_id(record_id)?.ok_or(LinkError::NotFound)?;
        if record.path_kind == PathKind::Manual && record.path != path {
            return Err(LinkError::InvalidPath("manual paths cannot be reassigned"));
        }
        let key = path_key(path, record.tenant_ref);

        {
            let mut index = self.txn.open_table(TABLE_PATH_INDEX)?;
            let holder = index.get(key.as_str())?.map(|value| value.value());
            match holder {
                Some(holder) if holder != record_id => return Err(LinkError::PathTaken),
                Some(_) if record.path == path => return Ok(record),
                Some(_) => {}
                None => {
                    index.insert(key.as_str(), record_id)?;
                }
            }
        }

        if record.path != path {
            record.path = path.to_string();
            self.put(&record)?;
        }

        Ok(record)
    }

    pub fn get_by_id(&self, record_id: u64) -> Result<Option<LinkRecord>, LinkError> {
        let table = self.txn.open_table(TABLE_LINKS)?;
        let record = match table.get(record_id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Get-or-create of the chat with `external_id`, committed together
    /// with the rest of this transaction.
    pub fn resolve_chat(&self, external_id: i64) -> Result<ChatRef, LinkError> {
        Ok(chat::get_or_create(self.txn, external_id)?.internal_ref)
    }

    fn put(&self, record: &LinkRecord) -> Result<(), LinkError> {
        let record_json = serde_json::to_string(record)?;
        let mut table = self.txn.open_table(TABLE_LINKS)?;
        table.insert(record.record_id, record_json.as_str())?;
        Ok(())
    }
}

fn path_key(path: &str, tenant: Option<ChatRef>) -> String {
    format!("{}/{}", scope_key(tenant), path)
}

fn auto_key(draft: &NewLink) -> Result<String, LinkError> {
    Ok(serde_json::to_string(&(
        scope_key(draft.tenant_ref),
        &draft.creator,
        &draft.target_url,
    ))?)
}
