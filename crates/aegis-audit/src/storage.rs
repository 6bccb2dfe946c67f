//! # Persistent Audit Storage
//!
//! Sled-backed append-only log of [`AuditEntry`] records, keyed by a
//! monotonic counter so iteration replays entries in the order they were
//! recorded. Durable storage is optional - an in-memory [`AuditStore`]
//! serves sessions that only need the in-process ring buffer.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::models::AuditEntry;

const ENTRY_TREE: &str = "entries";

/// Wrapper around a Sled database for durable audit persistence.
pub struct AuditStore {
    db: sled::Db,
    entries: sled::Tree,
    next_id: AtomicU64,
}

impl AuditStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store, lost when dropped. Used for sessions that don't
    /// need entries to survive a restart.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let entries = db.open_tree(ENTRY_TREE)?;
        let next_id = entries.iter().keys().last().transpose()?.map(|k| decode_key(&k) + 1).unwrap_or(0);
        Ok(Self { db, entries, next_id: AtomicU64::new(next_id) })
    }

    /// Appends `entry`, returning its assigned sequence number.
    pub fn append(&self, entry: &AuditEntry) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let bytes = serde_json::to_vec(entry)?;
        self.entries.insert(encode_key(id), bytes)?;
        Ok(id)
    }

    /// Replays every stored entry in append order.
    pub fn replay(&self) -> Result<Vec<AuditEntry>> {
        let mut out = Vec::new();
        for item in self.entries.iter() {
            let (_, bytes) = item?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore").field("entry_count", &self.len()).finish()
    }
}

fn encode_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_key(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;

    #[test]
    fn append_and_replay_preserves_order() {
        let store = AuditStore::temporary().unwrap();
        store.append(&AuditEntry::new("first", Decision::Info)).unwrap();
        store.append(&AuditEntry::new("second", Decision::Blocked)).unwrap();
        let replayed = store.replay().unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].event, "first");
        assert_eq!(replayed[1].event, "second");
    }

    #[test]
    fn temporary_store_starts_empty() {
        let store = AuditStore::temporary().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn next_id_resumes_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = AuditStore::open(dir.path()).unwrap();
            store.append(&AuditEntry::new("a", Decision::Info)).unwrap();
            store.flush().unwrap();
        }
        let store = AuditStore::open(dir.path()).unwrap();
        let id = store.append(&AuditEntry::new("b", Decision::Info)).unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.replay().unwrap().len(), 2);
    }
}
