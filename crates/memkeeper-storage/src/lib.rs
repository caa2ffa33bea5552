//! Memory Keeper Storage - local persistence for the journaling app.
//!
//! This crate owns the durable state of Memory Keeper, using redb as the
//! embedded database. It is the sole writer of the persisted collections;
//! UI and voice components only call its public operations.
//!
//! # Collections
//!
//! - `memories` - journal entries, with date and category index tables
//! - `prompts` - the seeded writing-prompt catalog
//! - `settings` - small key-value process state
//! - `store_meta` - schema version for migrations
//!
//! # Consistency
//!
//! Every mutation is a single redb write transaction: it either commits
//! all fields of a record or nothing. redb serializes writers, so the
//! read-merge-write inside `MemoryStorage::update` cannot lose a
//! concurrent update's fields, and a read started after a commit observes
//! that commit (read-your-writes).

pub mod audio;
pub mod error;
pub mod memory;
pub mod paths;
pub mod prompt;
pub mod settings;
pub mod snapshot;
pub mod stats;

mod migrations;

use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use audio::{AudioDataError, decode_audio_data, encode_audio_data};
pub use error::{Result, StoreError};
pub use memory::{MemoryEntry, MemoryPatch, MemoryStorage, NewMemory};
pub use prompt::{Prompt, PromptStorage, default_catalog};
pub use settings::SettingStorage;
pub use snapshot::{ImportReport, Snapshot};
pub use stats::MemoryStats;

/// Central store that owns all collections.
///
/// Constructed once by the application's composition root and passed by
/// reference to consumers. Opening runs the schema migrations and seeds
/// the prompt catalog if it is empty, so a freshly opened store is ready
/// for every operation.
#[derive(Debug)]
pub struct Store {
    pub memories: MemoryStorage,
    pub prompts: PromptStorage,
    pub settings: SettingStorage,
}

impl Store {
    /// Open (or create) the store at the given database file path.
    ///
    /// Fails with `Unavailable` when the file cannot be created or opened;
    /// callers must treat that as fatal for offline durability rather than
    /// silently falling back.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|err| StoreError::Unavailable {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_db(Arc::new(db))
    }

    /// Open the store in the default data directory
    /// (`MEMKEEPER_DIR` env override, then `~/.memkeeper/`).
    pub fn open_default() -> Result<Self> {
        let dir = paths::ensure_data_dir()?;
        Self::open(paths::db_path(&dir))
    }

    fn from_db(db: Arc<Database>) -> Result<Self> {
        migrations::run(&db)?;

        let memories = MemoryStorage::new(db.clone())?;
        let prompts = PromptStorage::new(db.clone())?;
        let settings = SettingStorage::new(db.clone())?;

        prompts.seed_defaults()?;

        Ok(Self {
            memories,
            prompts,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_seeds_prompts_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");

        let catalog_len = default_catalog().len();
        {
            let store = Store::open(&path).unwrap();
            assert_eq!(store.prompts.count().unwrap(), catalog_len);
        }

        // Reopening does not reseed.
        let store = Store::open(&path).unwrap();
        assert_eq!(store.prompts.count().unwrap(), catalog_len);
    }

    #[test]
    fn open_on_unusable_path_reports_unavailable() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("missing-subdir").join("store.db");

        let err = Store::open(&bogus).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");

        let id = {
            let store = Store::open(&path).unwrap();
            store
                .memories
                .create(NewMemory {
                    prompt: "p".to_string(),
                    content: "durable".to_string(),
                    category: "A".to_string(),
                    word_count: 1,
                    has_audio: false,
                    audio_data: None,
                })
                .unwrap()
                .id
        };

        let store = Store::open(&path).unwrap();
        assert_eq!(store.memories.get(&id).unwrap().unwrap().content, "durable");
    }
}
