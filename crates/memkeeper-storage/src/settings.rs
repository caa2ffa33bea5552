//! Settings storage - small key-value table for process state that must
//! survive a restart. Last write wins.

use redb::{Database, ReadableDatabase, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{Result, StoreError};

pub(crate) const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

/// Key-value settings storage.
#[derive(Debug, Clone)]
pub struct SettingStorage {
    db: Arc<Database>,
}

impl SettingStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SETTINGS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Overwrite the value stored under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value).map_err(|source| StoreError::Corrupt {
            table: "settings",
            source,
        })?;

        let write_txn = self.db.begin_write()?;
        {
            let mut settings = write_txn.open_table(SETTINGS_TABLE)?;
            settings.insert(key, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read the value stored under `key`; `None` when unset.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let settings = read_txn.open_table(SETTINGS_TABLE)?;

        settings
            .get(key)?
            .map(|data| {
                serde_json::from_slice(data.value()).map_err(|source| StoreError::Corrupt {
                    table: "settings",
                    source,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (SettingStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::create(dir.path().join("test.db")).unwrap());
        (SettingStorage::new(db).unwrap(), dir)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (storage, _dir) = setup();

        storage.set("reminder_hour", &21u32).unwrap();
        assert_eq!(storage.get::<u32>("reminder_hour").unwrap(), Some(21));
    }

    #[test]
    fn last_write_wins() {
        let (storage, _dir) = setup();

        storage.set("theme", &"light").unwrap();
        storage.set("theme", &"dark").unwrap();
        assert_eq!(
            storage.get::<String>("theme").unwrap(),
            Some("dark".to_string())
        );
    }

    #[test]
    fn missing_key_is_none() {
        let (storage, _dir) = setup();
        assert_eq!(storage.get::<String>("missing").unwrap(), None);
    }
}
