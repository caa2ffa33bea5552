//! Versioned schema migrations, run once while opening the store.
//!
//! Each step is idempotent, so a crash between applying a step and
//! recording the new version is repaired on the next open. The whole run
//! happens in a single write transaction.

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use crate::error::Result;
use crate::{memory, prompt, settings};

const META_TABLE: TableDefinition<&str, u32> = TableDefinition::new("store_meta");
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Current schema version. Also tags exported snapshots.
pub const SCHEMA_VERSION: u32 = 1;

struct Migration {
    version: u32,
    name: &'static str,
    apply: fn(&WriteTransaction) -> Result<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create collections",
    apply: create_collections,
}];

fn create_collections(txn: &WriteTransaction) -> Result<()> {
    txn.open_table(memory::MEMORIES_TABLE)?;
    txn.open_table(memory::DATE_INDEX_TABLE)?;
    txn.open_table(memory::CATEGORY_INDEX_TABLE)?;
    txn.open_table(prompt::PROMPTS_TABLE)?;
    txn.open_table(settings::SETTINGS_TABLE)?;
    Ok(())
}

/// Bring the database up to [`SCHEMA_VERSION`].
pub fn run(db: &Database) -> Result<()> {
    let txn = db.begin_write()?;

    let current = {
        let table = txn.open_table(META_TABLE)?;
        table.get(SCHEMA_VERSION_KEY)?.map(|v| v.value()).unwrap_or(0)
    };

    for migration in MIGRATIONS {
        if migration.version > current {
            (migration.apply)(&txn)?;
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "applied schema migration"
            );
        }
    }

    if current != SCHEMA_VERSION {
        let mut table = txn.open_table(META_TABLE)?;
        table.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
    }

    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::ReadableDatabase;
    use tempfile::tempdir;

    #[test]
    fn run_is_idempotent_and_records_version() {
        let dir = tempdir().unwrap();
        let db = Database::create(dir.path().join("test.db")).unwrap();

        run(&db).unwrap();
        run(&db).unwrap();

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(META_TABLE).unwrap();
        let version = table.get(SCHEMA_VERSION_KEY).unwrap().unwrap().value();
        assert_eq!(version, SCHEMA_VERSION);

        // All collections exist after migration.
        txn.open_table(memory::MEMORIES_TABLE).unwrap();
        txn.open_table(prompt::PROMPTS_TABLE).unwrap();
        txn.open_table(settings::SETTINGS_TABLE).unwrap();
    }
}
