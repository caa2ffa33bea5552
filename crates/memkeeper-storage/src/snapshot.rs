//! Whole-store export and import.
//!
//! A snapshot is a single self-describing JSON document holding both the
//! memories and the prompt catalog, tagged with the schema version and a
//! generation timestamp. Import is a merge: every record is upserted by
//! id, nothing is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Store;
use crate::error::{Result, StoreError};
use crate::memory::MemoryEntry;
use crate::migrations::SCHEMA_VERSION;
use crate::prompt::Prompt;

/// The portable backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub memories: Vec<MemoryEntry>,
    pub prompts: Vec<Prompt>,
    pub export_date: DateTime<Utc>,
    pub version: u32,
}

/// Outcome of an import: how many records were upserted, how many
/// individually malformed records were skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Lenient document shape used during import. The document itself must
/// carry `memories` and `version`; individual records are validated one
/// by one so a single bad record cannot sink the whole restore.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    memories: Vec<serde_json::Value>,
    #[serde(default)]
    prompts: Vec<serde_json::Value>,
    version: u32,
}

impl Store {
    /// Copy both collections into a portable snapshot.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            memories: self.memories.list()?,
            prompts: self.prompts.list()?,
            export_date: Utc::now(),
            version: SCHEMA_VERSION,
        })
    }

    /// Export as a pretty-printed JSON document.
    pub fn export_snapshot_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export_snapshot()?).map_err(|source| {
            StoreError::Corrupt {
                table: "snapshot",
                source,
            }
        })
    }

    /// Merge an already-validated snapshot into the store.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        for entry in &snapshot.memories {
            self.upsert_imported(entry.clone())?;
            report.imported += 1;
        }
        for prompt in &snapshot.prompts {
            self.prompts.upsert(prompt)?;
            report.imported += 1;
        }
        Ok(report)
    }

    /// Parse and merge a snapshot document.
    ///
    /// A document that is not JSON or lacks `memories`/`version` is
    /// rejected as a whole with `MalformedSnapshot` before anything is
    /// written. Individually malformed records inside a well-formed
    /// document are skipped and counted.
    pub fn import_snapshot_json(&self, json: &str) -> Result<ImportReport> {
        let raw: RawSnapshot = serde_json::from_str(json)
            .map_err(|err| StoreError::MalformedSnapshot(err.to_string()))?;

        if raw.version != SCHEMA_VERSION {
            tracing::warn!(
                snapshot_version = raw.version,
                store_version = SCHEMA_VERSION,
                "importing snapshot from a different schema version"
            );
        }

        let mut report = ImportReport::default();
        for value in raw.memories {
            match serde_json::from_value::<MemoryEntry>(value) {
                Ok(entry) => {
                    self.upsert_imported(entry)?;
                    report.imported += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed memory record in snapshot");
                    report.skipped += 1;
                }
            }
        }
        for value in raw.prompts {
            match serde_json::from_value::<Prompt>(value) {
                Ok(prompt) => {
                    self.prompts.upsert(&prompt)?;
                    report.imported += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed prompt record in snapshot");
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            imported = report.imported,
            skipped = report.skipped,
            "imported snapshot"
        );
        Ok(report)
    }

    fn upsert_imported(&self, mut entry: MemoryEntry) -> Result<()> {
        // Re-assert the audio invariant on foreign records.
        if !entry.has_audio {
            entry.audio_data = None;
        }
        self.memories.upsert(&entry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryPatch, NewMemory};
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir, name: &str) -> Store {
        Store::open(dir.path().join(name)).unwrap()
    }

    fn entry(content: &str, category: &str) -> NewMemory {
        NewMemory {
            prompt: "p".to_string(),
            content: content.to_string(),
            category: category.to_string(),
            word_count: content.split_whitespace().count() as u32,
            has_audio: false,
            audio_data: None,
        }
    }

    #[test]
    fn export_import_round_trips() {
        let dir = tempdir().unwrap();
        let source = open_store(&dir, "source.db");
        source.memories.create(entry("first memory", "A")).unwrap();
        source.memories.create(entry("second memory", "B")).unwrap();

        let json = source.export_snapshot_json().unwrap();

        let target = open_store(&dir, "target.db");
        let report = target.import_snapshot_json(&json).unwrap();
        assert_eq!(report.skipped, 0);

        let mut original = source.memories.list().unwrap();
        let mut restored = target.memories.list().unwrap();
        original.sort_by(|a, b| a.id.cmp(&b.id));
        restored.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(original, restored);
    }

    #[test]
    fn import_merges_without_deleting() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, "store.db");

        let known = store.memories.create(entry("known", "A")).unwrap();
        let untouched = store.memories.create(entry("untouched", "B")).unwrap();

        let mut snapshot = store.export_snapshot().unwrap();
        // Keep only the known record, modified, plus one brand new one.
        snapshot.memories.retain(|e| e.id == known.id);
        snapshot.memories[0].content = "known, revised".to_string();
        let mut incoming = known.clone();
        incoming.id = "imported-new".to_string();
        incoming.content = "brand new".to_string();
        snapshot.memories.push(incoming);

        store.import_snapshot(&snapshot).unwrap();

        let entries = store.memories.list().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            store.memories.get(&known.id).unwrap().unwrap().content,
            "known, revised"
        );
        assert_eq!(
            store.memories.get("imported-new").unwrap().unwrap().content,
            "brand new"
        );
        assert!(store.memories.get(&untouched.id).unwrap().is_some());
    }

    #[test]
    fn malformed_document_is_rejected_atomically() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, "store.db");
        store.memories.create(entry("existing", "A")).unwrap();

        let err = store.import_snapshot_json("not json at all").unwrap_err();
        assert!(matches!(err, StoreError::MalformedSnapshot(_)));

        // Missing `memories` counts as malformed too.
        let err = store
            .import_snapshot_json(r#"{"prompts": [], "version": 1}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedSnapshot(_)));

        assert_eq!(store.memories.list().unwrap().len(), 1);
    }

    #[test]
    fn malformed_records_are_skipped_and_counted() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, "store.db");
        let good = store.export_snapshot().unwrap();

        let mut doc = serde_json::to_value(&good).unwrap();
        doc["memories"] = serde_json::json!([
            {"id": "only-an-id"},
            serde_json::to_value(MemoryEntry {
                id: "valid".to_string(),
                prompt: "p".to_string(),
                content: "c".to_string(),
                category: "A".to_string(),
                word_count: 1,
                has_audio: false,
                audio_data: None,
                date: Utc::now(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap(),
        ]);

        let report = store.import_snapshot_json(&doc.to_string()).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(store.memories.get("valid").unwrap().is_some());
        assert!(store.memories.get("only-an-id").unwrap().is_none());
    }

    #[test]
    fn import_preserves_updated_record_in_place() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, "store.db");
        let created = store.memories.create(entry("v1", "A")).unwrap();
        store
            .memories
            .update(
                &created.id,
                MemoryPatch {
                    content: Some("v2".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let snapshot = store.export_snapshot().unwrap();
        let report = store.import_snapshot(&snapshot).unwrap();
        assert!(report.imported > 0);

        // Re-importing our own snapshot changes nothing observable.
        assert_eq!(
            store.memories.get(&created.id).unwrap().unwrap().content,
            "v2"
        );
        assert_eq!(store.memories.list().unwrap().len(), 1);
    }
}
