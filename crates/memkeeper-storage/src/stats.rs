//! Aggregate statistics over the memory collection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::memory::{MemoryEntry, MemoryStorage};

const RECENT_ENTRY_COUNT: usize = 5;

/// Bucket for entries with a missing or empty category.
const UNKNOWN_CATEGORY: &str = "Unknown";

/// Aggregate view of the memory collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_entries: usize,
    pub total_words: u64,
    /// Mean word count rounded to the nearest integer; 0 for an empty store.
    pub average_words: u64,
    pub category_counts: BTreeMap<String, usize>,
    /// The five most recent entries, newest first.
    pub recent_entries: Vec<MemoryEntry>,
}

impl MemoryStorage {
    /// Compute statistics from the current contents in one pass.
    pub fn stats(&self) -> Result<MemoryStats> {
        let entries = self.list()?;

        let total_entries = entries.len();
        let total_words: u64 = entries.iter().map(|e| u64::from(e.word_count)).sum();
        let average_words = if total_entries == 0 {
            0
        } else {
            (total_words + total_entries as u64 / 2) / total_entries as u64
        };

        let mut category_counts = BTreeMap::new();
        for entry in &entries {
            let category = if entry.category.trim().is_empty() {
                UNKNOWN_CATEGORY
            } else {
                entry.category.as_str()
            };
            *category_counts.entry(category.to_string()).or_insert(0) += 1;
        }

        let recent_entries = entries.into_iter().take(RECENT_ENTRY_COUNT).collect();

        Ok(MemoryStats {
            total_entries,
            total_words,
            average_words,
            category_counts,
            recent_entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NewMemory;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (MemoryStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::create(dir.path().join("test.db")).unwrap());
        (MemoryStorage::new(db).unwrap(), dir)
    }

    fn entry(word_count: u32, category: &str) -> NewMemory {
        NewMemory {
            prompt: "p".to_string(),
            content: "c".to_string(),
            category: category.to_string(),
            word_count,
            has_audio: false,
            audio_data: None,
        }
    }

    #[test]
    fn totals_average_and_categories() {
        let (storage, _dir) = setup();
        storage.create(entry(10, "A")).unwrap();
        storage.create(entry(20, "A")).unwrap();
        storage.create(entry(30, "B")).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_words, 60);
        assert_eq!(stats.average_words, 20);
        assert_eq!(stats.category_counts.get("A"), Some(&2));
        assert_eq!(stats.category_counts.get("B"), Some(&1));
    }

    #[test]
    fn average_rounds_to_nearest() {
        let (storage, _dir) = setup();
        storage.create(entry(10, "A")).unwrap();
        storage.create(entry(11, "A")).unwrap();

        // 21 / 2 = 10.5 rounds to 11.
        assert_eq!(storage.stats().unwrap().average_words, 11);
    }

    #[test]
    fn empty_store_has_zero_average() {
        let (storage, _dir) = setup();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_words, 0);
        assert_eq!(stats.average_words, 0);
        assert!(stats.category_counts.is_empty());
        assert!(stats.recent_entries.is_empty());
    }

    #[test]
    fn blank_category_lands_in_unknown_bucket() {
        let (storage, _dir) = setup();
        storage.create(entry(5, "")).unwrap();
        storage.create(entry(5, "  ")).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.category_counts.get("Unknown"), Some(&2));
    }

    #[test]
    fn recent_entries_are_the_newest_five() {
        let (storage, _dir) = setup();
        for i in 0..7 {
            storage.create(entry(i, "A")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let stats = storage.stats().unwrap();
        assert_eq!(stats.recent_entries.len(), 5);
        assert_eq!(stats.recent_entries[0].word_count, 6);
        assert_eq!(stats.recent_entries[4].word_count, 2);
    }
}
