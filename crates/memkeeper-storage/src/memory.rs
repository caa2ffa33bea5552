//! Memory entry storage - CRUD for journal entries with date/category indexes.
//!
//! # Tables
//!
//! - `memories`: id -> entry JSON
//! - `memories_date_index`: rfc3339_date:id -> id (date-ordered scans)
//! - `memories_category_index`: category:id -> id (category filtering)

use chrono::{DateTime, SecondsFormat, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, StoreError};

pub(crate) const MEMORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memories");
/// Index: rfc3339_date:id -> id
pub(crate) const DATE_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("memories_date_index");
/// Index: category:id -> id
pub(crate) const CATEGORY_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("memories_category_index");

/// Content stored for audio-only entries saved with blank text.
const AUDIO_ONLY_PLACEHOLDER: &str = "Voice recording";

/// A saved answer to a journaling prompt.
///
/// `date` records when the entry was written and never changes;
/// `updated_at` is refreshed on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    pub prompt: String,
    pub content: String,
    pub category: String,
    pub word_count: u32,
    pub has_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new entry. The store assigns id and
/// timestamps; the caller is responsible for `word_count`.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub prompt: String,
    pub content: String,
    pub category: String,
    pub word_count: u32,
    pub has_audio: bool,
    pub audio_data: Option<String>,
}

/// Partial update for an existing entry. `None` fields are left untouched.
///
/// `audio_data` only sticks while `has_audio` ends up true; clearing the
/// audio flag also drops the payload.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub prompt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub word_count: Option<u32>,
    pub has_audio: Option<bool>,
    pub audio_data: Option<String>,
}

/// Memory entry storage.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    db: Arc<Database>,
}

impl MemoryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MEMORIES_TABLE)?;
        write_txn.open_table(DATE_INDEX_TABLE)?;
        write_txn.open_table(CATEGORY_INDEX_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Persist a new entry and return it with generated fields filled in.
    ///
    /// Blank content on an audio-bearing entry is replaced with a
    /// placeholder; an audio payload without the audio flag is dropped.
    pub fn create(&self, input: NewMemory) -> Result<MemoryEntry> {
        let now = Utc::now();
        let content = if input.content.trim().is_empty() && input.has_audio {
            AUDIO_ONLY_PLACEHOLDER.to_string()
        } else {
            input.content
        };
        let audio_data = if input.has_audio { input.audio_data } else { None };

        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            prompt: input.prompt,
            content,
            category: input.category,
            word_count: input.word_count,
            has_audio: input.has_audio,
            audio_data,
            date: now,
            created_at: now,
            updated_at: now,
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut memories = write_txn.open_table(MEMORIES_TABLE)?;
            memories.insert(entry.id.as_str(), encode(&entry)?.as_slice())?;

            let mut date_index = write_txn.open_table(DATE_INDEX_TABLE)?;
            let date_key = Self::date_key(&entry.date, &entry.id);
            date_index.insert(date_key.as_str(), entry.id.as_str())?;

            let mut category_index = write_txn.open_table(CATEGORY_INDEX_TABLE)?;
            let category_key = Self::category_key(&entry.category, &entry.id);
            category_index.insert(category_key.as_str(), entry.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::debug!(id = %entry.id, category = %entry.category, "created memory entry");
        Ok(entry)
    }

    /// Point lookup; `None` when the id does not exist.
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let memories = read_txn.open_table(MEMORIES_TABLE)?;
        memories.get(id)?.map(|v| decode(v.value())).transpose()
    }

    /// Strict lookup; fails with `NotFound` when the id does not exist.
    pub fn get_required(&self, id: &str) -> Result<MemoryEntry> {
        self.get(id)?.ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// All entries, most recent `date` first.
    pub fn list(&self) -> Result<Vec<MemoryEntry>> {
        self.list_page(0, None)
    }

    /// Date-descending page of entries via the date index.
    pub fn list_page(&self, skip: usize, limit: Option<usize>) -> Result<Vec<MemoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let date_index = read_txn.open_table(DATE_INDEX_TABLE)?;
        let memories = read_txn.open_table(MEMORIES_TABLE)?;

        let mut entries = Vec::new();
        for row in date_index.iter()?.rev().skip(skip) {
            if let Some(limit) = limit
                && entries.len() >= limit
            {
                break;
            }
            let (_key, id) = row?;
            if let Some(data) = memories.get(id.value())? {
                entries.push(decode(data.value())?);
            }
        }
        Ok(entries)
    }

    /// All entries bearing a category, in index order.
    pub fn list_by_category(&self, category: &str) -> Result<Vec<MemoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let category_index = read_txn.open_table(CATEGORY_INDEX_TABLE)?;
        let memories = read_txn.open_table(MEMORIES_TABLE)?;

        let prefix = format!("{}\0", category);
        let end = prefix_end(&prefix);

        let mut entries = Vec::new();
        for row in category_index.range(prefix.as_str()..end.as_str())? {
            let (_key, id) = row?;
            if let Some(data) = memories.get(id.value())? {
                entries.push(decode(data.value())?);
            }
        }
        Ok(entries)
    }

    /// Merge a patch into an existing entry and refresh `updated_at`.
    ///
    /// The read-merge-write happens inside a single write transaction, so
    /// concurrent updates to the same id are serialized by the engine and
    /// neither loses the other's untouched fields.
    pub fn update(&self, id: &str, patch: MemoryPatch) -> Result<MemoryEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut memories = write_txn.open_table(MEMORIES_TABLE)?;
            let existing = memories
                .get(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            let mut entry: MemoryEntry = decode(&existing)?;
            let old_category = entry.category.clone();

            if let Some(prompt) = patch.prompt {
                entry.prompt = prompt;
            }
            if let Some(content) = patch.content {
                entry.content = content;
            }
            if let Some(category) = patch.category {
                entry.category = category;
            }
            if let Some(word_count) = patch.word_count {
                entry.word_count = word_count;
            }
            if let Some(has_audio) = patch.has_audio {
                entry.has_audio = has_audio;
            }
            if let Some(audio_data) = patch.audio_data {
                entry.audio_data = Some(audio_data);
            }
            if !entry.has_audio {
                entry.audio_data = None;
            }
            entry.updated_at = Utc::now();

            memories.insert(id, encode(&entry)?.as_slice())?;

            if entry.category != old_category {
                let mut category_index = write_txn.open_table(CATEGORY_INDEX_TABLE)?;
                let old_key = Self::category_key(&old_category, id);
                let new_key = Self::category_key(&entry.category, id);
                category_index.remove(old_key.as_str())?;
                category_index.insert(new_key.as_str(), id)?;
            }

            entry
        };
        write_txn.commit()?;

        tracing::debug!(id = %entry.id, "updated memory entry");
        Ok(entry)
    }

    /// Remove an entry and its index rows. Deleting an absent id is a
    /// no-op success.
    pub fn delete(&self, id: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut memories = write_txn.open_table(MEMORIES_TABLE)?;
            let removed = memories.remove(id)?.map(|v| v.value().to_vec());

            if let Some(data) = removed {
                let entry: MemoryEntry = decode(&data)?;

                let mut date_index = write_txn.open_table(DATE_INDEX_TABLE)?;
                let date_key = Self::date_key(&entry.date, id);
                date_index.remove(date_key.as_str())?;

                let mut category_index = write_txn.open_table(CATEGORY_INDEX_TABLE)?;
                let category_key = Self::category_key(&entry.category, id);
                category_index.remove(category_key.as_str())?;

                tracing::debug!(id, "deleted memory entry");
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Insert-or-overwrite by id, keeping the indexes consistent.
    /// Returns true when the id was new.
    pub(crate) fn upsert(&self, entry: &MemoryEntry) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut memories = write_txn.open_table(MEMORIES_TABLE)?;
            let previous = memories
                .insert(entry.id.as_str(), encode(entry)?.as_slice())?
                .map(|v| v.value().to_vec());

            let mut date_index = write_txn.open_table(DATE_INDEX_TABLE)?;
            let mut category_index = write_txn.open_table(CATEGORY_INDEX_TABLE)?;

            if let Some(data) = &previous {
                let old: MemoryEntry = decode(data)?;
                date_index.remove(Self::date_key(&old.date, &old.id).as_str())?;
                category_index.remove(Self::category_key(&old.category, &old.id).as_str())?;
            }
            date_index.insert(
                Self::date_key(&entry.date, &entry.id).as_str(),
                entry.id.as_str(),
            )?;
            category_index.insert(
                Self::category_key(&entry.category, &entry.id).as_str(),
                entry.id.as_str(),
            )?;

            previous.is_none()
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let memories = read_txn.open_table(MEMORIES_TABLE)?;
        let mut count = 0;
        for row in memories.iter()? {
            row?;
            count += 1;
        }
        Ok(count)
    }

    /// Fixed-precision RFC 3339 key so lexicographic index order matches
    /// chronological order.
    fn date_key(date: &DateTime<Utc>, id: &str) -> String {
        format!("{}:{}", date.to_rfc3339_opts(SecondsFormat::Micros, true), id)
    }

    // NUL separator: categories are free-form user input, so any
    // printable separator could collide with a category name on prefix
    // scans. Ids are uuids and dates are RFC 3339, neither contains NUL.
    fn category_key(category: &str, id: &str) -> String {
        format!("{}\0{}", category, id)
    }
}

fn encode(entry: &MemoryEntry) -> Result<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|source| StoreError::Corrupt {
        table: "memories",
        source,
    })
}

fn decode(data: &[u8]) -> Result<MemoryEntry> {
    serde_json::from_slice(data).map_err(|source| StoreError::Corrupt {
        table: "memories",
        source,
    })
}

/// Exclusive end bound for a prefix range scan.
fn prefix_end(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }
    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}
