//! Prompt storage - the seeded catalog of writing prompts.
//!
//! Prompts are immutable once seeded; the store only inserts or
//! overwrites by id, so seeding and snapshot import stay idempotent.

use rand::RngExt;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, StoreError};

pub(crate) const PROMPTS_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("prompts");

/// A reusable question offered to elicit an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: u32,
    pub category: String,
    pub prompt: String,
}

const DEFAULT_PROMPTS: &[(u32, &str, &str)] = &[
    (1, "Family", "Tell me about your wedding day. What do you remember most about that special day?"),
    (2, "Childhood", "What was your favorite thing to do as a child?"),
    (3, "Family", "Tell me about your children when they were little."),
    (4, "Work", "What kind of work did you do? What was a typical day like for you?"),
    (5, "Home", "Describe the house you grew up in. What was your favorite room?"),
    (6, "Friends", "Tell me about your best friend. How did you two meet?"),
    (7, "Holidays", "What was your favorite holiday? How did your family celebrate it?"),
    (8, "Travel", "Tell me about a place you visited that you'll never forget."),
    (9, "School", "What do you remember about your school days? Who was your favorite teacher?"),
    (10, "Hobbies", "What did you like to do in your free time? What made you happy?"),
    (11, "Family", "Tell me about your parents. What were they like?"),
    (12, "Pets", "Did you have any pets? Tell me about them."),
    (13, "Food", "What was your favorite meal? Who used to cook it for you?"),
    (14, "Music", "What songs do you remember from when you were young?"),
    (15, "Weather", "Tell me about the worst winter storm you remember. How did you get through it?"),
    (16, "Community", "Tell me about your neighborhood. Who were your neighbors?"),
    (17, "Sports", "Did you play any sports or watch games? Tell me about that."),
    (18, "Traditions", "What family traditions did you celebrate growing up?"),
];

/// The built-in prompt catalog used to seed an empty store.
pub fn default_catalog() -> Vec<Prompt> {
    DEFAULT_PROMPTS
        .iter()
        .map(|(id, category, prompt)| Prompt {
            id: *id,
            category: (*category).to_string(),
            prompt: (*prompt).to_string(),
        })
        .collect()
}

/// Prompt catalog storage.
#[derive(Debug, Clone)]
pub struct PromptStorage {
    db: Arc<Database>,
}

impl PromptStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PROMPTS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Seed the default catalog if the table is empty. Upserts by id, so a
    /// racing second call cannot produce duplicates. Returns the number of
    /// prompts written.
    pub fn seed_defaults(&self) -> Result<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }

        let catalog = default_catalog();
        let write_txn = self.db.begin_write()?;
        {
            let mut prompts = write_txn.open_table(PROMPTS_TABLE)?;
            for prompt in &catalog {
                prompts.insert(prompt.id, encode(prompt)?.as_slice())?;
            }
        }
        write_txn.commit()?;

        tracing::info!(count = catalog.len(), "seeded default prompt catalog");
        Ok(catalog.len())
    }

    /// Insert-or-overwrite a single prompt by id.
    pub(crate) fn upsert(&self, prompt: &Prompt) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut prompts = write_txn.open_table(PROMPTS_TABLE)?;
            prompts.insert(prompt.id, encode(prompt)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All prompts in id order.
    pub fn list(&self) -> Result<Vec<Prompt>> {
        let read_txn = self.db.begin_read()?;
        let prompts = read_txn.open_table(PROMPTS_TABLE)?;

        let mut items = Vec::new();
        for row in prompts.iter()? {
            let (_, value) = row?;
            items.push(decode(value.value())?);
        }
        Ok(items)
    }

    /// Uniform random pick; `None` only when the catalog is empty.
    pub fn random(&self) -> Result<Option<Prompt>> {
        let prompts = self.list()?;
        if prompts.is_empty() {
            return Ok(None);
        }
        let index = rand::rng().random_range(0..prompts.len());
        Ok(Some(prompts[index].clone()))
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let prompts = read_txn.open_table(PROMPTS_TABLE)?;
        let mut count = 0;
        for row in prompts.iter()? {
            row?;
            count += 1;
        }
        Ok(count)
    }
}

fn encode(prompt: &Prompt) -> Result<Vec<u8>> {
    serde_json::to_vec(prompt).map_err(|source| StoreError::Corrupt {
        table: "prompts",
        source,
    })
}

fn decode(data: &[u8]) -> Result<Prompt> {
    serde_json::from_slice(data).map_err(|source| StoreError::Corrupt {
        table: "prompts",
        source,
    })
}
