use anyhow::{Context, Result, bail};
use colored::Colorize;
use comfy_table::{Cell, Table};
use memkeeper_storage::{
    MemoryEntry, MemoryPatch, NewMemory, Prompt, Store, encode_audio_data, paths,
};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cli::Commands;

pub fn run(data_dir: Option<PathBuf>, command: Commands) -> Result<()> {
    let store = open_store(data_dir)?;

    match command {
        Commands::Prompt { all } => show_prompts(&store, all),
        Commands::Write {
            content,
            prompt_id,
            prompt,
            category,
            audio,
        } => write_entry(&store, content, prompt_id, prompt, category, audio),
        Commands::List {
            skip,
            limit,
            category,
        } => list_entries(&store, skip, limit, category),
        Commands::Show { id } => show_entry(&store, &id),
        Commands::Edit { id, content } => edit_entry(&store, &id, content),
        Commands::Delete { id } => delete_entry(&store, &id),
        Commands::Stats => show_stats(&store),
        Commands::Export { output } => export_snapshot(&store, output),
        Commands::Import { file } => import_snapshot(&store, &file),
        Commands::Setting { key, value } => setting(&store, &key, value),
    }
}

fn open_store(data_dir: Option<PathBuf>) -> Result<Store> {
    let store = match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("cannot create data directory {}", dir.display()))?;
            Store::open(paths::db_path(&dir))?
        }
        None => Store::open_default()?,
    };
    tracing::debug!("store opened");
    Ok(store)
}

fn show_prompts(store: &Store, all: bool) -> Result<()> {
    if all {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Category", "Prompt"]);
        for prompt in store.prompts.list()? {
            table.add_row(vec![
                Cell::new(prompt.id),
                Cell::new(&prompt.category),
                Cell::new(&prompt.prompt),
            ]);
        }
        println!("{table}");
        return Ok(());
    }

    match store.prompts.random()? {
        Some(prompt) => {
            println!("{}", format!("[{}]", prompt.category).cyan());
            println!("{}", prompt.prompt);
        }
        None => println!("The prompt catalog is empty."),
    }
    Ok(())
}

fn write_entry(
    store: &Store,
    content: Option<String>,
    prompt_id: Option<u32>,
    prompt_text: Option<String>,
    category: Option<String>,
    audio: Option<PathBuf>,
) -> Result<()> {
    let chosen: Option<Prompt> = match (prompt_text.as_deref(), prompt_id) {
        (Some(_), _) => None,
        (None, Some(id)) => {
            let prompt = store.prompts.list()?.into_iter().find(|p| p.id == id);
            match prompt {
                Some(p) => Some(p),
                None => bail!("no prompt with id {id} in the catalog"),
            }
        }
        (None, None) => store.prompts.random()?,
    };

    let prompt = prompt_text
        .or_else(|| chosen.as_ref().map(|p| p.prompt.clone()))
        .unwrap_or_default();
    let category = category
        .or_else(|| chosen.as_ref().map(|p| p.category.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    let audio_data = match &audio {
        Some(path) => Some(read_audio(path)?),
        None => None,
    };

    let content = match content {
        Some(text) => text,
        None if audio.is_some() => String::new(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read entry text from stdin")?;
            buffer.trim_end().to_string()
        }
    };

    if content.trim().is_empty() && audio.is_none() {
        bail!("nothing to save: provide entry text or --audio");
    }

    let entry = store.memories.create(NewMemory {
        prompt,
        word_count: word_count(&content),
        content,
        category,
        has_audio: audio.is_some(),
        audio_data,
    })?;

    println!(
        "{} {} ({} words)",
        "Saved".green(),
        entry.id,
        entry.word_count
    );
    Ok(())
}

fn list_entries(
    store: &Store,
    skip: usize,
    limit: Option<usize>,
    category: Option<String>,
) -> Result<()> {
    let entries = match category {
        Some(category) => {
            let mut entries = store.memories.list_by_category(&category)?;
            entries.sort_by(|a, b| b.date.cmp(&a.date));
            entries
                .into_iter()
                .skip(skip)
                .take(limit.unwrap_or(usize::MAX))
                .collect()
        }
        None => store.memories.list_page(skip, limit)?,
    };

    if entries.is_empty() {
        println!("No entries yet. Try `memkeeper prompt` to get started.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Category", "Words", "Audio", "Content"]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(entry.date.format("%Y-%m-%d %H:%M")),
            Cell::new(&entry.category),
            Cell::new(entry.word_count),
            Cell::new(if entry.has_audio { "yes" } else { "" }),
            Cell::new(preview(&entry.content)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn show_entry(store: &Store, id: &str) -> Result<()> {
    let entry = store.memories.get_required(id)?;
    print_entry(&entry);
    Ok(())
}

fn print_entry(entry: &MemoryEntry) {
    println!("{}  {}", entry.id.bold(), entry.date.format("%Y-%m-%d %H:%M"));
    println!("{}", format!("[{}]", entry.category).cyan());
    println!("{}", entry.prompt.italic());
    println!();
    println!("{}", entry.content);
    if entry.has_audio {
        println!();
        println!("{}", "(audio recording attached)".dimmed());
    }
}

fn edit_entry(store: &Store, id: &str, content: Option<String>) -> Result<()> {
    let content = match content {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read replacement text from stdin")?;
            buffer.trim_end().to_string()
        }
    };

    let updated = store.memories.update(
        id,
        MemoryPatch {
            word_count: Some(word_count(&content)),
            content: Some(content),
            ..Default::default()
        },
    )?;
    println!("{} {} ({} words)", "Updated".green(), updated.id, updated.word_count);
    Ok(())
}

fn delete_entry(store: &Store, id: &str) -> Result<()> {
    store.memories.delete(id)?;
    println!("{} {}", "Deleted".green(), id);
    Ok(())
}

fn show_stats(store: &Store) -> Result<()> {
    let stats = store.memories.stats()?;

    println!(
        "{} entries, {} words total, {} words on average",
        stats.total_entries, stats.total_words, stats.average_words
    );

    if !stats.category_counts.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Entries"]);
        for (category, count) in &stats.category_counts {
            table.add_row(vec![Cell::new(category), Cell::new(count)]);
        }
        println!("{table}");
    }

    if !stats.recent_entries.is_empty() {
        println!("{}", "Recent entries:".bold());
        for entry in &stats.recent_entries {
            println!(
                "  {}  {}  {}",
                entry.date.format("%Y-%m-%d"),
                entry.category,
                preview(&entry.content)
            );
        }
    }
    Ok(())
}

fn export_snapshot(store: &Store, output: Option<PathBuf>) -> Result<()> {
    let json = store.export_snapshot_json()?;
    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("cannot write snapshot to {}", path.display()))?;
            println!("{} snapshot to {}", "Exported".green(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn import_snapshot(store: &Store, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read snapshot {}", file.display()))?;
    let report = store.import_snapshot_json(&json)?;
    println!(
        "{} {} records ({} skipped)",
        "Imported".green(),
        report.imported,
        report.skipped
    );
    Ok(())
}

fn setting(store: &Store, key: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(raw) => {
            // Accept JSON; treat anything that does not parse as a string.
            let value: serde_json::Value = serde_json::from_str(&raw)
                .unwrap_or(serde_json::Value::String(raw));
            store.settings.set(key, &value)?;
            println!("{} {}", "Set".green(), key);
        }
        None => match store.settings.get::<serde_json::Value>(key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is unset"),
        },
    }
    Ok(())
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

fn preview(content: &str) -> String {
    const MAX_CHARS: usize = 48;
    let mut out: String = content.chars().take(MAX_CHARS).collect();
    if content.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}

fn read_audio(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read audio file {}", path.display()))?;
    let media_type = match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    };
    Ok(encode_audio_data(media_type, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(100);
        let short = preview(&long);
        assert!(short.chars().count() <= 49);
        assert!(short.ends_with('…'));
    }
}
