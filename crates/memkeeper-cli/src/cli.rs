use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "memkeeper",
    about = "Offline journal: answer a prompt, keep the memory",
    version
)]
pub struct Cli {
    /// Data directory (defaults to ~/.memkeeper)
    #[arg(long, global = true, env = "MEMKEEPER_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a random writing prompt
    Prompt {
        /// List the whole prompt catalog instead
        #[arg(long)]
        all: bool,
    },
    /// Save a new memory entry
    Write {
        /// Entry text; read from stdin when omitted
        content: Option<String>,
        /// Answer a specific prompt from the catalog
        #[arg(long)]
        prompt_id: Option<u32>,
        /// Free-form prompt text (overrides --prompt-id)
        #[arg(long)]
        prompt: Option<String>,
        /// Category label; defaults to the prompt's category
        #[arg(long)]
        category: Option<String>,
        /// Attach an audio file, stored base64-encoded
        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// List saved entries, newest first
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
        /// Only entries in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one entry in full
    Show { id: String },
    /// Edit the text of an entry
    Edit {
        id: String,
        /// Replacement text; read from stdin when omitted
        content: Option<String>,
    },
    /// Delete an entry
    Delete { id: String },
    /// Aggregate statistics over all entries
    Stats,
    /// Export everything as a JSON snapshot
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Merge a JSON snapshot into the store
    Import { file: PathBuf },
    /// Read or write a setting
    Setting {
        key: String,
        /// New value (JSON); omit to read
        value: Option<String>,
    },
}
