//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Shelf - markdown-first catalog of books, games, links, texts and films
#[derive(Parser, Debug)]
#[command(name = "shelf", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.shelf/data/shelf.db)
    #[arg(long, global = true, env = "SHELF_DB")]
    pub db: Option<PathBuf>,

    /// Catalog root holding <kind>/<slug>.md files (default: current directory)
    #[arg(long, global = true, env = "SHELF_ROOT")]
    pub root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Preview changes without writing files or the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and item tables for every content type
    Init,

    /// Print version information
    Version,

    /// Index changed markdown files into the database
    Sync(SyncArgs),

    /// Remove indexed items whose markdown files are gone
    Prune {
        /// Content type (default: all)
        kind: Option<String>,
    },

    /// List indexed items
    List(ListArgs),

    /// Show one item's markdown
    Get {
        /// Content type (book, game, link, text, film)
        kind: String,
        slug: String,
    },

    /// Create a new item file and index it
    Create(CreateArgs),

    /// Set a field on an item
    Set {
        kind: String,
        slug: String,
        field: String,

        /// One value, or several for a list field
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
    },

    /// Remove a field (or one value of a list field) from an item
    Unset {
        kind: String,
        slug: String,
        field: String,

        /// Only remove this value
        value: Option<String>,
    },

    /// Check markdown files against their schema
    Validate {
        /// Content type (default: all)
        kind: Option<String>,

        /// Only these slugs (requires a kind)
        slugs: Vec<String>,
    },

    /// Describe a content type's fields
    Fields {
        kind: String,
    },

    /// Show files changed since the last sync and indexed items without files
    Status {
        /// Content type (default: all)
        kind: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Content type (default: all)
    pub kind: Option<String>,

    /// Only these slugs (requires a kind)
    pub slugs: Vec<String>,

    /// Rewrite every indexed item, even if unchanged
    #[arg(long)]
    pub force: bool,

    /// Files read ahead in parallel (default: CPU count)
    #[arg(long, env = "SHELF_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Content type (book, game, link, text, film)
    pub kind: String,

    /// Case-insensitive text search over fields and notes
    #[arg(long, short)]
    pub search: Option<String>,

    /// Maximum number of items
    #[arg(long, short)]
    pub limit: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Content type (book, game, link, text, film)
    pub kind: String,

    /// File name without `.md`: lowercase letters, digits, `-` and `_`
    pub slug: String,

    pub title: String,

    /// Initial field values (repeatable): --set year=1965
    #[arg(long = "set", value_parser = parse_key_val)]
    pub fields: Vec<(String, String)>,
}

/// Parse a `key=value` pair.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
