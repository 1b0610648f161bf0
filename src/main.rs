//! # Marko CLI (`marko`)
//!
//! Serves, seeds and inspects a directory of Markdown notes and its search
//! index.
//!
//! ## Usage
//!
//! ```bash
//! marko --config ./config/marko.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `marko serve` | Start the HTTP API (reconciles the index in the background) |
//! | `marko seed <count>` | Replace all notes with generated demo notes |
//! | `marko reindex` | Rebuild the search index from the note files |
//! | `marko search "<query>"` | Full-text search |
//! | `marko list` | List notes (id, title, updated date, tags) |
//! | `marko get <id>` | Print one note with its body |
//!
//! ## Examples
//!
//! ```bash
//! # Fill a fresh store with demo data
//! marko seed 50 --root ./data/notes
//!
//! # Phrase and prefix queries use SQLite FTS5 syntax
//! marko search '"memory safety" OR kube*'
//!
//! # Serve with debug logging
//! RUST_LOG=marko=debug marko serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marko::config::{self, Config};
use marko::{get, search, seed, server};

/// Marko: a file-backed note store with full-text search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/marko.example.toml` for every setting. A missing file
/// means defaults.
#[derive(Parser)]
#[command(name = "marko", version, about = "File-backed Markdown notes with full-text search")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/marko.toml")]
    config: PathBuf,

    /// Override `[store].root` from the config file.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind`. The search index is rebuilt from the note
    /// files in the background; requests are served immediately.
    Serve,

    /// Delete every note and write `count` demo notes.
    Seed {
        /// Number of notes to generate.
        count: usize,
    },

    /// Rebuild the search index from the note files.
    Reindex,

    /// Search notes.
    ///
    /// Supports FTS5 query syntax: `AND`, `OR`, `NOT`, `"phrases"`,
    /// `prefix*`, and column filters such as `title:rust`.
    Search {
        /// Query text.
        query: String,
    },

    /// List all notes.
    List,

    /// Print a note by id (with or without the `.md` extension).
    Get {
        /// Note id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg: Config = config::load_config_or_default(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.store.root = root;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.level)))
        .init();

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Seed { count } => {
            seed::run_seed(&cfg, count).await?;
        }
        Commands::Reindex => {
            search::run_reindex(&cfg).await?;
        }
        Commands::Search { query } => {
            search::run_search(&cfg, &query).await?;
        }
        Commands::List => {
            get::run_list(&cfg).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
    }

    Ok(())
}
