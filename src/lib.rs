//! # Marko
//!
//! A file-backed note store with an eventually consistent full-text search
//! index.
//!
//! Notes are plain Markdown files (`<id>.md`) with an optional front-matter
//! header. The files are the source of truth; an SQLite FTS5 database
//! (`index.db`) next to them is a derived copy kept up to date by
//! background workers and rebuilt on startup.
//!
//! ## Architecture
//!
//! ```text
//!               ┌──────────┐
//!  HTTP / CLI ─▶│  store   │──▶ <root>/*.md      (authoritative)
//!               └────┬─────┘
//!                    │ note_saved / note_deleted
//!                    ▼
//!               ┌──────────┐    ┌──────────┐
//!               │   sync   │──▶│  index   │──▶ <root>/index.db (lagging)
//!               │ workers  │    └──────────┘
//!               └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy shared by store, index and server |
//! | [`models`] | Note, header and search hit types |
//! | [`parser`] | Front-matter header parsing |
//! | [`store`] | File-backed note store with a reader/writer lock |
//! | [`index`] | FTS5 search index |
//! | [`sync`] | Startup reconciliation and background index workers |
//! | [`server`] | HTTP API |
//! | [`seed`] | Demo data generator |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`get`], [`search`] | CLI commands |

pub mod config;
pub mod db;
pub mod error;
pub mod get;
pub mod index;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod search;
pub mod seed;
pub mod server;
pub mod store;
pub mod sync;
