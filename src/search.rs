//! `marko search` and `marko reindex`: the search index from the command line.
//!
//! Both commands open the index file under the store root directly. They
//! can run while a server is up; SQLite's WAL mode lets them share the file.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::index::SearchIndex;
use crate::store::NoteStore;
use crate::sync;

/// CLI entry point for `marko search <query>`.
///
/// Prints ranked hits with their highlighted excerpts. The index may lag
/// behind the store if a server is applying updates concurrently.
pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    let store = NoteStore::new(&config.store.root);
    let index = SearchIndex::open(store.root()).await?;

    let hits = index.search(query).await;
    index.close().await;
    let hits = hits?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.2}] {}", i + 1, hit.score, hit.title);
        println!("    excerpt: \"{}\"", hit.excerpt.replace('\n', " ").trim());
        println!("    id: {}", hit.id);
        println!();
    }

    Ok(())
}

/// CLI entry point for `marko reindex`: rebuild the index from the store
/// and wait for it to finish.
pub async fn run_reindex(config: &Config) -> Result<()> {
    let store = NoteStore::new(&config.store.root);
    let index = SearchIndex::open(store.root()).await?;

    let count = sync::reconcile(&store, &index)
        .await
        .context("reindex failed");
    index.close().await;

    println!("Indexed {} note(s) from {}", count?, store.root().display());
    Ok(())
}
