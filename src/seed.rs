//! Demo data generator behind `marko seed <count>`.
//!
//! Clears the store and writes `count` notes with a front-matter header,
//! cycling through fixed topics, categories and authors so repeated runs
//! produce the same ids and titles. Each note is indexed right after it is
//! written when the index is available.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::index::SearchIndex;
use crate::store::NoteStore;

const TOPICS: &[&str] = &[
    "Go Concurrency Patterns",
    "React Server Components",
    "Docker Optimization",
    "Postgres Indexing",
    "Microservices Architecture",
    "Kubernetes Deployment",
    "Redis Caching Strategies",
    "GraphQL Schema Design",
    "Typescript Generics",
    "Linux Kernel Tuning",
    "AWS Lambda Functions",
    "Next.js App Router",
    "Rust Memory Safety",
    "Distributed Systems 101",
    "Git Workflow",
];

const CATEGORIES: &[&str] = &[
    "Tutorial",
    "Snippet",
    "Debug Log",
    "Meeting Notes",
    "Draft",
    "Reference",
];

const AUTHORS: &[&str] = &["Alice", "Bob", "Charlie", "Dave", "Eve"];

/// One generated note: its id and raw file content.
#[derive(Debug, Clone)]
pub struct SeedNote {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Build the `i`-th demo note. The first `TOPICS.len()` notes get a bare
/// topic as title so every topic appears at least once.
pub fn seed_note(i: usize) -> SeedNote {
    let topic = TOPICS[i % TOPICS.len()];
    let category = CATEGORIES[(i / TOPICS.len() + i) % CATEGORIES.len()];
    let author = AUTHORS[(i * 3) % AUTHORS.len()];

    let title = if i < TOPICS.len() {
        topic.to_string()
    } else {
        format!("{} - {}", topic, category)
    };

    let content = format!(
        "---\ntitle: {title}\nauthor: {author}\ntags: [tech, {category}]\n---\n\n\
         # {title}\n\n\
         ## Overview\n\nThis is a note regarding **{topic}**. It is crucial for understanding the current stack.\n\n\
         ## Code Snippet\n\n```rust\nfn main() {{\n    println!(\"Hello World\");\n}}\n```\n\n\
         ## Key Takeaways\n\n\
         - Importance of clean code\n\
         - Performance matters\n\
         - Scalability is key\n\n\
         > Created by {author} at {created}\n",
        created = Utc::now().to_rfc3339(),
    );

    SeedNote {
        id: format!("seed-note-{i}"),
        title,
        content,
    }
}

/// Replace the store's contents with `count` demo notes.
///
/// Existing notes are deleted first (and removed from `index`). A note that
/// fails to save or index is logged and skipped. Returns the number of
/// notes written.
pub async fn seed_notes(store: &NoteStore, index: Option<&SearchIndex>, count: usize) -> Result<usize> {
    let existing = store.list().await?;
    info!(count = existing.len(), "clearing existing notes");
    for note in existing {
        if let Err(e) = store.delete(&note.id).await {
            warn!(id = %note.id, error = %e, "failed to delete note");
        }
        if let Some(index) = index {
            if let Err(e) = index.delete(&note.id).await {
                warn!(id = %note.id, error = %e, "failed to remove note from index");
            }
        }
    }

    let mut written = 0;
    for i in 0..count {
        let seed = seed_note(i);
        let id = match store.save(&seed.id, &seed.content).await {
            Ok(id) => id,
            Err(e) => {
                warn!(id = %seed.id, error = %e, "failed to save seed note");
                continue;
            }
        };
        written += 1;

        if let Some(index) = index {
            let indexed = match store.get(&id).await {
                Ok(note) => index.index(&note).await,
                Err(e) => Err(e),
            };
            if let Err(e) = indexed {
                warn!(id = %id, error = %e, "failed to index seed note");
            }
        }
    }

    Ok(written)
}

/// CLI entry point for `marko seed <count>`.
pub async fn run_seed(config: &Config, count: usize) -> Result<()> {
    let store = NoteStore::new(&config.store.root);
    let index = match SearchIndex::open(store.root()).await {
        Ok(index) => Some(index),
        Err(e) => {
            eprintln!("Warning: {e}; notes will be indexed on next server start");
            None
        }
    };

    println!("Seeding {} note(s) into {}...", count, store.root().display());
    let written = seed_notes(&store, index.as_ref(), count).await;
    if let Some(index) = index {
        index.close().await;
    }
    println!("Seeding complete: {} note(s) written.", written?);

    Ok(())
}
