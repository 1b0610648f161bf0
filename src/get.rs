//! `marko get` and `marko list`: print notes straight from the store.

use anyhow::Result;

use crate::config::Config;
use crate::store::NoteStore;

/// CLI entry point for `marko list`.
pub async fn run_list(config: &Config) -> Result<()> {
    let store = NoteStore::new(&config.store.root);
    let notes = store.list().await?;

    if notes.is_empty() {
        println!("No notes in {}", store.root().display());
        return Ok(());
    }

    for note in &notes {
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", note.tags.join(", "))
        };
        println!(
            "{:<32} {:<40} {}{}",
            note.id,
            note.title,
            note.updated_at.format("%Y-%m-%d"),
            tags
        );
    }
    println!();
    println!("{} note(s)", notes.len());

    Ok(())
}

/// CLI entry point for `marko get <id>`.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = NoteStore::new(&config.store.root);
    let note = store.get(id).await?;

    println!("--- Note ---");
    println!("id:         {}", note.id);
    println!("title:      {}", note.title);
    if !note.tags.is_empty() {
        println!("tags:       {}", note.tags.join(", "));
    }
    println!("created_at: {}", note.created_at.to_rfc3339());
    println!("updated_at: {}", note.updated_at.to_rfc3339());
    println!();

    println!("--- Body ---");
    println!("{}", note.content);

    Ok(())
}
