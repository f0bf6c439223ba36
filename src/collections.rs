//! `rag collections` subcommands.

use anyhow::Result;

use crate::config::Config;
use crate::store::{SqliteVectorStore, VectorStore};

/// Print every collection in the store with its entry count.
///
/// A missing store file lists as empty and is left uncreated.
pub async fn run_list(config: &Config) -> Result<()> {
    let infos = match SqliteVectorStore::open_existing(&config.store.path).await? {
        Some(store) => {
            let infos = store.list_collections().await;
            store.close().await;
            infos?
        }
        None => Vec::new(),
    };

    println!("collections ({})", config.store.path.display());
    if infos.is_empty() {
        println!("  none");
    }
    for info in &infos {
        let created = chrono::DateTime::from_timestamp(info.collection.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| info.collection.created_at.to_string());
        println!(
            "  {}: {} entries (created {})",
            info.collection.name, info.entries, created
        );
    }
    Ok(())
}

/// Delete `name` and all of its entries.
pub async fn run_delete(config: &Config, name: &str) -> Result<()> {
    let deleted = match SqliteVectorStore::open_existing(&config.store.path).await? {
        Some(store) => {
            let deleted = store.delete_collection(name).await;
            store.close().await;
            deleted?
        }
        None => false,
    };

    if deleted {
        tracing::info!(collection = name, "deleted collection");
        println!("deleted collection {}", name);
    } else {
        println!("no collection named {}", name);
    }
    Ok(())
}
