//! SQLite persistence for saved filters.
//!
//! Each record is stored as one JSON document keyed by its uuid. Decoding goes
//! through [`photo_filter::SavedFilter`]'s deserializer, so parameters read
//! back from disk are validated like any other input.
//!
//! ```no_run
//! use filter_store::FilterStore;
//! use photo_filter::{FilterParameters, FilterSource, SavedFilter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = FilterStore::open("/tmp/vidna.db").await?;
//!     let record = SavedFilter::new(FilterParameters::default(), FilterSource::Manual);
//!     store.insert(&record).await?;
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result, bail};
use photo_filter::SavedFilter;
use sqlx::{
    Pool,
    migrate::MigrateDatabase,
    sqlite::{Sqlite, SqlitePoolOptions},
};
use std::path::Path;

pub mod entry;

/// Maximum number of concurrent database connections in the pool
const MAX_CONNECTIONS: u32 = 3;

pub const FILTER_TABLE: &str = "filters";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FilterRow {
    pub uuid: String,
    pub data: String,
}

impl FilterRow {
    fn decode(&self) -> Result<SavedFilter> {
        serde_json::from_str(&self.data)
            .with_context(|| format!("corrupt filter record {}", self.uuid))
    }
}

#[derive(Debug, Clone)]
pub struct FilterStore {
    pool: Pool<Sqlite>,
}

impl FilterStore {
    /// Open (creating if needed) the database at `db_path`.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }

        let db_path = db_path.to_string_lossy();
        if !Sqlite::database_exists(&db_path).await.unwrap_or(false) {
            Sqlite::create_database(&db_path)
                .await
                .with_context(|| format!("create database {db_path}"))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(&format!("sqlite:{db_path}"))
            .await
            .with_context(|| format!("connect {db_path}"))?;

        entry::new(&pool, FILTER_TABLE).await?;
        log::debug!("filter store opened at {db_path}");

        Ok(Self { pool })
    }

    pub async fn insert(&self, record: &SavedFilter) -> Result<()> {
        let data = serde_json::to_string(record)?;
        entry::insert(&self.pool, FILTER_TABLE, &record.id, &data)
            .await
            .with_context(|| format!("insert filter {}", record.id))
    }

    pub async fn update(&self, record: &SavedFilter) -> Result<()> {
        let data = serde_json::to_string(record)?;
        if entry::update(&self.pool, FILTER_TABLE, &record.id, &data).await? == 0 {
            bail!("no filter with id {}", record.id);
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if entry::delete(&self.pool, FILTER_TABLE, id).await? == 0 {
            bail!("no filter with id {id}");
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<SavedFilter> {
        entry::select(&self.pool, FILTER_TABLE, id)
            .await?
            .with_context(|| format!("no filter with id {id}"))?
            .decode()
    }

    /// Look a filter up by full id or unambiguous id prefix.
    pub async fn resolve(&self, id_or_prefix: &str) -> Result<SavedFilter> {
        let prefix = id_or_prefix.trim();
        if prefix.is_empty() {
            bail!("empty filter id");
        }

        let rows = entry::select_prefix(&self.pool, FILTER_TABLE, prefix).await?;
        if let Some(exact) = rows.iter().find(|r| r.uuid == prefix) {
            return exact.decode();
        }

        match rows.as_slice() {
            [] => bail!("no filter with id {prefix}"),
            [row] => row.decode(),
            _ => bail!("filter id prefix {prefix} matches {} filters", rows.len()),
        }
    }

    /// Every saved filter, newest first. Corrupt records are skipped.
    pub async fn list(&self) -> Result<Vec<SavedFilter>> {
        let rows = entry::select_all(&self.pool, FILTER_TABLE).await?;

        Ok(rows
            .iter()
            .rev()
            .filter_map(|row| match row.decode() {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("{e:?}");
                    None
                }
            })
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        entry::row_counts(&self.pool, FILTER_TABLE).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_filter::{FilterParameters, FilterSource, Param};
    use tempfile::TempDir;

    async fn open_temp() -> Result<(TempDir, FilterStore)> {
        let dir = tempfile::tempdir()?;
        let store = FilterStore::open(dir.path().join("nested").join("filters.db")).await?;
        Ok((dir, store))
    }

    fn record(name: &str) -> SavedFilter {
        SavedFilter::new(
            FilterParameters::default()
                .with_name(name)
                .with(Param::Saturation, 1.4),
            FilterSource::Quiz,
        )
    }

    #[tokio::test]
    async fn test_insert_get_list() -> Result<()> {
        let (_dir, store) = open_temp().await?;

        let first = record("First");
        let second = record("Second");
        store.insert(&first).await?;
        store.insert(&second).await?;

        assert_eq!(store.count().await?, 2);
        assert_eq!(store.get(&first.id).await?, first);

        let names: Vec<_> = store.list().await?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Second", "First"]);

        assert!(store.insert(&first).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete() -> Result<()> {
        let (_dir, store) = open_temp().await?;

        let original = record("Fern");
        store.insert(&original).await?;

        let renamed = original.renamed("Night Fern");
        store.update(&renamed).await?;
        assert_eq!(store.get(&original.id).await?.name, "Night Fern");

        store.delete(&original.id).await?;
        assert!(store.get(&original.id).await.is_err());
        assert!(store.delete(&original.id).await.is_err());
        assert!(store.update(&renamed).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_prefix() -> Result<()> {
        let (_dir, store) = open_temp().await?;

        let saved = record("Moss");
        store.insert(&saved).await?;

        assert_eq!(store.resolve(&saved.id[..8]).await?.id, saved.id);
        assert_eq!(store.resolve(&saved.id).await?.id, saved.id);
        assert!(store.resolve("zzzz").await.is_err());
        assert!(store.resolve("  ").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_wildcards_match_nothing() -> Result<()> {
        let (_dir, store) = open_temp().await?;
        store.insert(&record("Moss")).await?;

        for id in ["%", "_", "%%", "_%", "\\"] {
            assert!(store.resolve(id).await.is_err(), "{id} resolved");
        }
        assert!(store.delete("%").await.is_err());
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stored_params_are_revalidated() -> Result<()> {
        let (_dir, store) = open_temp().await?;

        let data = r#"{"id":"raw-1","name":"Hot","source":"manual",
                       "params":{"name":"Hot","temperature":400,"grain":"x"}}"#;
        entry::insert(&store.pool, FILTER_TABLE, "raw-1", data).await?;
        entry::insert(&store.pool, FILTER_TABLE, "raw-2", "not json").await?;

        let loaded = store.get("raw-1").await?;
        assert_eq!(loaded.params.temperature(), 40.0);
        assert_eq!(loaded.params.grain(), 0.2);

        assert!(store.get("raw-2").await.is_err());
        assert_eq!(store.list().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("filters.db");

        let saved = record("Ivy");
        {
            let store = FilterStore::open(&path).await?;
            store.insert(&saved).await?;
            store.close().await;
        }

        let store = FilterStore::open(&path).await?;
        assert_eq!(store.get(&saved.id).await?, saved);
        Ok(())
    }
}
