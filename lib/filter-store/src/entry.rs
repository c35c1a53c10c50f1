//! Table operations on `uuid` + JSON `data` rows
//!
//! Every function takes the pool explicitly so one process can hold several
//! stores. Table names are interpolated into the SQL and must come from code,
//! never from user input.

use crate::FilterRow;
use anyhow::Result;
use sqlx::{Pool, Sqlite};

/// Escape character for `LIKE` patterns.
const LIKE_ESCAPE: char = '\\';

/// Create the table if it does not exist
///
/// Schema:
/// - `id`: INTEGER PRIMARY KEY (insertion order)
/// - `uuid`: TEXT NOT NULL UNIQUE
/// - `data`: TEXT NOT NULL (JSON payload)
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table to create
///
/// # Errors
/// Returns an error if the query fails.
///
/// # Example
/// ```no_run
/// use sqlx::sqlite::SqlitePoolOptions;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await?;
///     filter_store::entry::new(&pool, "filters").await?;
///     Ok(())
/// }
/// ```
pub async fn new(pool: &Pool<Sqlite>, table: &str) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
             id INTEGER PRIMARY KEY,
             uuid TEXT NOT NULL UNIQUE,
             data TEXT NOT NULL
             )"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the row with `uuid`
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
/// * `uuid` - Exact identifier of the row
///
/// # Returns
/// The number of deleted rows, `0` when no row matched.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn delete(pool: &Pool<Sqlite>, table: &str, uuid: &str) -> Result<u64> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE uuid=?"))
        .bind(uuid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Insert a new row
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
/// * `uuid` - Identifier of the row, unique within the table
/// * `data` - JSON payload
///
/// # Errors
/// Returns an error if:
/// - A row with the same `uuid` already exists
/// - The query fails
///
/// # Example
/// ```no_run
/// # async fn demo(pool: sqlx::Pool<sqlx::Sqlite>) -> anyhow::Result<()> {
/// filter_store::entry::insert(&pool, "filters", "0b6f...", r#"{"name":"Moss"}"#).await?;
/// # Ok(())
/// # }
/// ```
pub async fn insert(pool: &Pool<Sqlite>, table: &str, uuid: &str, data: &str) -> Result<()> {
    sqlx::query(&format!("INSERT INTO {table} (uuid, data) VALUES (?, ?)"))
        .bind(uuid)
        .bind(data)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the payload of the row with `uuid`
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
/// * `uuid` - Exact identifier of the row
/// * `data` - New JSON payload
///
/// # Returns
/// The number of updated rows, `0` when no row matched.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn update(pool: &Pool<Sqlite>, table: &str, uuid: &str, data: &str) -> Result<u64> {
    let result = sqlx::query(&format!("UPDATE {table} SET data=? WHERE uuid=?"))
        .bind(data)
        .bind(uuid)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Fetch the row with `uuid`
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
/// * `uuid` - Exact identifier of the row
///
/// # Returns
/// `None` when no row matched.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn select(pool: &Pool<Sqlite>, table: &str, uuid: &str) -> Result<Option<FilterRow>> {
    Ok(
        sqlx::query_as::<_, FilterRow>(&format!("SELECT uuid, data FROM {table} WHERE uuid=?"))
            .bind(uuid)
            .fetch_optional(pool)
            .await?,
    )
}

/// Fetch every row whose `uuid` starts with `prefix`, in insertion order
///
/// `prefix` is matched literally: `%`, `_` and `\` carry no wildcard meaning.
/// An empty prefix matches nothing.
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
/// * `prefix` - Leading characters of the identifier
///
/// # Errors
/// Returns an error if the query fails.
///
/// # Example
/// ```no_run
/// # async fn demo(pool: sqlx::Pool<sqlx::Sqlite>) -> anyhow::Result<()> {
/// let rows = filter_store::entry::select_prefix(&pool, "filters", "0b6f").await?;
/// println!("{} matches", rows.len());
/// # Ok(())
/// # }
/// ```
pub async fn select_prefix(pool: &Pool<Sqlite>, table: &str, prefix: &str) -> Result<Vec<FilterRow>> {
    if prefix.is_empty() {
        return Ok(vec![]);
    }

    Ok(sqlx::query_as::<_, FilterRow>(&format!(
        "SELECT uuid, data FROM {table} WHERE uuid LIKE ? ESCAPE '{LIKE_ESCAPE}' ORDER BY id"
    ))
    .bind(like_prefix_pattern(prefix))
    .fetch_all(pool)
    .await?)
}

/// `prefix` with `LIKE` metacharacters escaped, followed by `%`.
fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Fetch all rows in insertion order
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
///
/// # Errors
/// Returns an error if the query fails.
pub async fn select_all(pool: &Pool<Sqlite>, table: &str) -> Result<Vec<FilterRow>> {
    Ok(
        sqlx::query_as::<_, FilterRow>(&format!("SELECT uuid, data FROM {table} ORDER BY id"))
            .fetch_all(pool)
            .await?,
    )
}

/// Count the rows in the table
///
/// # Arguments
/// * `pool` - Connection pool of the store
/// * `table` - Name of the table
///
/// # Errors
/// Returns an error if the query fails.
pub async fn row_counts(pool: &Pool<Sqlite>, table: &str) -> Result<i64> {
    let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
