use super::{open_store, print_record, resolve_params};
use crate::config::Config;
use anyhow::{Result, bail};
use filter_store::FilterStore;
use photo_filter::{FilterSource, SavedFilter};
use std::path::Path;

pub(super) async fn list(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let filters = store.list().await?;

    if filters.is_empty() {
        println!("no saved filters, try `vidna quiz --save`");
    }

    for record in &filters {
        println!("{}", list_line(record));
    }

    store.close().await;
    Ok(())
}

pub(super) async fn show(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let record = store.resolve(id).await?;
    print_record(&record)?;
    store.close().await;
    Ok(())
}

pub(super) async fn delete(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let record = store.resolve(id).await?;
    store.delete(&record.id).await?;
    println!("deleted `{}` ({})", record.name, record.id);
    store.close().await;
    Ok(())
}

pub(super) async fn save(
    config: &Config,
    filter: Option<&str>,
    params_file: Option<&Path>,
    assignments: &[String],
) -> Result<()> {
    let store = open_store(config).await?;
    let record = save_manual(&store, filter, params_file, assignments).await?;
    log::info!("saved manual filter `{}`", record.name);

    print_record(&record)?;
    store.close().await;
    Ok(())
}

/// Insert the resolved parameters as a new manual record.
async fn save_manual(
    store: &FilterStore,
    filter: Option<&str>,
    params_file: Option<&Path>,
    assignments: &[String],
) -> Result<SavedFilter> {
    let params = resolve_params(Some(store), filter, params_file, assignments).await?;
    let record = SavedFilter::new(params, FilterSource::Manual);
    store.insert(&record).await?;
    Ok(record)
}

pub(super) async fn rename(config: &Config, id: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("empty filter name");
    }

    let store = open_store(config).await?;
    let record = store.resolve(id).await?.renamed(name);
    store.update(&record).await?;
    println!("renamed {} to `{}`", record.id, record.name);
    store.close().await;
    Ok(())
}

fn list_line(record: &SavedFilter) -> String {
    let created = record.created_at.get(..16).unwrap_or(&record.created_at);
    let short_id = record.id.get(..8).unwrap_or(&record.id);

    format!(
        "{short_id}  {:<28} {:<12} {}",
        record.name,
        record.source.to_string(),
        created.replace('T', " ")
    )
}
