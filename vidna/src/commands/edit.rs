use super::{generator, open_store, print_record, require_generator};
use crate::config::Config;
use anyhow::{Context, Result, bail};
use filter_gen::FilterGenerator;
use filter_store::FilterStore;
use photo_filter::{
    FilterParameters, FilterSource, RgbaImage, SavedFilter, analyze_reference,
    export::{encode_jpeg, load_image},
    match_style,
};
use std::path::Path;

pub(super) async fn refine(config: &Config, id: &str, instruction: &str) -> Result<()> {
    if instruction.trim().is_empty() {
        bail!("empty refine instruction");
    }

    let generator = require_generator(config, "refine")?;
    let store = open_store(config).await?;
    let record = store.resolve(id).await?;

    let params = generator
        .refine(&record.params, instruction)
        .await
        .with_context(|| format!("refine `{}`", record.name))?;

    let record = record.with_params(params);
    store.update(&record).await?;
    log::info!("refined `{}`: {instruction}", record.name);

    print_record(&record)?;
    store.close().await;
    Ok(())
}

pub(super) async fn match_reference(
    config: &Config,
    id: &str,
    reference: &Path,
    local: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let image = load_image(reference)
        .with_context(|| format!("load reference {}", reference.display()))?;

    let remote = if local { None } else { generator(config) };
    if remote.is_none() && !local {
        log::info!("no API key configured, matching with local image statistics");
    }

    let record = match_stored(
        &store,
        id,
        &image,
        remote.as_ref(),
        config.pipeline.jpeg_quality,
    )
    .await?;
    log::info!("matched `{}` to {}", record.name, reference.display());

    print_record(&record)?;
    store.close().await;
    Ok(())
}

/// Match the stored filter `id` to `reference` and write it back as an
/// image-match record.
async fn match_stored(
    store: &FilterStore,
    id: &str,
    reference: &RgbaImage,
    remote: Option<&FilterGenerator>,
    quality: u8,
) -> Result<SavedFilter> {
    let record = store.resolve(id).await?;

    let params = match remote {
        Some(generator) => match_remote(generator, &record.params, reference, quality).await,
        None => match_local(&record.params, reference),
    };

    let record = record
        .with_params(params)
        .with_source(FilterSource::ImageMatch);
    store.update(&record).await?;
    Ok(record)
}

fn match_local(current: &FilterParameters, reference: &RgbaImage) -> FilterParameters {
    match_style(current, &analyze_reference(reference))
}

/// Vision model first, local statistics if it fails.
async fn match_remote(
    generator: &FilterGenerator,
    current: &FilterParameters,
    reference: &RgbaImage,
    quality: u8,
) -> FilterParameters {
    let result = match encode_jpeg(reference, quality) {
        Ok(jpeg) => generator
            .match_style(current, &jpeg)
            .await
            .map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };

    result.unwrap_or_else(|e| {
        log::warn!("remote style match failed, using local statistics: {e:#}");
        match_local(current, reference)
    })
}
