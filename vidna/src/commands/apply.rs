use super::open_store;
use crate::{cli::ApplyArgs, config::Config};
use anyhow::{Context, Result, bail};
use filter_store::FilterStore;
use photo_filter::{
    FilterParameters,
    export::{export_still, load_image, write_jpeg},
    slugify, validate,
};
use std::path::{Path, PathBuf};

pub(super) async fn run(args: ApplyArgs, config: &Config) -> Result<()> {
    let store = match args.filter {
        Some(_) => Some(open_store(config).await?),
        None => None,
    };

    let params = resolve_params(
        store.as_ref(),
        args.filter.as_deref(),
        args.params.as_deref(),
        &args.set,
    )
    .await?;

    let image = load_image(&args.input)
        .with_context(|| format!("load image {}", args.input.display()))?;

    let quality = args.quality.unwrap_or(config.pipeline.jpeg_quality);
    let jpeg = export_still(&image, &params, quality)?;

    let out = args
        .out
        .unwrap_or_else(|| default_output_path(&args.input, params.name()));
    write_jpeg(&out, &jpeg).with_context(|| format!("write {}", out.display()))?;

    log::info!(
        "applied `{}` to {} ({}x{})",
        params.name(),
        args.input.display(),
        image.width(),
        image.height()
    );
    println!("{}", out.display());
    Ok(())
}

/// Base parameters from a saved filter, a JSON file or the defaults, then the
/// `key=value` overrides in order.
pub async fn resolve_params(
    store: Option<&FilterStore>,
    filter: Option<&str>,
    params_file: Option<&Path>,
    assignments: &[String],
) -> Result<FilterParameters> {
    let mut params = match (filter, params_file) {
        (Some(_), Some(_)) => bail!("use either a saved filter or a parameter file, not both"),
        (Some(id), None) => {
            let Some(store) = store else {
                bail!("no filter library to look up {id}");
            };
            store.resolve(id).await?.params
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            let raw = serde_json::from_str(&text)
                .with_context(|| format!("parse {}", path.display()))?;
            validate(&raw)
        }
        (None, None) => FilterParameters::default(),
    };

    for assignment in assignments {
        params = params.with_assignment(assignment)?;
    }

    Ok(params)
}

/// `<dir>/<stem>-<filter slug>.jpg` beside the input.
pub fn default_output_path(input: &Path, filter_name: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    input.with_file_name(format!("{stem}-{}.jpg", slugify(filter_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_filter::{FilterSource, Param, SavedFilter};

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/photos/fern.png"), "Lush Leaf"),
            PathBuf::from("/photos/fern-lush-leaf.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("fern.jpg"), "Custom Filter"),
            PathBuf::from("fern-custom-filter.jpg")
        );
    }

    #[tokio::test]
    async fn test_params_file_then_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"name": "Dusk", "grain": 0.9, "fade": 0.1}"#)?;

        let assignments = ["fade=0.2".to_string(), "name=Late Dusk".to_string()];
        let params = resolve_params(None, None, Some(&path), &assignments).await?;

        assert_eq!(params.name(), "Late Dusk");
        assert_eq!(params.grain(), 0.4);
        assert!((params.fade() - 0.2).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_override_is_an_error() {
        let assignments = ["sharpness=2".to_string()];
        assert!(resolve_params(None, None, None, &assignments).await.is_err());
    }

    #[tokio::test]
    async fn test_saved_filter_by_prefix() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FilterStore::open(dir.path().join("vidna.db")).await?;

        let params = FilterParameters::default()
            .with_name("Golden Bloom")
            .with(Param::Temperature, 20.0);
        let record = SavedFilter::new(params, FilterSource::Manual);
        store.insert(&record).await?;

        let resolved = resolve_params(Some(&store), Some(&record.id[..8]), None, &[]).await?;
        assert_eq!(resolved, record.params);

        assert!(resolve_params(None, Some(&record.id), None, &[]).await.is_err());
        store.close().await;
        Ok(())
    }
}
