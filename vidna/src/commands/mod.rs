use crate::{
    cli::{Commands, FilterCommands},
    config::{API_KEY_ENV, Config},
};
use anyhow::{Context, Result, bail};
use filter_gen::FilterGenerator;
use filter_store::FilterStore;
use photo_filter::{FilterParameters, SavedFilter};

mod apply;
mod edit;
mod filters;
mod live;
mod quiz;

pub use apply::{default_output_path, resolve_params};
pub use quiz::parse_answers;

pub async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Apply(args) => apply::run(args, &config).await,
        Commands::Live(args) => live::run(args, config).await,
        Commands::Quiz(args) => quiz::run(args, &config).await,
        Commands::Refine { id, instruction } => {
            edit::refine(&config, &id, &instruction.join(" ")).await
        }
        Commands::Match {
            id,
            reference,
            local,
        } => edit::match_reference(&config, &id, &reference, local).await,
        Commands::Filters { command } => match command {
            FilterCommands::List => filters::list(&config).await,
            FilterCommands::Show { id } => filters::show(&config, &id).await,
            FilterCommands::Delete { id } => filters::delete(&config, &id).await,
            FilterCommands::Save {
                filter,
                params,
                set,
            } => filters::save(&config, filter.as_deref(), params.as_deref(), &set).await,
            FilterCommands::Rename { id, name } => {
                filters::rename(&config, &id, &name.join(" ")).await
            }
        },
        Commands::Cameras => cameras(),
    }
}

async fn open_store(config: &Config) -> Result<FilterStore> {
    FilterStore::open(&config.db_path)
        .await
        .with_context(|| format!("open filter library {}", config.db_path.display()))
}

/// `None` when no API key is configured.
fn generator(config: &Config) -> Option<FilterGenerator> {
    config
        .api
        .has_key()
        .then(|| FilterGenerator::new(config.api.to_api_config()))
}

fn require_generator(config: &Config, what: &str) -> Result<FilterGenerator> {
    match generator(config) {
        Some(generator) => Ok(generator),
        None => bail!("{what} needs an API key: set {API_KEY_ENV} or api.api_key in the config file"),
    }
}

fn print_params(params: &FilterParameters) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&params.to_json())?);
    Ok(())
}

fn print_record(record: &SavedFilter) -> Result<()> {
    println!("id:      {}", record.id);
    println!("name:    {}", record.name);
    println!("source:  {}", record.source);
    if !record.created_at.is_empty() {
        println!("created: {}", record.created_at);
    }
    print_params(&record.params)
}

fn cameras() -> Result<()> {
    camera::init();

    let cameras = camera::query_available_cameras();
    if cameras.is_empty() {
        println!("no cameras found");
    }

    for info in cameras {
        println!("{info}");
    }
    Ok(())
}
