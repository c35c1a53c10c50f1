use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidna")]
#[command(version, about = "Botanical photo filters for stills and the live camera", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a filter to an image file and write a JPEG
    Apply(ApplyArgs),

    /// Filter the camera feed live, press Enter to capture
    Live(LiveArgs),

    /// Answer the style quiz and get a filter
    Quiz(QuizArgs),

    /// Adjust a saved filter from a plain-language instruction
    Refine {
        /// Filter id or unique id prefix
        id: String,

        /// What to change, e.g. "warmer and less grain"
        #[arg(required = true, num_args = 1..)]
        instruction: Vec<String>,
    },

    /// Move a saved filter toward the look of a reference photo
    Match {
        /// Filter id or unique id prefix
        id: String,

        /// Reference image
        #[arg(value_name = "IMAGE")]
        reference: PathBuf,

        /// Use the offline image statistics instead of the vision model
        #[arg(long)]
        local: bool,
    },

    /// Manage saved filters
    Filters {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// List cameras that can be opened
    Cameras,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Input image
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output JPEG, defaults to `<input>-<filter>.jpg` next to the input
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Saved filter id or unique id prefix
    #[arg(short, long, value_name = "ID", conflicts_with = "params")]
    pub filter: Option<String>,

    /// JSON file with filter parameters
    #[arg(short, long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Override a single parameter, e.g. `--set grain=0.2` or `--set name=Dusk`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// JPEG quality, 1-100
    #[arg(short, long, value_name = "N")]
    pub quality: Option<u8>,
}

#[derive(Args)]
pub struct LiveArgs {
    /// Saved filter id or unique id prefix
    #[arg(short, long, value_name = "ID")]
    pub filter: Option<String>,

    /// Disable temporal noise reduction
    #[arg(long)]
    pub no_denoise: bool,

    /// Camera name, see `vidna cameras`
    #[arg(short, long, value_name = "NAME")]
    pub camera: Option<String>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,
}

#[derive(Args)]
pub struct QuizArgs {
    /// JSON answers `[{"question": "light", "answer": "golden"}, ...]` instead of prompting
    #[arg(short, long, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    /// Skip the remote generator and use the built-in mapping
    #[arg(long)]
    pub offline: bool,

    /// Save the result to the filter library
    #[arg(short, long)]
    pub save: bool,
}

#[derive(Subcommand)]
pub enum FilterCommands {
    /// List saved filters, newest first
    List,

    /// Print a saved filter as JSON
    Show { id: String },

    /// Delete a saved filter
    Delete { id: String },

    /// Save a hand-tuned filter
    Save {
        /// Start from a saved filter instead of the defaults
        #[arg(short, long, value_name = "ID", conflicts_with = "params")]
        filter: Option<String>,

        /// JSON file with filter parameters
        #[arg(short, long, value_name = "FILE")]
        params: Option<PathBuf>,

        /// Override a single parameter, e.g. `--set grain=0.2` or `--set name=Dusk`
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Rename a saved filter
    Rename {
        id: String,

        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
}
