//! Photo filter core
//!
//! Holds the filter parameter model and the per-pixel transform pipeline that
//! turns a parameter set into a graded image. Every parameter producer goes
//! through [`params::validate`]; every frame goes through
//! [`pipeline::FilterPipeline`] or [`pipeline::apply_filter`].

pub mod adjust;
pub mod export;
pub mod grain;
pub mod live;
pub mod naming;
pub mod params;
pub mod pipeline;
pub mod record;
pub mod smoothing;
pub mod style_match;
pub mod vignette;

pub use image::{Rgba, RgbaImage};
pub use live::{
    Capture, FrameSource, LiveCommand, LiveEvent, LiveHandle, LiveOptions, LiveSession,
    StillFrameSource,
};
pub use naming::{slugify, synthesize_name};
pub use params::{FilterParameters, Param, ParamRange, validate};
pub use pipeline::{FilterPipeline, PipelineConfig, apply_filter};
pub use record::{FilterSource, SavedFilter};
pub use style_match::{StyleProfile, analyze_reference, match_style};

pub type PhotoFilterResult<T> = Result<T, PhotoFilterError>;

#[derive(thiserror::Error, Debug)]
pub enum PhotoFilterError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("An export is already in progress")]
    ExportBusy,

    #[error("No frame available")]
    NoFrameAvailable,

    #[error("Live session closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A single pipeline stage operating in place on an RGBA buffer.
///
/// Stages never fail on validated parameters, so there is no error channel.
pub trait Effect {
    fn apply(&self, image: &mut RgbaImage);

    /// `true` when applying the stage would leave every pixel unchanged.
    fn is_neutral(&self) -> bool;
}
