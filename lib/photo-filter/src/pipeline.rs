//! The full filter pipeline.
//!
//! Stage order is fixed: temporal smoothing (live only), color adjustment
//! (brightness, contrast, saturation, temperature/tint, fade), vignette, grain.

use crate::{
    Effect,
    adjust::ColorAdjustConfig,
    grain::{GrainConfig, GrainTexture, LIVE_TILE_SIZE},
    params::FilterParameters,
    smoothing::TemporalSmoother,
    vignette::{VignetteConfig, VignetteMask},
};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Debug, Clone, Copy, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct PipelineConfig {
    #[derivative(Default(value = "true"))]
    pub noise_reduction: bool,

    #[derivative(Default(value = "LIVE_TILE_SIZE"))]
    pub grain_tile_size: u32,
}

/// Apply `params` to a single still image. Grain uses a fresh random texture.
pub fn apply_filter(image: &mut RgbaImage, params: &FilterParameters) {
    apply_filter_with_rng(image, params, &mut rand::rng());
}

pub fn apply_filter_with_rng<R: Rng + ?Sized>(
    image: &mut RgbaImage,
    params: &FilterParameters,
    rng: &mut R,
) {
    ColorAdjustConfig::from_params(params).apply(image);
    VignetteConfig::new()
        .with_intensity(params.vignette())
        .apply(image);
    GrainConfig::new()
        .with_intensity(params.grain())
        .apply_with_rng(image, rng);
}

/// Pipeline state for one frame stream.
///
/// Owns the previous-frame slot, the cached vignette mask and the live grain
/// tile. One instance per stream; never shared between streams.
pub struct FilterPipeline {
    config: PipelineConfig,
    smoother: TemporalSmoother,
    vignette: Option<VignetteMask>,
    grain_tile: Option<GrainTexture>,
    rng: StdRng,
}

impl FilterPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_rng(config, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic grain, for tests and reproducible renders.
    pub fn with_seed(config: PipelineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PipelineConfig, rng: StdRng) -> Self {
        Self {
            config,
            smoother: TemporalSmoother::new(),
            vignette: None,
            grain_tile: None,
            rng,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Toggling in either direction drops the previous frame.
    pub fn set_noise_reduction(&mut self, enabled: bool) {
        if self.config.noise_reduction != enabled {
            log::debug!("noise reduction {}", if enabled { "on" } else { "off" });
            self.config.noise_reduction = enabled;
            self.smoother.reset();
        }
    }

    /// Forget everything tied to the current frame source.
    pub fn reset(&mut self) {
        self.smoother.reset();
    }

    pub fn has_previous_frame(&self) -> bool {
        self.smoother.has_previous()
    }

    /// Live mode: smoothing (when enabled), cached vignette, tiled grain.
    pub fn process_frame(&mut self, frame: &mut RgbaImage, params: &FilterParameters) {
        if self.config.noise_reduction {
            self.smoother.apply(frame);
        }

        ColorAdjustConfig::from_params(params).apply(frame);
        self.apply_cached_vignette(frame, params);

        if params.grain() > 0.0 {
            let size = self.config.grain_tile_size.max(1);
            let rng = &mut self.rng;
            self.grain_tile
                .get_or_insert_with(|| GrainTexture::random(size, size, rng))
                .overlay(frame, params.grain());
        }
    }

    /// Still mode: no smoothing, grain from a freshly randomized texture.
    pub fn process_still(&mut self, image: &mut RgbaImage, params: &FilterParameters) {
        apply_filter_with_rng(image, params, &mut self.rng);
    }

    /// Re-roll the live grain tile.
    pub fn refresh_grain(&mut self) {
        self.grain_tile = None;
    }

    fn apply_cached_vignette(&mut self, frame: &mut RgbaImage, params: &FilterParameters) {
        let config = VignetteConfig::new().with_intensity(params.vignette());
        if config.is_neutral() {
            return;
        }

        let (width, height) = frame.dimensions();
        let stale = !self
            .vignette
            .as_ref()
            .is_some_and(|mask| mask.fits(width, height, &config));

        if stale {
            self.vignette = Some(config.mask(width, height));
        }

        if let Some(mask) = &self.vignette {
            mask.composite(frame);
        }
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Param, validate};
    use image::Rgba;
    use serde_json::json;

    fn sample_image() -> RgbaImage {
        RgbaImage::from_fn(24, 16, |x, y| {
            Rgba([(x * 10) as u8, (y * 15) as u8, ((x * y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_neutral_params_are_identity() {
        let params = FilterParameters::default();
        let original = sample_image();

        let mut still = original.clone();
        apply_filter(&mut still, &params);
        assert_eq!(still, original);

        let mut pipeline = FilterPipeline::new(PipelineConfig::default());
        for _ in 0..3 {
            let mut frame = original.clone();
            pipeline.process_frame(&mut frame, &params);
            assert_eq!(frame, original);
        }
    }

    #[test]
    fn test_deterministic_without_grain() {
        let params = validate(&json!({
            "brightness": 1.1, "contrast": 1.2, "saturation": 1.3, "temperature": -12,
            "tint": 6, "vignette": 0.4, "fade": 0.1
        }));

        let mut a = sample_image();
        let mut b = sample_image();
        apply_filter(&mut a, &params);
        apply_filter(&mut b, &params);
        assert_eq!(a, b);
        assert_ne!(a, sample_image());
    }

    #[test]
    fn test_mid_gray_scenario() {
        let params = validate(&json!({
            "brightness": 1.2, "contrast": 1.1, "saturation": 0.8, "temperature": 10,
            "tint": 0, "grain": 0, "vignette": 0, "fade": 0
        }));

        let mut image = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        apply_filter(&mut image, &params);
        assert!(image.pixels().all(|p| p.0 == [159, 156, 153, 255]));
    }

    #[test]
    fn test_seeded_pipelines_agree() {
        let params = FilterParameters::default()
            .with(Param::Grain, 0.3)
            .with(Param::Vignette, 0.2);

        let mut a = sample_image();
        let mut b = sample_image();
        FilterPipeline::with_seed(PipelineConfig::default(), 3).process_still(&mut a, &params);
        FilterPipeline::with_seed(PipelineConfig::default(), 3).process_still(&mut b, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_live_grain_tile_is_reused() {
        let params = FilterParameters::default().with(Param::Grain, 0.25);
        let config = PipelineConfig::default()
            .with_noise_reduction(false)
            .with_grain_tile_size(8);
        let mut pipeline = FilterPipeline::with_seed(config, 11);

        let mut first = sample_image();
        let mut second = sample_image();
        pipeline.process_frame(&mut first, &params);
        pipeline.process_frame(&mut second, &params);
        assert_eq!(first, second);

        pipeline.refresh_grain();
        let mut third = sample_image();
        pipeline.process_frame(&mut third, &params);
        assert_ne!(first, third);
    }

    #[test]
    fn test_noise_reduction_toggle_resets_previous_frame() {
        let mut pipeline = FilterPipeline::new(PipelineConfig::default());
        let params = FilterParameters::default();

        pipeline.process_frame(&mut sample_image(), &params);
        assert!(pipeline.has_previous_frame());

        pipeline.set_noise_reduction(false);
        assert!(!pipeline.has_previous_frame());

        pipeline.process_frame(&mut sample_image(), &params);
        assert!(!pipeline.has_previous_frame());

        pipeline.set_noise_reduction(true);
        pipeline.process_frame(&mut sample_image(), &params);
        assert!(pipeline.has_previous_frame());

        pipeline.reset();
        assert!(!pipeline.has_previous_frame());
    }

    #[test]
    fn test_smoothing_runs_before_color() {
        let params = FilterParameters::default().with(Param::Brightness, 1.2);
        let mut pipeline = FilterPipeline::new(PipelineConfig::default());

        let mut first = RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 255]));
        pipeline.process_frame(&mut first, &params);
        assert_eq!(first.get_pixel(0, 0).0, [120, 120, 120, 255]);

        // Raw 120 blends with raw 100 to 117, then * 1.2
        let mut second = RgbaImage::from_pixel(2, 2, Rgba([120, 120, 120, 255]));
        pipeline.process_frame(&mut second, &params);
        assert_eq!(second.get_pixel(0, 0).0, [140, 140, 140, 255]);
    }

    #[test]
    fn test_vignette_cache_follows_frame_size() {
        let params = FilterParameters::default().with(Param::Vignette, 0.5);
        let mut pipeline = FilterPipeline::new(PipelineConfig::default().with_noise_reduction(false));

        let mut small = RgbaImage::from_pixel(10, 10, Rgba([200, 200, 200, 255]));
        pipeline.process_frame(&mut small, &params);

        let mut large = RgbaImage::from_pixel(30, 20, Rgba([200, 200, 200, 255]));
        pipeline.process_frame(&mut large, &params);

        let mut expected = RgbaImage::from_pixel(30, 20, Rgba([200, 200, 200, 255]));
        apply_filter(&mut expected, &params);
        assert_eq!(large, expected);
    }
}
