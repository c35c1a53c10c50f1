//! Per-pixel color stages: brightness, contrast, saturation, temperature/tint
//! and fade.
//!
//! The stages are fused into one pass. Each stage works in `f32`, clamps to
//! `[0, 255]` on exit, and the pixel is rounded to `u8` once at the end.

use crate::{Effect, params::FilterParameters};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use rayon::prelude::*;

// Rec. 709 luma weights
pub const LUMA_R: f32 = 0.2126;
pub const LUMA_G: f32 = 0.7152;
pub const LUMA_B: f32 = 0.0722;

pub const TEMPERATURE_SCALE: f32 = 30.0;
pub const TINT_RB_SCALE: f32 = 15.0;
pub const TINT_G_SCALE: f32 = 20.0;
pub const FADE_LIFT: f32 = 60.0;

#[inline]
fn clamp_channel(value: f32) -> f32 {
    value.clamp(0.0, 255.0)
}

#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2]
}

#[inline]
pub fn brightness(value: f32, factor: f32) -> f32 {
    clamp_channel(value * factor)
}

#[inline]
pub fn contrast(value: f32, factor: f32) -> f32 {
    clamp_channel(128.0 + (value - 128.0) * factor)
}

#[inline]
pub fn saturate(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    let y = luminance(rgb);
    rgb.map(|c| clamp_channel(y + factor * (c - y)))
}

/// Temperature moves R against B, tint moves R and B against G (magenta/green).
#[inline]
pub fn shift_white_balance(rgb: [f32; 3], temperature: f32, tint: f32) -> [f32; 3] {
    let t = temperature / 100.0 * TEMPERATURE_SCALE;
    let rb = tint / 100.0 * TINT_RB_SCALE;
    let g = tint / 100.0 * TINT_G_SCALE;

    [
        clamp_channel(rgb[0] + t + rb),
        clamp_channel(rgb[1] - g),
        clamp_channel(rgb[2] - t + rb),
    ]
}

/// Lift toward white in proportion to the distance from white.
#[inline]
pub fn fade(value: f32, amount: f32) -> f32 {
    let lift = amount * FADE_LIFT;
    clamp_channel(value + lift * (1.0 - value / 255.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ColorAdjustConfig {
    #[derivative(Default(value = "1.0"))]
    pub brightness: f32,

    #[derivative(Default(value = "1.0"))]
    pub contrast: f32,

    #[derivative(Default(value = "1.0"))]
    pub saturation: f32,

    pub temperature: f32,
    pub tint: f32,
    pub fade: f32,
}

impl ColorAdjustConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: &FilterParameters) -> Self {
        Self::default()
            .with_brightness(params.brightness())
            .with_contrast(params.contrast())
            .with_saturation(params.saturation())
            .with_temperature(params.temperature())
            .with_tint(params.tint())
            .with_fade(params.fade())
    }

    /// Run stages 2-6 on one pixel.
    pub fn adjust_rgb(&self, rgb: [u8; 3]) -> [u8; 3] {
        let mut c = rgb.map(|v| v as f32);

        if self.brightness != 1.0 {
            c = c.map(|v| brightness(v, self.brightness));
        }

        if self.contrast != 1.0 {
            c = c.map(|v| contrast(v, self.contrast));
        }

        if self.saturation != 1.0 {
            c = saturate(c, self.saturation);
        }

        if self.temperature != 0.0 || self.tint != 0.0 {
            c = shift_white_balance(c, self.temperature, self.tint);
        }

        if self.fade != 0.0 {
            c = c.map(|v| fade(v, self.fade));
        }

        c.map(|v| v.round() as u8)
    }
}

impl Effect for ColorAdjustConfig {
    fn apply(&self, image: &mut RgbaImage) {
        let stride = image.width() as usize * 4;
        if self.is_neutral() || stride == 0 {
            return;
        }

        let pixels: &mut [u8] = &mut *image;
        pixels.par_chunks_mut(stride).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                let [r, g, b] = self.adjust_rgb([px[0], px[1], px[2]]);
                px[0] = r;
                px[1] = g;
                px[2] = b;
            }
        });
    }

    fn is_neutral(&self) -> bool {
        self.brightness == 1.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && self.temperature == 0.0
            && self.tint == 0.0
            && self.fade == 0.0
    }
}
