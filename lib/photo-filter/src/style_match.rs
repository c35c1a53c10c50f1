//! Offline reference-image matching.
//!
//! Measures a handful of global statistics on a reference photo and nudges an
//! existing parameter set toward the look they describe.

use crate::{
    adjust::{TEMPERATURE_SCALE, TINT_G_SCALE, TINT_RB_SCALE, luminance},
    params::{FilterParameters, Param},
};
use image::RgbaImage;

/// Fraction of the distance to the reference look covered by one match.
pub const MATCH_STRENGTH: f32 = 0.45;

// Luminance spread and chroma of an ungraded daylight photo.
const REFERENCE_SPREAD: f32 = 55.0;
const REFERENCE_CHROMA: f32 = 28.0;

// Texture every real photo has before any grain is added.
const NATURAL_DETAIL: f32 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleProfile {
    pub mean_luma: f32,
    pub luma_spread: f32,
    pub chroma: f32,
    /// Mean red minus mean blue.
    pub warmth: f32,
    /// Mean of red and blue minus mean green; positive is magenta.
    pub tint_bias: f32,
    /// 5th percentile luminance.
    pub shadow_floor: f32,
    /// Corner luminance deficit relative to the centre, `[0, 1]`.
    pub corner_darkening: f32,
    /// Mean absolute luminance step between horizontal neighbours, `[0, 1]`.
    pub detail: f32,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            mean_luma: 128.0,
            luma_spread: REFERENCE_SPREAD,
            chroma: REFERENCE_CHROMA,
            warmth: 0.0,
            tint_bias: 0.0,
            shadow_floor: 0.0,
            corner_darkening: 0.0,
            detail: 0.0,
        }
    }
}

impl StyleProfile {
    /// The parameter set that would roughly reproduce this look on a neutral photo.
    pub fn target(&self) -> FilterParameters {
        let temperature_per_unit = 2.0 * TEMPERATURE_SCALE / 100.0;
        let tint_per_unit = (TINT_RB_SCALE + TINT_G_SCALE) / 100.0;

        let targets = [
            (Param::Brightness, 1.0 + (self.mean_luma - 128.0) / 256.0),
            (Param::Contrast, self.luma_spread / REFERENCE_SPREAD),
            (Param::Saturation, self.chroma / REFERENCE_CHROMA),
            (Param::Temperature, self.warmth / temperature_per_unit),
            (Param::Tint, self.tint_bias / tint_per_unit),
            (Param::Grain, (self.detail - NATURAL_DETAIL) * 3.0),
            (Param::Vignette, self.corner_darkening),
            (Param::Fade, (self.shadow_floor - 5.0) / 60.0),
        ];

        targets
            .into_iter()
            .fold(FilterParameters::default(), |params, (param, value)| {
                params.with(param, value as f64)
            })
    }
}

pub fn analyze_reference(image: &RgbaImage) -> StyleProfile {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return StyleProfile::default();
    }

    let count = (width as f64) * (height as f64);
    let mut sum = [0f64; 3];
    let mut luma_sum = 0f64;
    let mut luma_sq_sum = 0f64;
    let mut chroma_sum = 0f64;
    let mut histogram = [0u64; 256];

    for px in image.pixels() {
        let rgb = [px[0] as f32, px[1] as f32, px[2] as f32];
        let y = luminance(rgb);

        for (acc, c) in sum.iter_mut().zip(rgb) {
            *acc += c as f64;
        }
        luma_sum += y as f64;
        luma_sq_sum += (y as f64) * (y as f64);
        chroma_sum += rgb.iter().map(|c| (c - y).abs() as f64).sum::<f64>() / 3.0;
        histogram[y.round().clamp(0.0, 255.0) as usize] += 1;
    }

    let mean = sum.map(|s| s / count);
    let mean_luma = luma_sum / count;
    let variance = (luma_sq_sum / count - mean_luma * mean_luma).max(0.0);

    StyleProfile {
        mean_luma: mean_luma as f32,
        luma_spread: variance.sqrt() as f32,
        chroma: (chroma_sum / count) as f32,
        warmth: (mean[0] - mean[2]) as f32,
        tint_bias: ((mean[0] + mean[2]) / 2.0 - mean[1]) as f32,
        shadow_floor: percentile(&histogram, count, 0.05),
        corner_darkening: corner_darkening(image),
        detail: detail(image),
    }
}

/// Move `current` toward the look of `profile`, keeping its name.
pub fn match_style(current: &FilterParameters, profile: &StyleProfile) -> FilterParameters {
    let target = profile.target();

    Param::ALL.into_iter().fold(current.clone(), |params, param| {
        let from = current.get(param);
        let to = target.get(param);
        params.with(param, (from + (to - from) * MATCH_STRENGTH) as f64)
    })
}

fn percentile(histogram: &[u64; 256], count: f64, fraction: f64) -> f32 {
    let wanted = (count * fraction).ceil().max(1.0) as u64;
    let mut seen = 0;

    for (value, n) in histogram.iter().enumerate() {
        seen += n;
        if seen >= wanted {
            return value as f32;
        }
    }

    255.0
}

fn mean_luma_in(image: &RgbaImage, x0: u32, y0: u32, w: u32, h: u32) -> f32 {
    let mut total = 0f64;
    let mut n = 0u64;

    for y in y0..(y0 + h).min(image.height()) {
        for x in x0..(x0 + w).min(image.width()) {
            let px = image.get_pixel(x, y);
            total += luminance([px[0] as f32, px[1] as f32, px[2] as f32]) as f64;
            n += 1;
        }
    }

    if n == 0 { 0.0 } else { (total / n as f64) as f32 }
}

fn corner_darkening(image: &RgbaImage) -> f32 {
    let (width, height) = image.dimensions();
    let (cw, ch) = ((width / 8).max(1), (height / 8).max(1));

    let centre = mean_luma_in(image, width / 3, height / 3, (width / 3).max(1), (height / 3).max(1));
    if centre <= 0.0 {
        return 0.0;
    }

    let corners = [
        (0, 0),
        (width.saturating_sub(cw), 0),
        (0, height.saturating_sub(ch)),
        (width.saturating_sub(cw), height.saturating_sub(ch)),
    ];
    let corner = corners
        .iter()
        .map(|&(x, y)| mean_luma_in(image, x, y, cw, ch))
        .sum::<f32>()
        / 4.0;

    (1.0 - corner / centre).clamp(0.0, 1.0)
}

fn detail(image: &RgbaImage) -> f32 {
    if image.width() < 2 {
        return 0.0;
    }

    let mut total = 0f64;
    let mut n = 0u64;

    for row in image.rows() {
        let lumas: Vec<f32> = row
            .map(|px| luminance([px[0] as f32, px[1] as f32, px[2] as f32]))
            .collect();

        for pair in lumas.windows(2) {
            total += (pair[1] - pair[0]).abs() as f64;
            n += 1;
        }
    }

    (total / n.max(1) as f64 / 255.0) as f32
}
