use crate::Effect;
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use rayon::prelude::*;

/// Radial black overlay centred on the image.
///
/// Radii are fractions of the larger half-dimension. Inside `inner_ratio` the
/// overlay is transparent, beyond `outer_ratio` its alpha equals `intensity`,
/// and in between it ramps linearly.
#[derive(Debug, Clone, Copy, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct VignetteConfig {
    #[derivative(Default(value = "0.0"))]
    pub intensity: f32,

    #[derivative(Default(value = "0.3"))]
    pub inner_ratio: f32,

    #[derivative(Default(value = "1.0"))]
    pub outer_ratio: f32,
}

impl VignetteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay alpha at pixel `(x, y)`, sampled at the pixel centre.
    pub fn alpha_at(&self, x: u32, y: u32, width: u32, height: u32) -> f32 {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let radius = cx.max(cy);
        let inner = radius * self.inner_ratio;
        let outer = radius * self.outer_ratio;

        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let distance = (dx * dx + dy * dy).sqrt();

        let t = if outer <= inner {
            if distance >= outer { 1.0 } else { 0.0 }
        } else {
            ((distance - inner) / (outer - inner)).clamp(0.0, 1.0)
        };

        t * self.intensity
    }

    pub fn mask(&self, width: u32, height: u32) -> VignetteMask {
        let alpha = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| self.alpha_at(x, y, width, height))
            .collect();

        VignetteMask {
            width,
            height,
            config: *self,
            alpha,
        }
    }
}

impl Effect for VignetteConfig {
    fn apply(&self, image: &mut RgbaImage) {
        if self.is_neutral() {
            return;
        }

        self.mask(image.width(), image.height()).composite(image);
    }

    fn is_neutral(&self) -> bool {
        self.intensity <= 0.0
    }
}

/// Precomputed overlay alpha for one frame size; reused across live frames.
#[derive(Debug, Clone)]
pub struct VignetteMask {
    width: u32,
    height: u32,
    config: VignetteConfig,
    alpha: Vec<f32>,
}

impl VignetteMask {
    pub fn fits(&self, width: u32, height: u32, config: &VignetteConfig) -> bool {
        self.width == width && self.height == height && self.config == *config
    }

    /// Source-over composite of the black layer onto `image`.
    pub fn composite(&self, image: &mut RgbaImage) {
        if image.dimensions() != (self.width, self.height) || self.width == 0 {
            log::warn!(
                "vignette mask {}x{} does not fit image {}x{}",
                self.width,
                self.height,
                image.width(),
                image.height()
            );
            return;
        }

        let stride = self.width as usize * 4;
        let pixels: &mut [u8] = &mut *image;

        pixels
            .par_chunks_mut(stride)
            .zip(self.alpha.par_chunks(self.width as usize))
            .for_each(|(row, alphas)| {
                for (px, &a) in row.chunks_exact_mut(4).zip(alphas) {
                    if a <= 0.0 {
                        continue;
                    }
                    over_black(px, a);
                }
            });
    }
}

#[inline]
fn over_black(px: &mut [u8], a: f32) {
    let da = px[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    if out_a <= 0.0 {
        return;
    }

    let keep = da * (1.0 - a) / out_a;
    for c in px.iter_mut().take(3) {
        *c = (*c as f32 * keep).round().clamp(0.0, 255.0) as u8;
    }
    px[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
