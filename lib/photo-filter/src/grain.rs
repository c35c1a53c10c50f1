use crate::Effect;
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use rand::Rng;
use rayon::prelude::*;

/// Side length of the tile reused across live frames.
pub const LIVE_TILE_SIZE: u32 = 256;

/// Overlay blend mode on normalized values.
#[inline]
pub fn overlay_blend(base: f32, blend: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * blend
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - blend)
    }
}

/// Luminance noise in `[0, 1]`, repeated when smaller than the target image.
#[derive(Debug, Clone)]
pub struct GrainTexture {
    width: u32,
    height: u32,
    noise: Vec<f32>,
}

impl GrainTexture {
    pub fn random<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let noise = (0..width as usize * height as usize)
            .map(|_| rng.random::<f32>())
            .collect();

        Self {
            width,
            height,
            noise,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        let (x, y) = (x % self.width, y % self.height);
        self.noise[(y * self.width + x) as usize]
    }

    /// Overlay the texture onto `image`, mixed back with weight `intensity`.
    pub fn overlay(&self, image: &mut RgbaImage, intensity: f32) {
        let stride = image.width() as usize * 4;
        if intensity <= 0.0 || stride == 0 {
            return;
        }

        let pixels: &mut [u8] = &mut *image;
        pixels
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let noise = self.sample(x as u32, y as u32);
                    for c in px.iter_mut().take(3) {
                        let base = *c as f32 / 255.0;
                        let blended = overlay_blend(base, noise);
                        let mixed = base + (blended - base) * intensity;
                        *c = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
                    }
                }
            });
    }
}

/// Grain with a freshly randomized full-size texture on every call.
#[derive(Debug, Clone, Copy, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct GrainConfig {
    #[derivative(Default(value = "0.0"))]
    pub intensity: f32,
}

impl GrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_with_rng<R: Rng + ?Sized>(&self, image: &mut RgbaImage, rng: &mut R) {
        if self.is_neutral() {
            return;
        }

        GrainTexture::random(image.width(), image.height(), rng).overlay(image, self.intensity);
    }
}

impl Effect for GrainConfig {
    fn apply(&self, image: &mut RgbaImage) {
        self.apply_with_rng(image, &mut rand::rng());
    }

    fn is_neutral(&self) -> bool {
        self.intensity <= 0.0
    }
}
