//! Temporal noise reduction for live streams.

use image::RgbaImage;
use rayon::prelude::*;

/// Per-channel difference below which a pixel counts as sensor noise.
pub const NOISE_THRESHOLD: u8 = 30;

/// Weight of the previous frame in a blended pixel.
pub const PREVIOUS_WEIGHT: f32 = 0.15;

/// Blends still pixels with the previous frame and passes moving ones through.
///
/// Holds exactly one previous-frame slot. Call [`TemporalSmoother::reset`]
/// whenever the frame source changes so unrelated streams are never mixed.
#[derive(Debug, Default)]
pub struct TemporalSmoother {
    previous: Option<RgbaImage>,
}

impl TemporalSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn reset(&mut self) {
        if self.previous.take().is_some() {
            log::debug!("temporal smoother reset");
        }
    }

    pub fn apply(&mut self, frame: &mut RgbaImage) {
        if let Some(previous) = self
            .previous
            .as_mut()
            .filter(|p| p.dimensions() == frame.dimensions())
        {
            blend_still_pixels(frame, previous);
            let dst: &mut [u8] = &mut *previous;
            dst.copy_from_slice(frame.as_raw());
            return;
        }

        self.previous = Some(frame.clone());
    }
}

#[inline]
fn is_still(current: &[u8], previous: &[u8]) -> bool {
    current
        .iter()
        .zip(previous)
        .take(3)
        .all(|(c, p)| c.abs_diff(*p) < NOISE_THRESHOLD)
}

fn blend_still_pixels(frame: &mut RgbaImage, previous: &RgbaImage) {
    let stride = frame.width() as usize * 4;
    if stride == 0 {
        return;
    }

    let current: &mut [u8] = &mut *frame;
    current
        .par_chunks_mut(stride)
        .zip(previous.as_raw().par_chunks(stride))
        .for_each(|(row, prev_row)| {
            for (c, p) in row.chunks_exact_mut(4).zip(prev_row.chunks_exact(4)) {
                if !is_still(c, p) {
                    continue;
                }

                for i in 0..3 {
                    let v = p[i] as f32 * PREVIOUS_WEIGHT + c[i] as f32 * (1.0 - PREVIOUS_WEIGHT);
                    c[i] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}
