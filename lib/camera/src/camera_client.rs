use crate::{CameraError, CameraResult, rgb_to_rgba};
use derivative::Derivative;
use derive_setters::Setters;
use image::{RgbaImage, imageops};
use nokhwa::{
    CallbackCamera,
    pixel_format::{RgbAFormat, RgbFormat},
    utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    RGBA,
    RGB,
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct CameraConfig {
    #[derivative(Default(value = "None"))]
    #[setters[strip_option]]
    pub fps: Option<u32>,

    #[derivative(Default(value = "None"))]
    #[setters[strip_option]]
    pub width: Option<u32>,

    #[derivative(Default(value = "None"))]
    #[setters[strip_option]]
    pub height: Option<u32>,

    #[derivative(Default(value = "PixelFormat::RGBA"))]
    pub pixel_format: PixelFormat,

    /// Selfie-style preview.
    #[derivative(Default(value = "true"))]
    pub mirror_horizontal: bool,
}

pub struct CameraClient {
    camera: CallbackCamera,
    is_running: bool,
    pixel_format: PixelFormat,
    mirror_horizontal: bool,
}

impl CameraClient {
    pub fn new(camera_index: CameraIndex, config: &CameraConfig) -> CameraResult<Self> {
        let pixel_format = config.pixel_format;
        let format_type = RequestedFormatType::AbsoluteHighestFrameRate;
        let format = match pixel_format {
            PixelFormat::RGBA => RequestedFormat::new::<RgbAFormat>(format_type),
            PixelFormat::RGB => RequestedFormat::new::<RgbFormat>(format_type),
        };

        let mut camera = CallbackCamera::new(camera_index, format, move |_| {})
            .map_err(|e| CameraError::InitializationError(e.to_string()))?;

        if let Some(fps) = config.fps
            && let Err(e) = camera.set_frame_rate(fps)
        {
            log::warn!("camera set frame rate ({fps}) failed: {e}");
        }

        if let Some(w) = config.width
            && let Some(h) = config.height
            && let Err(e) = camera.set_resolution(Resolution::new(w, h))
        {
            log::warn!("camera set resolution ({w} x {h}) failed: {e}");
        }

        Ok(Self {
            camera,
            is_running: false,
            pixel_format,
            mirror_horizontal: config.mirror_horizontal,
        })
    }

    pub fn start(&mut self) -> CameraResult<()> {
        self.camera
            .open_stream()
            .map_err(|e| CameraError::StartError(e.to_string()))?;
        self.is_running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> CameraResult<()> {
        self.camera
            .stop_stream()
            .map_err(|e| CameraError::StopError(e.to_string()))?;
        self.is_running = false;
        Ok(())
    }

    pub fn last_frame(&self) -> CameraResult<RgbaImage> {
        let buffer = self.camera.last_frame()?;

        let mut frame = match self.pixel_format {
            PixelFormat::RGBA => buffer.decode_image::<RgbAFormat>()?,
            PixelFormat::RGB => rgb_to_rgba(
                &buffer
                    .decode_image::<RgbFormat>()
                    .map_err(|_| CameraError::NoFrameAvailable)?,
            ),
        };

        if frame.is_empty() {
            return Err(CameraError::NoFrameAvailable);
        }

        if self.mirror_horizontal {
            imageops::flip_horizontal_in_place(&mut frame);
        }

        Ok(frame)
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }
}

impl Drop for CameraClient {
    fn drop(&mut self) {
        if self.is_running() {
            _ = self.stop();
        }
    }
}
