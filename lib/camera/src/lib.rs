//! Camera input for live filtering, backed by nokhwa.

pub mod camera_client;
pub mod camera_info;
pub mod camera_source;

pub use camera_client::{CameraClient, CameraConfig, PixelFormat};
pub use camera_info::{CameraInfo, query_available_cameras, query_camera_id};
pub use camera_source::CameraSource;
pub use image::{Rgba, RgbaImage};

pub type CameraResult<T> = Result<T, CameraError>;

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("Failed to query cameras: {0}")]
    QueryError(String),

    #[error("Failed to initialize camera: {0}")]
    InitializationError(String),

    #[error("Failed to start camera: {0}")]
    StartError(String),

    #[error("Failed to stop camera: {0}")]
    StopError(String),

    #[error("No frame available")]
    NoFrameAvailable,

    #[error("No camera found")]
    NoCamera,

    #[error("Image error: {0}")]
    ImageLibraryError(#[from] image::ImageError),

    #[error("Camera error: {0}")]
    NokhwaError(#[from] nokhwa::NokhwaError),
}

pub fn init() {
    #[cfg(target_os = "macos")]
    nokhwa::nokhwa_initialize(|granted| {
        log::info!("User said {} for nokhwa", granted);
    });
}

pub fn rgb_to_rgba(rgb_image: &image::RgbImage) -> RgbaImage {
    RgbaImage::from_fn(rgb_image.width(), rgb_image.height(), |x, y| {
        let [r, g, b] = rgb_image.get_pixel(x, y).0;
        Rgba([r, g, b, 255])
    })
}
