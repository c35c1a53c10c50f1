use crate::{CameraError, CameraResult};
use nokhwa::{
    CallbackCamera, query,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
};
use std::fmt;

#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: String,
    pub name: String,
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// Cameras that can actually open a stream.
pub fn query_available_cameras() -> Vec<CameraInfo> {
    let cameras = match query(ApiBackend::Auto) {
        Ok(cameras) => cameras,
        Err(e) => {
            log::warn!("query cameras failed: {e}");
            return Vec::new();
        }
    };

    cameras
        .into_iter()
        .filter(|camera| verify_camera(camera.index().clone()))
        .map(|camera| CameraInfo {
            index: camera.index().to_string(),
            name: camera.human_name(),
            description: camera.description().to_string(),
        })
        .collect()
}

/// Index of the camera named `name`, or of the first working camera when
/// `name` is empty.
pub fn query_camera_id(name: &str) -> CameraResult<CameraIndex> {
    let cameras = query(ApiBackend::Auto)?;
    let name = name.trim();

    cameras
        .into_iter()
        .filter(|camera| name.is_empty() || name == camera.human_name())
        .find(|camera| verify_camera(camera.index().clone()))
        .map(|camera| camera.index().clone())
        .ok_or_else(|| {
            if name.is_empty() {
                CameraError::NoCamera
            } else {
                CameraError::QueryError(format!("No found camera: {name}"))
            }
        })
}

fn verify_camera(index: CameraIndex) -> bool {
    let format = RequestedFormat::new::<nokhwa::pixel_format::RgbAFormat>(
        RequestedFormatType::AbsoluteHighestFrameRate,
    );

    match CallbackCamera::new(index, format, |_| {}) {
        Ok(mut camera) => match camera.open_stream() {
            Ok(_) => {
                _ = camera.stop_stream();
                true
            }
            Err(_) => false,
        },
        Err(_) => false,
    }
}
