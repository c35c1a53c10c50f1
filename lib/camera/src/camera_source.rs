use crate::{CameraClient, CameraConfig, CameraResult, camera_info::query_camera_id};
use photo_filter::{FrameSource, RgbaImage};

/// A camera as a live [`FrameSource`]. The device is only opened on `start`.
pub struct CameraSource {
    name: String,
    config: CameraConfig,
    client: Option<CameraClient>,
}

impl CameraSource {
    /// `name` selects a camera by its human name; empty picks the first one.
    pub fn new(name: impl Into<String>, config: CameraConfig) -> Self {
        Self {
            name: name.into(),
            config,
            client: None,
        }
    }

    fn open(&self) -> CameraResult<CameraClient> {
        let index = query_camera_id(&self.name)?;
        let mut client = CameraClient::new(index, &self.config)?;
        client.start()?;
        Ok(client)
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> String {
        if self.name.is_empty() {
            "default camera".to_string()
        } else {
            self.name.clone()
        }
    }

    fn start(&mut self) -> bool {
        if self.client.is_some() {
            return true;
        }

        match self.open() {
            Ok(client) => {
                self.client = Some(client);
                true
            }
            Err(e) => {
                log::warn!("open camera `{}` failed: {e}", self.name());
                false
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut client) = self.client.take()
            && let Err(e) = client.stop()
        {
            log::warn!("stop camera failed: {e}");
        }
    }

    fn current_frame(&mut self) -> Option<RgbaImage> {
        let client = self.client.as_ref()?;

        match client.last_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::debug!("camera frame unavailable: {e}");
                None
            }
        }
    }
}
