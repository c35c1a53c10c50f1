use crate::{
    PhotoFilterResult, naming::slugify, params::FilterParameters, pipeline::apply_filter,
};
use image::{ExtendedColorType, RgbImage, RgbaImage, buffer::ConvertBuffer, codecs::jpeg::JpegEncoder};
use std::path::Path;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> PhotoFilterResult<Vec<u8>> {
    let rgb: RgbImage = image.convert();
    let mut bytes = Vec::new();

    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;

    Ok(bytes)
}

/// Filter a private copy of `image` in still mode and encode it.
pub fn export_still(
    image: &RgbaImage,
    params: &FilterParameters,
    quality: u8,
) -> PhotoFilterResult<Vec<u8>> {
    let mut still = image.clone();
    apply_filter(&mut still, params);
    encode_jpeg(&still, quality)
}

pub fn load_image(path: impl AsRef<Path>) -> PhotoFilterResult<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

pub fn write_jpeg(path: impl AsRef<Path>, jpeg: &[u8]) -> PhotoFilterResult<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    std::fs::write(path, jpeg)?;
    log::debug!("wrote {} bytes to {}", jpeg.len(), path.display());
    Ok(())
}

/// `<slug>-<timestamp>.jpg`
pub fn capture_file_name(filter_name: &str) -> String {
    format!(
        "{}-{}.jpg",
        slugify(filter_name),
        chrono::Local::now().format("%Y%m%d-%H%M%S-%3f")
    )
}
