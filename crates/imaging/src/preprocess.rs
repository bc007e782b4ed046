//! Image validation and conversion into classifier input.

use crate::{ImagingError, ImagingResult};
use derma_core::config::CoreConfig;
use derma_core::constants::{IMAGE_HEIGHT, IMAGE_WIDTH};
use derma_core::ImageTensor;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;
use std::path::Path;

/// Upload formats accepted, keyed by the MIME type detected from magic bytes.
const ACCEPTED_FORMATS: [(&str, ImageFormat); 3] = [
    ("image/jpeg", ImageFormat::Jpeg),
    ("image/png", ImageFormat::Png),
    ("image/bmp", ImageFormat::Bmp),
];

/// Largest upload accepted, in bytes (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Basic facts about a decoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

/// Validates uploads and converts them into [`ImageTensor`]s.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    min_side: u32,
}

impl ImagePreprocessor {
    /// `min_side` is the smallest width and height accepted, in pixels.
    pub fn new(min_side: u32) -> Self {
        Self { min_side }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.min_image_side())
    }

    /// Detect the format and dimensions of an upload without producing a tensor.
    pub fn info(&self, bytes: &[u8]) -> ImagingResult<ImageInfo> {
        let (_, info) = self.decode(bytes)?;
        Ok(info)
    }

    /// Validate, decode and convert an upload into classifier input.
    ///
    /// Greyscale images are expanded to three channels and alpha is dropped. The image is
    /// resized to 200x300 (width x height) with a bicubic filter and scaled to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ImagingError`] if the upload is empty, too large, not an accepted format,
    /// cannot be decoded, or is smaller than the configured minimum.
    pub fn prepare(&self, bytes: &[u8]) -> ImagingResult<ImageTensor> {
        let (img, info) = self.decode(bytes)?;
        tracing::debug!(
            width = info.width,
            height = info.height,
            mime = %info.mime_type,
            "pre-processing image"
        );
        to_tensor(&img)
    }

    fn decode(&self, bytes: &[u8]) -> ImagingResult<(DynamicImage, ImageInfo)> {
        let (mime_type, format) = sniff(bytes)?;
        let img = image::load_from_memory_with_format(bytes, format)?;

        let (width, height) = img.dimensions();
        if width < self.min_side || height < self.min_side {
            return Err(ImagingError::TooSmall {
                width,
                height,
                min: self.min_side,
            });
        }

        Ok((
            img,
            ImageInfo {
                width,
                height,
                mime_type: mime_type.to_string(),
            },
        ))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}

/// Read an image file from disk, applying the same size limit as uploads.
pub fn load_file(path: &Path) -> ImagingResult<Vec<u8>> {
    let len = std::fs::metadata(path)?.len();
    if len > MAX_UPLOAD_BYTES as u64 {
        return Err(ImagingError::TooLarge(
            usize::try_from(len).unwrap_or(usize::MAX),
        ));
    }
    Ok(std::fs::read(path)?)
}

fn sniff(bytes: &[u8]) -> ImagingResult<(&'static str, ImageFormat)> {
    if bytes.is_empty() {
        return Err(ImagingError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImagingError::TooLarge(bytes.len()));
    }

    let mime_type = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .ok_or_else(|| ImagingError::UnsupportedFormat("unrecognised content".into()))?;

    ACCEPTED_FORMATS
        .iter()
        .find(|(accepted, _)| *accepted == mime_type)
        .map(|(_, format)| (mime_type, *format))
        .ok_or_else(|| ImagingError::UnsupportedFormat(mime_type.to_string()))
}

fn to_tensor(img: &DynamicImage) -> ImagingResult<ImageTensor> {
    let rgb = img.to_rgb8();
    let resized = imageops::resize(
        &rgb,
        IMAGE_WIDTH as u32,
        IMAGE_HEIGHT as u32,
        FilterType::CatmullRom,
    );

    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 255.0)
        .collect();

    Ok(ImageTensor::new(data)?)
}
