//! Derma Imaging
//!
//! Upload validation and pre-processing for the triage classifier.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ─► sniff (infer) ─► decode ─► size check ─► RGB ─► resize 200x300 ─► scale to [0, 1]
//! ```
//!
//! The output is a [`derma_core::ImageTensor`] ready to hand to a classifier. Format
//! detection uses the file's magic bytes, never the client-supplied filename or content type.
//!
//! ## Example Usage
//!
//! ```no_run
//! use derma_imaging::ImagePreprocessor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("lesion.jpg")?;
//! let tensor = ImagePreprocessor::new(100).prepare(&bytes)?;
//! assert_eq!(tensor.data().len(), 300 * 200 * 3);
//! # Ok(())
//! # }
//! ```

mod preprocess;

pub use preprocess::{load_file, ImageInfo, ImagePreprocessor, MAX_UPLOAD_BYTES};

/// Errors that can occur while validating or pre-processing an image
#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    /// Upload contained no bytes
    #[error("image upload is empty")]
    Empty,

    /// Upload is larger than [`MAX_UPLOAD_BYTES`]
    #[error(
        "image upload is {0} bytes, larger than the {limit} byte limit",
        limit = MAX_UPLOAD_BYTES
    )]
    TooLarge(usize),

    /// Magic bytes did not match an accepted image format
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Bytes looked like an image but could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Decoded image is smaller than the configured minimum
    #[error("image is {width}x{height}, smaller than the {min}x{min} minimum")]
    TooSmall { width: u32, height: u32, min: u32 },

    /// Resized tensor did not match the classifier input shape
    #[error("invalid image tensor: {0}")]
    Tensor(#[from] derma_core::ClassifierError),

    /// I/O error while reading an image file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results that can fail with an [`ImagingError`].
pub type ImagingResult<T> = Result<T, ImagingError>;
