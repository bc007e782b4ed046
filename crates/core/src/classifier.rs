//! Classifier seam.
//!
//! The classifier is an external capability: it takes a pre-processed image tensor and the
//! metadata feature vector and returns one probability per diagnosis class. Adapters (for
//! example the TensorFlow Serving client in `derma-classifier`) implement [`Classifier`].
//!
//! The service keeps the active classifier in a [`ClassifierSlot`]. Replacing it swaps the
//! whole handle under a write lock; in-flight requests keep the `Arc` they already cloned.

use crate::constants::{IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH, METADATA_DIM};
use crate::ClassifierError;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Normalised RGB image in height x width x channel order, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    pub const SHAPE: [usize; 3] = [IMAGE_HEIGHT, IMAGE_WIDTH, IMAGE_CHANNELS];

    /// # Errors
    ///
    /// Returns [`ClassifierError::InvalidInput`] if `data` does not hold exactly
    /// `300 * 200 * 3` values.
    pub fn new(data: Vec<f32>) -> Result<Self, ClassifierError> {
        let expected = IMAGE_HEIGHT * IMAGE_WIDTH * IMAGE_CHANNELS;
        if data.len() != expected {
            return Err(ClassifierError::InvalidInput(format!(
                "image tensor has {} values, expected {expected}",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Pixel rows, each `width * channels` values long.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(IMAGE_WIDTH * IMAGE_CHANNELS)
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one image with its metadata features.
    ///
    /// Returns the raw probability vector; the service validates it before use.
    async fn classify(
        &self,
        image: &ImageTensor,
        metadata: &[f32; METADATA_DIM],
    ) -> Result<Vec<f64>, ClassifierError>;

    /// Short human-readable description, shown in model info.
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Holder for the active classifier.
#[derive(Default)]
pub struct ClassifierSlot {
    inner: RwLock<Option<Arc<dyn Classifier>>>,
}

impl ClassifierSlot {
    pub fn install(&self, classifier: Arc<dyn Classifier>) {
        // The slot only ever holds a complete value, so a poisoned lock is still usable.
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(classifier);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<Arc<dyn Classifier>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for ClassifierSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierSlot")
            .field("loaded", &self.current().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Classifier for Named {
        async fn classify(
            &self,
            _image: &ImageTensor,
            _metadata: &[f32; METADATA_DIM],
        ) -> Result<Vec<f64>, ClassifierError> {
            Ok(vec![])
        }

        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn tensor_rejects_wrong_size() {
        let err = ImageTensor::new(vec![0.0; 10]).expect_err("too small");
        assert!(matches!(err, ClassifierError::InvalidInput(msg) if msg.contains("expected 180000")));
    }

    #[test]
    fn tensor_rows_have_full_width() {
        let tensor = ImageTensor::new(vec![0.5; 300 * 200 * 3]).expect("valid");
        assert_eq!(tensor.rows().count(), 300);
        assert!(tensor.rows().all(|r| r.len() == 600));
    }

    #[test]
    fn slot_swaps_whole_classifier() {
        let slot = ClassifierSlot::default();
        assert!(slot.current().is_none());

        slot.install(Arc::new(Named("first")));
        let held = slot.current().expect("installed");
        slot.install(Arc::new(Named("second")));

        assert_eq!(held.describe(), "first");
        assert_eq!(slot.current().map(|c| c.describe()), Some("second".into()));

        slot.clear();
        assert!(slot.current().is_none());
    }
}
