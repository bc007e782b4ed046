//! Classifier adapters.
//!
//! The triage core only sees the [`derma_core::Classifier`] trait. This crate provides the
//! production implementation, a client for a TensorFlow Serving model server exposing the
//! two-input (image + metadata) skin lesion model.

pub mod tf_serving;

pub use tf_serving::{TfServingClassifier, DEFAULT_IMAGE_INPUT, DEFAULT_META_INPUT};
