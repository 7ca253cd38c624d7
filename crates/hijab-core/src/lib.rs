//! hijab-core — Building a labeled face dataset for hijab classification.
//!
//! Three batch stages share this crate: [`extractor`] detects and aligns
//! faces (SCRFD via ONNX Runtime), [`labeler`] predicts gender for a batch of
//! aligned faces, and [`materializer`] copies curated images into the
//! labeled-set folders.

pub mod alignment;
pub mod classifier;
pub mod detector;
pub mod extractor;
pub mod labeler;
pub mod layout;
pub mod materializer;
pub mod naming;
pub mod types;

#[cfg(test)]
mod test_support;

pub use classifier::{GenderClassifier, OnnxGenderClassifier};
pub use detector::{Detector, ScrfdDetector};
pub use layout::DatasetLayout;
pub use naming::FaceName;
pub use types::{BoundingBox, Gender, LabelRow, PredictionRecord};
