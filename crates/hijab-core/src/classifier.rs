//! Gender classification of aligned faces.
//!
//! [`GenderClassifier`] returns raw two-class scores; [`predict`] turns a
//! score pair into a [`Gender`]. [`OnnxGenderClassifier`] runs an ONNX export
//! of the Keras gender model via ONNX Runtime.

use crate::types::Gender;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Side length the gender model expects.
pub const GENDER_INPUT_SIZE: u32 = 200;
/// Images per `session.run` call.
const INFERENCE_CHUNK: usize = 32;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("expected {expected}x{expected} input, got {width}x{height}")]
    BadInputSize { expected: u32, width: u32, height: u32 },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Something that scores face images as `[male, female]`.
///
/// Must return exactly one score pair per input image, in input order.
pub trait GenderClassifier {
    fn scores(&mut self, faces: &[RgbImage]) -> Result<Vec<[f32; 2]>, ClassifierError>;
}

/// Arg-max over the two class scores, mapped through the fixed index table.
/// Ties go to the lower index.
pub fn predict(scores: &[f32; 2]) -> Gender {
    if scores[1] > scores[0] {
        Gender::Female
    } else {
        Gender::Male
    }
}

/// Two-class Keras gender model exported to ONNX.
///
/// Input is NHWC float32 with raw 0–255 pixel values; output is `[N, 2]`.
pub struct OnnxGenderClassifier {
    session: Session,
}

impl OnnxGenderClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded gender model"
        );

        Ok(Self { session })
    }

    fn preprocess(faces: &[RgbImage]) -> Result<Array4<f32>, ClassifierError> {
        let size = GENDER_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((faces.len(), size, size, 3));

        for (n, face) in faces.iter().enumerate() {
            let (width, height) = face.dimensions();
            if width != GENDER_INPUT_SIZE || height != GENDER_INPUT_SIZE {
                return Err(ClassifierError::BadInputSize {
                    expected: GENDER_INPUT_SIZE,
                    width,
                    height,
                });
            }
            for (x, y, pixel) in face.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[n, y as usize, x as usize, c]] = pixel[c] as f32;
                }
            }
        }

        Ok(tensor)
    }
}

impl GenderClassifier for OnnxGenderClassifier {
    fn scores(&mut self, faces: &[RgbImage]) -> Result<Vec<[f32; 2]>, ClassifierError> {
        let mut all = Vec::with_capacity(faces.len());

        for chunk in faces.chunks(INFERENCE_CHUNK) {
            let input = Self::preprocess(chunk)?;
            let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

            let (_, raw) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::InferenceFailed(format!("gender scores: {e}")))?;

            if raw.len() != chunk.len() * Gender::CLASS_COUNT {
                return Err(ClassifierError::InferenceFailed(format!(
                    "expected {} scores for {} faces, got {}",
                    chunk.len() * Gender::CLASS_COUNT,
                    chunk.len(),
                    raw.len()
                )));
            }

            all.extend(raw.chunks_exact(Gender::CLASS_COUNT).map(|s| [s[0], s[1]]));
            tracing::debug!(done = all.len(), total = faces.len(), "gender inference");
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_predict_argmax() {
        assert_eq!(predict(&[0.9, 0.1]), Gender::Male);
        assert_eq!(predict(&[0.2, 0.8]), Gender::Female);
    }

    #[test]
    fn test_predict_tie_goes_to_first_class() {
        assert_eq!(predict(&[0.5, 0.5]), Gender::Male);
    }

    #[test]
    fn test_preprocess_nhwc_raw_pixels() {
        let mut face = RgbImage::from_pixel(GENDER_INPUT_SIZE, GENDER_INPUT_SIZE, Rgb([10, 20, 30]));
        face.put_pixel(5, 7, Rgb([255, 0, 128]));
        let tensor = OnnxGenderClassifier::preprocess(&[face.clone(), face]).unwrap();

        let size = GENDER_INPUT_SIZE as usize;
        assert_eq!(tensor.shape(), &[2, size, size, 3]);
        assert_eq!(tensor[[0, 0, 0, 0]], 10.0);
        assert_eq!(tensor[[0, 0, 0, 2]], 30.0);
        assert_eq!(tensor[[1, 7, 5, 0]], 255.0);
        assert_eq!(tensor[[1, 7, 5, 2]], 128.0);
    }

    #[test]
    fn test_preprocess_rejects_wrong_size() {
        let face = RgbImage::new(100, 200);
        let err = OnnxGenderClassifier::preprocess(&[face]).unwrap_err();
        assert!(matches!(err, ClassifierError::BadInputSize { width: 100, .. }));
    }

    #[test]
    fn test_load_missing_model() {
        let err = OnnxGenderClassifier::load(Path::new("/nonexistent/gender.onnx")).err().unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }
}
