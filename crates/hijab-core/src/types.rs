use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Predicted gender of an aligned face.
///
/// The classifier's class index maps onto this enum through a fixed table:
/// `0 => Male`, `1 => Female`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const CLASS_COUNT: usize = 2;

    /// Map a class index from the model output to a label.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Gender::Male),
            1 => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a labelling batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub image_path: String,
    pub image_name: String,
    pub face_number: u32,
    pub gender_prediction: Gender,
}

/// One row of the curated label spreadsheet. Columns other than
/// `image_name` are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelRow {
    pub image_name: String,
}
