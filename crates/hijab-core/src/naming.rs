//! Aligned-face file naming: `<image_name>_<face_number>.png`.

use std::path::Path;
use thiserror::Error;

pub const ALIGNED_FACE_EXTENSION: &str = "png";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NamingError {
    #[error("path has no usable file name: {0}")]
    NoFileName(String),
    #[error("aligned face name has no face index separator: {0}")]
    MissingSeparator(String),
    #[error("aligned face name has an empty image name: {0}")]
    EmptyImageName(String),
    #[error("aligned face name has a non-numeric face index: {0}")]
    BadFaceNumber(String),
}

/// Identity of an aligned face: the source image it came from and its
/// zero-based position among the faces detected in that image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceName {
    pub image_name: String,
    pub face_number: u32,
}

impl FaceName {
    pub fn new(image_name: impl Into<String>, face_number: u32) -> Self {
        Self {
            image_name: image_name.into(),
            face_number,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{ALIGNED_FACE_EXTENSION}",
            self.image_name, self.face_number
        )
    }

    /// Parse an aligned-face file name.
    ///
    /// The image name is everything before the last `_`; the face number is
    /// the text after it up to the first `.`. Source names may themselves
    /// contain underscores.
    pub fn parse(file_name: &str) -> Result<Self, NamingError> {
        let (image_name, tail) = file_name
            .rsplit_once('_')
            .ok_or_else(|| NamingError::MissingSeparator(file_name.to_string()))?;

        if image_name.is_empty() {
            return Err(NamingError::EmptyImageName(file_name.to_string()));
        }

        let digits = tail.split('.').next().unwrap_or_default();
        let face_number = digits
            .parse::<u32>()
            .map_err(|_| NamingError::BadFaceNumber(file_name.to_string()))?;

        Ok(Self::new(image_name, face_number))
    }

    pub fn from_path(path: &Path) -> Result<Self, NamingError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| NamingError::NoFileName(path.display().to_string()))?;
        Self::parse(file_name)
    }
}
