//! Stage 1: detect and align every face in the source images.
//!
//! Best-effort: a failure on one image is logged and the run moves on.

use crate::alignment;
use crate::detector::{Detector, DetectorError};
use crate::layout::DatasetLayout;
use crate::naming::FaceName;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Log progress every this many images.
const PROGRESS_EVERY: usize = 500;

/// Errors that abort the whole extraction run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot list source images in {path}: {source}")]
    ListSources {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors for a single source image. Logged, never propagated.
#[derive(Error, Debug)]
enum ImageError {
    #[error("decode: {0}")]
    Decode(#[source] image::ImageError),
    #[error("detect: {0}")]
    Detect(#[from] DetectorError),
    #[error("face {0} has no landmarks")]
    NoLandmarks(u32),
    #[error("source file name is not valid UTF-8")]
    BadFileName,
    #[error("save {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Outcome of an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Source images visited.
    pub images: usize,
    /// Source images that hit an error.
    pub failed: usize,
    /// Aligned faces written.
    pub faces: usize,
}

/// Extract aligned `face_size × face_size` faces for every source image in
/// `layout`, writing `<source_id>_<i>.png` into the aligned-faces directory.
///
/// Existing files with the same names are overwritten.
pub fn extract_faces(
    layout: &DatasetLayout,
    detector: &mut dyn Detector,
    face_size: u32,
) -> Result<ExtractReport, ExtractError> {
    let out_dir = layout.aligned_faces_dir();
    std::fs::create_dir_all(&out_dir).map_err(|source| ExtractError::CreateOutputDir {
        path: out_dir.clone(),
        source,
    })?;

    let sources = layout
        .list_source_images()
        .map_err(|source| ExtractError::ListSources {
            path: layout.root().to_path_buf(),
            source,
        })?;
    let total = sources.len();
    tracing::info!(total, dir = %layout.root().display(), "extracting faces");

    let mut report = ExtractReport::default();

    for (done, path) in sources.iter().enumerate() {
        report.images += 1;
        match process_image(path, layout, detector, face_size) {
            Ok(faces) => report.faces += faces,
            Err(e) => {
                report.failed += 1;
                tracing::error!(path = %path.display(), error = %e, "error with image");
            }
        }

        if (done + 1) % PROGRESS_EVERY == 0 {
            tracing::info!(done = done + 1, total, faces = report.faces, "extraction progress");
        }
    }

    tracing::info!(
        images = report.images,
        failed = report.failed,
        faces = report.faces,
        "extraction finished"
    );
    Ok(report)
}

/// Detect, align and save every face of one image. Returns the face count.
fn process_image(
    path: &Path,
    layout: &DatasetLayout,
    detector: &mut dyn Detector,
    face_size: u32,
) -> Result<usize, ImageError> {
    let image_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or(ImageError::BadFileName)?;

    let image = image::open(path).map_err(ImageError::Decode)?.to_rgb8();
    let faces = detector.detect(&image)?;

    for (i, face) in (0u32..).zip(&faces) {
        let landmarks = face.landmarks.as_ref().ok_or(ImageError::NoLandmarks(i))?;
        let aligned = alignment::align_face(&image, landmarks, face_size);

        let out_path = layout.aligned_face(&FaceName::new(image_name, i));
        aligned
            .save(&out_path)
            .map_err(|source| ImageError::Save { path: out_path, source })?;
    }

    tracing::debug!(path = %path.display(), faces = faces.len(), "image processed");
    Ok(faces.len())
}
