//! Stage 3: copy every accepted image and its first aligned face into the
//! labeled-set folders.

use crate::layout::DatasetLayout;
use crate::naming::FaceName;
use crate::types::LabelRow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("cannot read label file {path}: {source}")]
    ReadLabels { path: PathBuf, source: csv::Error },
    #[error("cannot create output directory {path}: {source}")]
    CreateOutputDir { path: PathBuf, source: io::Error },
}

/// Outcome of a materialize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Names whose image and face were both copied.
    pub copied: usize,
    /// Names where either copy failed.
    pub failed: usize,
}

/// Read the `image_name` column of a label spreadsheet.
pub fn read_labels(path: &Path) -> Result<Vec<LabelRow>, MaterializeError> {
    let err = |source| MaterializeError::ReadLabels {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<LabelRow>, _>>()
        .map_err(err)
}

/// For every labeled name, copy `<name>.jpg` into `hijab-images/` and
/// `aligned-faces/<name>_0.png` into `hijab-faces/<name>.png`.
///
/// A failing name is logged and skipped; a source copy that succeeded before
/// the face copy failed is left in place.
pub fn materialize(
    layout: &DatasetLayout,
    labels_path: &Path,
) -> Result<MaterializeReport, MaterializeError> {
    let labels = read_labels(labels_path)?;

    for dir in [layout.labeled_images_dir(), layout.labeled_faces_dir()] {
        fs::create_dir_all(&dir)
            .map_err(|source| MaterializeError::CreateOutputDir { path: dir.clone(), source })?;
    }

    tracing::info!(labels = labels.len(), path = %labels_path.display(), "materializing labeled set");

    let mut report = MaterializeReport::default();
    for LabelRow { image_name } in &labels {
        match copy_one(layout, image_name) {
            Ok(()) => report.copied += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!("ERROR: {image_name} -- {e}");
            }
        }
    }

    tracing::info!(copied = report.copied, failed = report.failed, "materialize finished");
    Ok(report)
}

fn copy_one(layout: &DatasetLayout, image_name: &str) -> io::Result<()> {
    let image_src = layout.source_image(image_name);
    let image_dst = layout.labeled_images_dir().join(format!("{image_name}.jpg"));
    copy_file(&image_src, &image_dst)?;

    let face_src = layout.aligned_face(&FaceName::new(image_name, 0));
    let face_dst = layout.labeled_faces_dir().join(format!("{image_name}.png"));
    copy_file(&face_src, &face_dst)
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", from.display())))
}
