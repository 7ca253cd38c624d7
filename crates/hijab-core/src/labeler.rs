//! Stage 2: predict gender for one fixed-size batch of aligned faces.
//!
//! Fail-fast: the first unreadable image, malformed name or model error
//! aborts the batch, and nothing is written.

use crate::classifier::{predict, ClassifierError, GenderClassifier, GENDER_INPUT_SIZE};
use crate::layout::DatasetLayout;
use crate::naming::{FaceName, NamingError};
use crate::types::PredictionRecord;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Faces per labelling batch.
pub const DEFAULT_BATCH_SIZE: usize = 34_000;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("batch {batch} with size {size} overflows the index range")]
    BatchOverflow { batch: usize, size: usize },
    #[error("cannot list aligned faces: {0}")]
    ListFaces(#[source] std::io::Error),
    #[error("bad aligned face name: {0}")]
    Naming(#[from] NamingError),
    #[error("cannot load {path}: {source}")]
    LoadImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("classifier returned {got} score pairs for {expected} faces")]
    ScoreCount { expected: usize, got: usize },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
}

/// Contiguous index range `[start, end)` selected by a batch number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    /// `start = batch * size`, `end = start + size`.
    pub fn for_batch(batch: usize, size: usize) -> Result<Self, LabelError> {
        let overflow = || LabelError::BatchOverflow { batch, size };
        let start = batch.checked_mul(size).ok_or_else(overflow)?;
        let end = start.checked_add(size).ok_or_else(overflow)?;
        Ok(Self { start, end })
    }

    /// The part of `items` this range covers; shorter or empty past the end.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start.min(items.len());
        let end = self.end.min(items.len());
        &items[start..end]
    }

    /// Output file name, built from the computed (unclipped) bounds.
    pub fn output_file_name(&self) -> String {
        format!("raw_hijab_labelling_{}-{}.csv", self.start, self.end)
    }
}

/// Classify the faces in `range` of the sorted aligned-face list and write
/// `raw_hijab_labelling_<start>-<end>.csv` into `output_dir`.
///
/// The CSV is written once, after every face is classified, and replaces
/// any previous file for the same range. Returns the path written.
pub fn label_batch(
    layout: &DatasetLayout,
    range: BatchRange,
    classifier: &mut dyn GenderClassifier,
    output_dir: &Path,
) -> Result<PathBuf, LabelError> {
    let all_faces = layout.list_aligned_faces().map_err(LabelError::ListFaces)?;
    let paths = range.slice(&all_faces);
    tracing::info!(
        start = range.start,
        end = range.end,
        available = all_faces.len(),
        selected = paths.len(),
        "labelling batch"
    );

    let names = paths
        .iter()
        .map(|p| FaceName::from_path(p))
        .collect::<Result<Vec<_>, _>>()?;

    let records = if paths.is_empty() {
        tracing::warn!(start = range.start, available = all_faces.len(), "batch selects no faces");
        Vec::new()
    } else {
        let faces = load_faces(paths)?;
        let scores = classifier.scores(&faces)?;
        if scores.len() != faces.len() {
            return Err(LabelError::ScoreCount {
                expected: faces.len(),
                got: scores.len(),
            });
        }

        paths
            .iter()
            .zip(names)
            .zip(&scores)
            .map(|((path, name), score)| PredictionRecord {
                image_path: path.display().to_string(),
                image_name: name.image_name,
                face_number: name.face_number,
                gender_prediction: predict(score),
            })
            .collect()
    };

    let out_path = output_dir.join(range.output_file_name());
    write_records(&out_path, &records).map_err(|source| LabelError::Write {
        path: out_path.clone(),
        source,
    })?;

    tracing::info!(path = %out_path.display(), rows = records.len(), "batch written");
    Ok(out_path)
}

/// Load each image as RGB at the model input size (nearest-neighbour resize).
fn load_faces(paths: &[PathBuf]) -> Result<Vec<image::RgbImage>, LabelError> {
    let total = paths.len();
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let image = image::open(path).map_err(|source| LabelError::LoadImage {
                path: path.clone(),
                source,
            })?;
            if (i + 1) % 1000 == 0 {
                tracing::info!(done = i + 1, total, "loading faces");
            }
            Ok(image
                .resize_exact(GENDER_INPUT_SIZE, GENDER_INPUT_SIZE, FilterType::Nearest)
                .to_rgb8())
        })
        .collect()
}

fn write_records(path: &Path, records: &[PredictionRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record(["image_path", "image_name", "face_number", "gender_prediction"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
