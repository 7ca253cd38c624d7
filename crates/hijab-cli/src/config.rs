use hijab_core::alignment::DEFAULT_ALIGNED_SIZE;
use hijab_core::labeler::DEFAULT_BATCH_SIZE;
use hijab_core::DatasetLayout;
use std::path::PathBuf;

/// Pipeline configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the source `*.jpg` images (default: ./images).
    pub images_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Where labelling batch CSVs are written.
    pub output_dir: PathBuf,
    /// Curated label spreadsheet read by `materialize`.
    pub labels_path: PathBuf,
    /// Aligned faces per labelling batch.
    pub batch_size: usize,
    /// Side length of aligned face crops in pixels.
    pub face_size: u32,
}

impl Config {
    /// Load configuration from `HIJAB_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            images_dir: env_path("HIJAB_IMAGES_DIR", "images"),
            model_dir: env_path("HIJAB_MODEL_DIR", "models"),
            output_dir: env_path("HIJAB_OUTPUT_DIR", "."),
            labels_path: env_path("HIJAB_LABELS_PATH", "hijab_labelling.csv"),
            batch_size: env_parse("HIJAB_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            face_size: env_parse("HIJAB_FACE_SIZE", DEFAULT_ALIGNED_SIZE),
        }
    }

    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(&self.images_dir)
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    /// Path to the gender classification model.
    pub fn gender_model_path(&self) -> PathBuf {
        self.model_dir.join("gender_detection.onnx")
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths() {
        let config = Config {
            images_dir: PathBuf::from("/data/images"),
            model_dir: PathBuf::from("/data/models"),
            output_dir: PathBuf::from("/out"),
            labels_path: PathBuf::from("/data/labels.csv"),
            batch_size: DEFAULT_BATCH_SIZE,
            face_size: DEFAULT_ALIGNED_SIZE,
        };
        assert_eq!(config.scrfd_model_path(), PathBuf::from("/data/models/det_10g.onnx"));
        assert_eq!(
            config.gender_model_path(),
            PathBuf::from("/data/models/gender_detection.onnx")
        );
        assert_eq!(config.layout().root(), std::path::Path::new("/data/images"));
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        // Key is unique to this test so parallel tests don't race on it.
        std::env::set_var("HIJAB_TEST_GARBAGE_SIZE", "lots");
        assert_eq!(env_parse("HIJAB_TEST_GARBAGE_SIZE", 34_000usize), 34_000);
        std::env::set_var("HIJAB_TEST_GARBAGE_SIZE", "17");
        assert_eq!(env_parse("HIJAB_TEST_GARBAGE_SIZE", 34_000usize), 17);
    }

    #[test]
    fn test_env_path_default() {
        assert_eq!(env_path("HIJAB_TEST_UNSET_PATH", "images"), PathBuf::from("images"));
    }
}
