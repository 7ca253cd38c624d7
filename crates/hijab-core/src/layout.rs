//! On-disk layout of the dataset, rooted at the source images directory.

use crate::naming::FaceName;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const SOURCE_IMAGE_EXTENSION: &str = "jpg";
const ALIGNED_FACES_DIR: &str = "aligned-faces";
const LABELED_IMAGES_DIR: &str = "hijab-images";
const LABELED_FACES_DIR: &str = "hijab-faces";

#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_image(&self, image_name: &str) -> PathBuf {
        self.root
            .join(format!("{image_name}.{SOURCE_IMAGE_EXTENSION}"))
    }

    pub fn aligned_faces_dir(&self) -> PathBuf {
        self.root.join(ALIGNED_FACES_DIR)
    }

    pub fn aligned_face(&self, name: &FaceName) -> PathBuf {
        self.aligned_faces_dir().join(name.file_name())
    }

    pub fn labeled_images_dir(&self) -> PathBuf {
        self.root.join(LABELED_IMAGES_DIR)
    }

    pub fn labeled_faces_dir(&self) -> PathBuf {
        self.root.join(LABELED_FACES_DIR)
    }

    /// All `*.jpg` files directly inside the root, sorted by path.
    ///
    /// The extension match is case-sensitive; `.JPG` files are not picked up.
    pub fn list_source_images(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = list_files(&self.root)?;
        paths.retain(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == SOURCE_IMAGE_EXTENSION)
        });
        Ok(paths)
    }

    /// Every regular file inside `aligned-faces`, sorted by path.
    pub fn list_aligned_faces(&self) -> io::Result<Vec<PathBuf>> {
        list_files(&self.aligned_faces_dir())
    }
}

/// Regular files directly inside `dir` (no recursion), sorted.
///
/// Symlinks to files count as files. Hidden entries (`.DS_Store`, `._x.jpg`)
/// are skipped.
fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if is_hidden(&entry) || !entry.path().is_file() {
            continue;
        }
        paths.push(entry.into_path());
    }
    paths.sort();
    Ok(paths)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_paths() {
        let layout = DatasetLayout::new("/data/images");
        assert_eq!(layout.source_image("abc"), PathBuf::from("/data/images/abc.jpg"));
        assert_eq!(
            layout.aligned_face(&FaceName::new("abc", 0)),
            PathBuf::from("/data/images/aligned-faces/abc_0.png")
        );
        assert_eq!(layout.labeled_images_dir(), PathBuf::from("/data/images/hijab-images"));
        assert_eq!(layout.labeled_faces_dir(), PathBuf::from("/data/images/hijab-faces"));
    }

    #[test]
    fn test_list_source_images_only_jpg_sorted_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.jpg", "c.png", "d.JPG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("aligned-faces")).unwrap();
        fs::write(dir.path().join("aligned-faces/e.jpg"), b"x").unwrap();

        let layout = DatasetLayout::new(dir.path());
        let names: Vec<String> = layout
            .list_source_images()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_listings_skip_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        fs::create_dir(layout.aligned_faces_dir()).unwrap();
        for path in [
            layout.source_image("a"),
            dir.path().join("._a.jpg"),
            layout.aligned_face(&FaceName::new("a", 0)),
            layout.aligned_faces_dir().join(".DS_Store"),
        ] {
            fs::write(path, b"x").unwrap();
        }

        assert_eq!(layout.list_source_images().unwrap(), vec![layout.source_image("a")]);
        assert_eq!(
            layout.list_aligned_faces().unwrap(),
            vec![layout.aligned_face(&FaceName::new("a", 0))]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_listings_follow_symlinks() {
        let elsewhere = tempfile::tempdir().unwrap();
        let target = elsewhere.path().join("real.jpg");
        fs::write(&target, b"x").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        std::os::unix::fs::symlink(&target, layout.source_image("linked")).unwrap();
        // Links to directories are still not files.
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("dir.jpg")).unwrap();

        assert_eq!(layout.list_source_images().unwrap(), vec![layout.source_image("linked")]);
    }

    #[test]
    fn test_list_aligned_faces_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        assert!(layout.list_aligned_faces().is_err());
    }
}
