use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::layout::SKIPPED_DIRS;

/// A regular file found under the scanned root.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    /// Absolute path inside the scanned filesystem.
    pub image_path: String,
    pub host_path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl IndexedFile {
    pub fn relative_path(&self) -> &str {
        self.image_path.trim_start_matches('/')
    }

    pub fn is_under(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        self.image_path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Every regular file under a root, walked once and shared by all passes.
#[derive(Debug, Default)]
pub struct FileIndex {
    files: Vec<IndexedFile>,
    truncated: bool,
}

impl FileIndex {
    /// Walks `root` in file-name order without following symlinks. Pseudo filesystems at the
    /// top level and anything under `exclude` are skipped. The walk stops
    /// early once `deadline` passes; files seen so far are kept.
    pub fn build(root: &Path, exclude: Option<&Path>, deadline: Option<Instant>) -> Self {
        let mut index = FileIndex::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry, exclude));

        for entry in walker {
            if deadline.is_some_and(|d| Instant::now() > d) {
                warn!(root = %root.display(), "file walk timed out, harvest is partial");
                index.truncated = true;
                break;
            }

            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            index.files.push(IndexedFile {
                image_path: format!("/{}", relative.to_string_lossy()),
                host_path: entry.path().to_path_buf(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size,
            });
        }

        index
    }

    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, file: IndexedFile) {
        self.files.push(file);
    }
}

fn is_skipped(entry: &DirEntry, exclude: Option<&Path>) -> bool {
    if exclude.is_some_and(|dir| entry.path().starts_with(dir)) {
        return true;
    }
    entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_index_skips_pseudo_filesystems_and_excluded_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("usr/share/doc/bash")).unwrap();
        fs::create_dir_all(root.join("proc/1")).unwrap();
        fs::create_dir_all(root.join("out")).unwrap();
        fs::write(root.join("usr/share/doc/bash/copyright"), "GPL-3").unwrap();
        fs::write(root.join("proc/1/status"), "x").unwrap();
        fs::write(root.join("out/LICENSE"), "x").unwrap();

        let index = FileIndex::build(root, Some(&root.join("out")), None);

        assert_eq!(index.len(), 1);
        let file = &index.files()[0];
        assert_eq!(file.image_path, "/usr/share/doc/bash/copyright");
        assert_eq!(file.relative_path(), "usr/share/doc/bash/copyright");
        assert_eq!(file.size, 5);
        assert!(file.is_under("/usr/share/doc"));
        assert!(!file.is_under("/usr/share/do"));
    }
}
