//! Filesystem copyright harvester.
//!
//! Walks the scanned root once, then runs the name-based passes concurrently
//! against the shared index. Every pass claims paths in one dedup set, so a
//! file matched by several passes is copied and reported once. The optional
//! content-sniff pass runs last and only considers unclaimed files.

mod index;
mod passes;

pub use index::{FileIndex, IndexedFile};
pub use passes::{looks_like_notice, HarvestPass, CANONICAL_NAMES, DIRECTORY_PATTERNS};

use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::model::CopyrightFile;

/// Bytes read from each file considered by the content-sniff pass.
const SNIFF_READ_BYTES: u64 = 8 * 1024;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub exact_cap: usize,
    pub substring_cap: usize,
    pub directory_cap: usize,
    pub sniff_cap: usize,
    pub content_sniff: bool,
    /// Larger files are never sniffed.
    pub sniff_max_bytes: u64,
    /// Budget for each single read or copy.
    pub file_timeout: Duration,
    /// Budget for the whole directory walk.
    pub walk_timeout: Duration,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            exact_cap: 1000,
            substring_cap: 500,
            directory_cap: 5000,
            sniff_cap: 1000,
            content_sniff: true,
            sniff_max_bytes: 256 * 1024,
            file_timeout: Duration::from_secs(5),
            walk_timeout: Duration::from_secs(300),
        }
    }
}

pub struct Harvester {
    options: HarvestOptions,
}

impl Harvester {
    pub fn new(options: HarvestOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HarvestOptions {
        &self.options
    }

    /// Finds license and notice files under `root` and mirrors them into
    /// `mirror`, preserving their path relative to `root`.
    ///
    /// Never fails: unreadable or uncopyable files are skipped and a walk
    /// that runs out of time yields a partial result.
    pub async fn harvest(&self, root: &Path, mirror: &Path) -> Vec<CopyrightFile> {
        if !root.is_dir() {
            warn!(root = %root.display(), "harvest root is not a directory");
            return Vec::new();
        }
        if let Err(e) = tokio::fs::create_dir_all(mirror).await {
            warn!(mirror = %mirror.display(), error = %e, "cannot create copyright mirror");
            return Vec::new();
        }

        // both sides canonical so the mirror is recognised inside the root
        let root = tokio::fs::canonicalize(root)
            .await
            .unwrap_or_else(|_| root.to_path_buf());
        let mirror = tokio::fs::canonicalize(mirror)
            .await
            .unwrap_or_else(|_| mirror.to_path_buf());

        let index = match self.build_index(&root, &mirror).await {
            Some(index) => index,
            None => return Vec::new(),
        };
        debug!(files = index.len(), "filesystem indexed");

        let claimed = Mutex::new(HashSet::new());

        let name_passes = [
            (
                HarvestPass::ExactName,
                passes::exact_name_candidates(&index, self.options.exact_cap),
            ),
            (
                HarvestPass::SubstringName,
                passes::substring_name_candidates(&index, self.options.substring_cap),
            ),
            (
                HarvestPass::Directory,
                passes::directory_candidates(&index, self.options.directory_cap),
            ),
        ];

        let results = join_all(
            name_passes
                .into_iter()
                .map(|(pass, candidates)| self.run_pass(pass, candidates, &claimed, &mirror)),
        )
        .await;

        let mut harvested: Vec<CopyrightFile> = results.into_iter().flatten().collect();

        if self.options.content_sniff {
            harvested.extend(self.sniff_pass(&index, &claimed, &mirror).await);
        }

        info!(
            files = harvested.len(),
            partial = index.is_truncated(),
            "copyright harvest finished"
        );
        harvested
    }

    async fn build_index(&self, root: &Path, mirror: &Path) -> Option<FileIndex> {
        let root = root.to_path_buf();
        let exclude = mirror.to_path_buf();
        let deadline = Instant::now() + self.options.walk_timeout;

        match tokio::task::spawn_blocking(move || {
            FileIndex::build(&root, Some(&exclude), Some(deadline))
        })
        .await
        {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(error = %e, "file walk failed");
                None
            }
        }
    }

    async fn run_pass(
        &self,
        pass: HarvestPass,
        candidates: Vec<&IndexedFile>,
        claimed: &Mutex<HashSet<String>>,
        mirror: &Path,
    ) -> Vec<CopyrightFile> {
        let mut harvested = Vec::new();
        for file in candidates {
            if !claim(claimed, &file.image_path) {
                continue;
            }
            if let Some(entry) = self.mirror_file(file, mirror).await {
                harvested.push(entry);
            }
        }
        debug!(pass = %pass, files = harvested.len(), "harvest pass finished");
        harvested
    }

    async fn sniff_pass(
        &self,
        index: &FileIndex,
        claimed: &Mutex<HashSet<String>>,
        mirror: &Path,
    ) -> Vec<CopyrightFile> {
        let mut harvested = Vec::new();

        for file in passes::sniff_candidates(index, self.options.sniff_max_bytes) {
            if harvested.len() >= self.options.sniff_cap {
                break;
            }
            if is_claimed(claimed, &file.image_path) {
                continue;
            }

            let Some(head) = read_head(&file.host_path, self.options.file_timeout).await else {
                continue;
            };
            if !looks_like_notice(&head) || !claim(claimed, &file.image_path) {
                continue;
            }
            if let Some(entry) = self.mirror_file(file, mirror).await {
                harvested.push(entry);
            }
        }

        debug!(
            pass = %HarvestPass::ContentSniff,
            files = harvested.len(),
            "harvest pass finished"
        );
        harvested
    }

    async fn mirror_file(&self, file: &IndexedFile, mirror: &Path) -> Option<CopyrightFile> {
        let relative = file.relative_path();
        let destination: PathBuf = mirror.join(relative);
        let timeout = self.options.file_timeout;

        if let Some(parent) = destination.parent() {
            match tokio::time::timeout(timeout, tokio::fs::create_dir_all(parent)).await {
                Ok(Ok(())) => {}
                _ => {
                    debug!(path = %file.image_path, "cannot create mirror directory");
                    return None;
                }
            }
        }

        match tokio::time::timeout(timeout, tokio::fs::copy(&file.host_path, &destination)).await
        {
            Ok(Ok(size)) => Some(CopyrightFile {
                original_path: file.image_path.clone(),
                size_bytes: size,
                extracted_relative_path: relative.to_string(),
            }),
            Ok(Err(e)) => {
                debug!(path = %file.image_path, error = %e, "copy failed");
                None
            }
            Err(_) => {
                debug!(path = %file.image_path, "copy timed out");
                None
            }
        }
    }
}

/// Records `path` as harvested. Returns false if another pass got there first.
fn claim(claimed: &Mutex<HashSet<String>>, path: &str) -> bool {
    let mut set = claimed.lock().unwrap_or_else(|e| e.into_inner());
    set.insert(path.to_string())
}

fn is_claimed(claimed: &Mutex<HashSet<String>>, path: &str) -> bool {
    let set = claimed.lock().unwrap_or_else(|e| e.into_inner());
    set.contains(path)
}

async fn read_head(path: &Path, timeout: Duration) -> Option<String> {
    let read = async {
        let file = tokio::fs::File::open(path).await?;
        let mut buffer = Vec::new();
        file.take(SNIFF_READ_BYTES).read_to_end(&mut buffer).await?;
        Ok::<_, std::io::Error>(buffer)
    };

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        _ => None,
    }
}
