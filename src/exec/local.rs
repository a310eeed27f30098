use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{rooted_exists, rooted_read, run_host_command, CommandOutput, ExecContext};
use crate::error::{ExecResult, ScanError};

/// Scans the host itself, or a directory holding an unpacked root filesystem.
///
/// Commands always run on the host. File queries are resolved under `root`,
/// and when `root` is not `/` it is exposed through `command_root` so the
/// package managers read the database below it instead of the host's.
pub struct LocalContext {
    root: PathBuf,
}

impl LocalContext {
    pub fn host() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// # Errors
    ///
    /// Returns [`ScanError::InvalidRoot`] if `root` is not a directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ScanError::InvalidRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ExecContext for LocalContext {
    fn describe(&self) -> String {
        format!("local {}", self.root.display())
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> ExecResult<CommandOutput> {
        run_host_command(program, args, timeout).await
    }

    async fn exists(&self, path: &str, timeout: Duration) -> bool {
        rooted_exists(&self.root, path, timeout).await
    }

    async fn read_file(&self, path: &str, timeout: Duration) -> Option<Vec<u8>> {
        rooted_read(&self.root, path, timeout).await
    }

    fn filesystem_root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn command_root(&self) -> Option<&Path> {
        (self.root != Path::new("/")).then_some(self.root.as_path())
    }
}
