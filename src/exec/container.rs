use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::{rooted_exists, rooted_read, run_host_command, CommandOutput, ExecContext};
use crate::error::{ExecError, ExecResult, ScanError};

const DOCKER: &str = "docker";

/// Timeouts for container lifecycle steps.
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Budget for `docker pull`.
    pub pull_timeout: Duration,
    /// Budget for create/start/remove.
    pub lifecycle_timeout: Duration,
    /// Budget for exporting and unpacking the container filesystem.
    pub export_timeout: Duration,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            pull_timeout: Duration::from_secs(600),
            lifecycle_timeout: Duration::from_secs(60),
            export_timeout: Duration::from_secs(600),
        }
    }
}

/// A container created from the scanned image.
///
/// Commands run through `docker exec` when the container could be started.
/// Distroless images usually cannot run the keep-alive entrypoint; their
/// commands then fail and the probe reports nothing, which is the expected
/// terminal state. File queries always go through the exported filesystem.
pub struct ContainerContext {
    image: String,
    container_id: String,
    running: bool,
    rootfs: PathBuf,
    removed: AtomicBool,
    _scratch: TempDir,
}

impl ContainerContext {
    /// Creates a container for `image`, pulling it first if needed, and
    /// exports its filesystem into a scratch directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if docker is unavailable or the image cannot
    /// be pulled, instantiated or exported. These abort the scan.
    pub async fn open(image: &str, options: &ContainerOptions) -> Result<Self, ScanError> {
        ensure_image(image, options).await?;

        let created = docker(
            &["create", "--entrypoint", "sleep", image, "infinity"],
            options.lifecycle_timeout,
        )
        .await
        .map_err(|e| ScanError::ContainerCreate {
            image: image.to_string(),
            reason: e.to_string(),
        })?;

        if !created.success() {
            return Err(ScanError::ContainerCreate {
                image: image.to_string(),
                reason: created.stderr.trim().to_string(),
            });
        }

        let container_id = created.stdout.trim().to_string();
        debug!(container = %container_id, image, "container created");

        let scratch = TempDir::new()?;
        let rootfs = scratch.path().join("rootfs");

        let mut context = Self {
            image: image.to_string(),
            container_id,
            running: false,
            rootfs,
            removed: AtomicBool::new(false),
            _scratch: scratch,
        };

        context.running = match docker(
            &["start", context.container_id.as_str()],
            options.lifecycle_timeout,
        )
        .await
        {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!(
                    image,
                    "container could not be started, commands are unavailable: {}",
                    output.stderr.trim()
                );
                false
            }
            Err(e) => {
                warn!(image, error = %e, "container could not be started");
                false
            }
        };

        context.export(options.export_timeout).await?;
        Ok(context)
    }

    async fn export(&self, timeout: Duration) -> Result<(), ScanError> {
        let export_error = |reason: String| ScanError::Export {
            image: self.image.clone(),
            reason,
        };

        tokio::fs::create_dir_all(&self.rootfs).await?;
        let tarball = self.rootfs.with_file_name("rootfs.tar");
        let tarball_arg = tarball.to_string_lossy().into_owned();

        let exported = docker(
            &["export", "-o", tarball_arg.as_str(), self.container_id.as_str()],
            timeout,
        )
        .await
        .map_err(|e| export_error(e.to_string()))?;

        if !exported.success() {
            return Err(export_error(exported.stderr.trim().to_string()));
        }

        let rootfs_arg = self.rootfs.to_string_lossy().into_owned();
        let unpacked = run_host_command(
            "tar",
            &[
                "-xf",
                tarball_arg.as_str(),
                "-C",
                rootfs_arg.as_str(),
                "--no-same-owner",
                "--no-same-permissions",
                "--exclude=dev/*",
            ],
            timeout,
        )
        .await
        .map_err(|e| export_error(e.to_string()))?;

        // tar reports special files it cannot recreate without privileges;
        // the regular files are still there.
        if !unpacked.success() {
            warn!(
                image = %self.image,
                "tar reported errors while unpacking: {}",
                unpacked.stderr.lines().next().unwrap_or_default()
            );
        }

        let _ = tokio::fs::remove_file(&tarball).await;
        info!(image = %self.image, rootfs = %self.rootfs.display(), "container filesystem exported");
        Ok(())
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Removes the container. Dropping the context does the same, blocking.
    pub async fn close(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = docker(
            &["rm", "-f", self.container_id.as_str()],
            Duration::from_secs(60),
        )
        .await
        {
            warn!(container = %self.container_id, error = %e, "failed to remove container");
        }
    }
}

impl Drop for ContainerContext {
    fn drop(&mut self) {
        if !self.removed.swap(true, Ordering::SeqCst) {
            let _ = std::process::Command::new(DOCKER)
                .args(["rm", "-f", self.container_id.as_str()])
                .output();
        }
    }
}

#[async_trait]
impl ExecContext for ContainerContext {
    fn describe(&self) -> String {
        format!("container {} ({})", short_id(&self.container_id), self.image)
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> ExecResult<CommandOutput> {
        if !self.running {
            return Err(ExecError::CommandNotFound {
                command: program.to_string(),
            });
        }

        let mut exec_args = vec!["exec", self.container_id.as_str(), program];
        exec_args.extend_from_slice(args);
        let output = docker(&exec_args, timeout).await?;

        // docker exec reports a missing binary with 126/127
        if matches!(output.code, Some(126) | Some(127)) {
            return Err(ExecError::CommandNotFound {
                command: program.to_string(),
            });
        }
        Ok(output)
    }

    async fn exists(&self, path: &str, timeout: Duration) -> bool {
        rooted_exists(&self.rootfs, path, timeout).await
    }

    async fn read_file(&self, path: &str, timeout: Duration) -> Option<Vec<u8>> {
        rooted_read(&self.rootfs, path, timeout).await
    }

    fn filesystem_root(&self) -> Option<&Path> {
        Some(&self.rootfs)
    }
}

async fn ensure_image(image: &str, options: &ContainerOptions) -> Result<(), ScanError> {
    let inspect = docker(&["image", "inspect", image], options.lifecycle_timeout).await;
    match inspect {
        Ok(output) if output.success() => return Ok(()),
        Ok(_) => {}
        Err(ExecError::CommandNotFound { .. }) => {
            return Err(ScanError::RuntimeUnavailable(
                "docker binary not found on PATH".to_string(),
            ));
        }
        Err(e) => return Err(ScanError::RuntimeUnavailable(e.to_string())),
    }

    info!(image, "pulling image");
    let pulled = docker(&["pull", image], options.pull_timeout)
        .await
        .map_err(|e| ScanError::ImagePull {
            image: image.to_string(),
            reason: e.to_string(),
        })?;

    if pulled.success() {
        Ok(())
    } else {
        Err(ScanError::ImagePull {
            image: image.to_string(),
            reason: pulled.stderr.trim().to_string(),
        })
    }
}

async fn docker(args: &[&str], timeout: Duration) -> ExecResult<CommandOutput> {
    run_host_command(DOCKER, args, timeout).await
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_default_options() {
        let options = ContainerOptions::default();
        assert!(options.pull_timeout >= options.lifecycle_timeout);
    }
}
