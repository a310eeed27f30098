//! Execution contexts: how the engine reaches the scanned filesystem.
//!
//! An [`ExecContext`] runs commands inside the target and answers file
//! existence and read queries. Every operation takes an explicit timeout and
//! a timed-out or failed operation is reported as "not found", never as a
//! fatal error.
//!
//! | Context | Commands | Files |
//! |---------|----------|-------|
//! | [`ContainerContext`] | `docker exec` | exported container filesystem |
//! | [`LocalContext`] | host processes | host directory tree |

mod container;
mod local;
#[cfg(test)]
pub(crate) mod mock;

pub use container::{ContainerContext, ContainerOptions};
pub use local::LocalContext;

use crate::error::{ExecError, ExecResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Maximum symlink hops followed when resolving a path inside a root.
const MAX_SYMLINK_HOPS: usize = 40;

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to inspect a target filesystem.
#[async_trait]
pub trait ExecContext: Send + Sync {
    /// Short label for logs and reports.
    fn describe(&self) -> String;

    /// Runs `program` inside the target. A non-zero exit is still `Ok`;
    /// callers decide whether partial output is usable.
    async fn run(&self, program: &str, args: &[&str], timeout: Duration)
        -> ExecResult<CommandOutput>;

    /// Returns true if `path` (absolute inside the target) exists.
    async fn exists(&self, path: &str, timeout: Duration) -> bool;

    /// Reads the bytes of `path` (absolute inside the target).
    async fn read_file(&self, path: &str, timeout: Duration) -> Option<Vec<u8>>;

    /// Host directory holding the target's filesystem, when one is available.
    fn filesystem_root(&self) -> Option<&Path>;

    /// Set when commands run on the host but must act on another root.
    /// Enumerators then pass root-selection flags (`--root`, `--admindir`)
    /// so the host's own package database is never read.
    fn command_root(&self) -> Option<&Path> {
        None
    }

    async fn read_text(&self, path: &str, timeout: Duration) -> Option<String> {
        self.read_file(path, timeout)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub(crate) fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs a host process, killing it if `timeout` elapses first.
pub(crate) async fn run_host_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> ExecResult<CommandOutput> {
    let command_line = display_command(program, args);

    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExecError::CommandNotFound {
                command: command_line,
            });
        }
        Ok(Err(e)) => {
            return Err(ExecError::Spawn {
                command: command_line,
                source: e,
            });
        }
        Err(_) => {
            debug!(command = %command_line, ?timeout, "command timed out");
            return Err(ExecError::Timeout {
                command: command_line,
                timeout,
            });
        }
    };

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code(),
    })
}

/// Maps an absolute target path onto `root`, following symlinks as if
/// `root` were `/`. Absolute link targets are re-rooted and `..` never
/// climbs above `root`.
pub(crate) fn resolve_in_root(root: &Path, path: &str) -> PathBuf {
    let mut pending: Vec<String> = split_components(path);
    pending.reverse();

    let mut resolved: Vec<String> = Vec::new();
    let mut hops = 0;

    while let Some(part) = pending.pop() {
        if part == ".." {
            resolved.pop();
            continue;
        }

        let mut candidate = root.to_path_buf();
        candidate.extend(&resolved);
        candidate.push(&part);

        match std::fs::read_link(&candidate) {
            Ok(target) if hops < MAX_SYMLINK_HOPS => {
                hops += 1;
                let target = target.to_string_lossy().into_owned();
                if target.starts_with('/') {
                    resolved.clear();
                }
                let mut parts = split_components(&target);
                parts.reverse();
                pending.extend(parts);
            }
            _ => resolved.push(part),
        }
    }

    let mut host = root.to_path_buf();
    host.extend(&resolved);
    host
}

fn split_components(path: &str) -> Vec<String> {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect()
}

/// Existence check under `root`. Symlink resolution and the metadata call
/// both run on the blocking pool, bounded by `timeout`.
pub(crate) async fn rooted_exists(root: &Path, path: &str, timeout: Duration) -> bool {
    let root = root.to_path_buf();
    let path = path.to_string();
    let check =
        tokio::task::spawn_blocking(move || resolve_in_root(&root, &path).symlink_metadata().is_ok());

    matches!(tokio::time::timeout(timeout, check).await, Ok(Ok(true)))
}

pub(crate) async fn rooted_read(root: &Path, path: &str, timeout: Duration) -> Option<Vec<u8>> {
    let root = root.to_path_buf();
    let target = path.to_string();
    let read = tokio::task::spawn_blocking(move || {
        let host = resolve_in_root(&root, &target);
        std::fs::read(&host).map_err(|e| (host, e))
    });

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(Ok(bytes))) => Some(bytes),
        Ok(Ok(Err((host, e)))) => {
            debug!(path = %host.display(), error = %e, "read failed");
            None
        }
        Ok(Err(e)) => {
            debug!(path, error = %e, "read task failed");
            None
        }
        Err(_) => {
            debug!(path, ?timeout, "read timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_plain_path() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_in_root(dir.path(), "/usr/share/doc/bash/copyright");
        assert_eq!(resolved, dir.path().join("usr/share/doc/bash/copyright"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_absolute_symlink_stays_in_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("usr/share/doc/libfoo1")).unwrap();
        fs::write(dir.path().join("usr/share/doc/libfoo1/copyright"), "MIT").unwrap();
        std::os::unix::fs::symlink(
            "/usr/share/doc/libfoo1",
            dir.path().join("usr/share/doc/libfoo-dev"),
        )
        .unwrap();

        let resolved = resolve_in_root(dir.path(), "/usr/share/doc/libfoo-dev/copyright");
        assert_eq!(resolved, dir.path().join("usr/share/doc/libfoo1/copyright"));
        assert_eq!(fs::read_to_string(resolved).unwrap(), "MIT");
    }

    #[test]
    fn test_resolve_parent_dir_cannot_escape() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_in_root(dir.path(), "/../../etc/passwd");
        assert_eq!(resolved, dir.path().join("etc/passwd"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rooted_file_access_follows_links() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("usr/lib")).unwrap();
        fs::write(dir.path().join("usr/lib/os-release"), "ID=alpine\n").unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        std::os::unix::fs::symlink("../usr/lib/os-release", dir.path().join("etc/os-release"))
            .unwrap();

        let timeout = Duration::from_secs(5);
        assert!(rooted_exists(dir.path(), "/etc/os-release", timeout).await);
        assert_eq!(
            rooted_read(dir.path(), "/etc/os-release", timeout).await,
            Some(b"ID=alpine\n".to_vec())
        );
        assert!(!rooted_exists(dir.path(), "/etc/missing", timeout).await);
        assert_eq!(rooted_read(dir.path(), "/etc/missing", timeout).await, None);
    }

    #[tokio::test]
    async fn test_host_command_captures_output() {
        let output = run_host_command("echo", &["hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_host_command_missing_binary() {
        let result = run_host_command(
            "definitely-not-a-real-binary-licenscan",
            &[],
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(ExecError::CommandNotFound { .. })));
    }

    #[tokio::test]
    async fn test_host_command_timeout() {
        let result = run_host_command("sleep", &["5"], Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ExecError::Timeout { .. })));
    }
}
