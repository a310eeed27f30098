//! Scripted in-memory context for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{display_command, CommandOutput, ExecContext};
use crate::error::{ExecError, ExecResult};

enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Default)]
pub(crate) struct MockContext {
    commands: HashMap<String, Reply>,
    files: HashMap<String, Vec<u8>>,
    hung_paths: HashSet<String>,
    command_root: Option<PathBuf>,
    calls: Mutex<Vec<String>>,
}

impl MockContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful command; the key is the full command line.
    pub(crate) fn with_command(mut self, command_line: &str, stdout: &str) -> Self {
        self.commands.insert(
            command_line.to_string(),
            Reply::Output(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                code: Some(0),
            }),
        );
        self
    }

    pub(crate) fn with_exit(mut self, command_line: &str, code: i32, stdout: &str) -> Self {
        self.commands.insert(
            command_line.to_string(),
            Reply::Output(CommandOutput {
                stdout: stdout.to_string(),
                stderr: "error".to_string(),
                code: Some(code),
            }),
        );
        self
    }

    pub(crate) fn with_timeout(mut self, command_line: &str) -> Self {
        self.commands
            .insert(command_line.to_string(), Reply::Timeout);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files
            .insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    /// Existence checks on `path` never answer; they end only at the caller's timeout.
    pub(crate) fn with_hung_path(mut self, path: &str) -> Self {
        self.hung_paths.insert(path.to_string());
        self
    }

    pub(crate) fn with_command_root(mut self, root: &str) -> Self {
        self.command_root = Some(PathBuf::from(root));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExecContext for MockContext {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> ExecResult<CommandOutput> {
        let command_line = display_command(program, args);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command_line.clone());
        }
        match self.commands.get(&command_line) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Timeout) => Err(ExecError::Timeout {
                command: command_line,
                timeout,
            }),
            None => Err(ExecError::CommandNotFound {
                command: command_line,
            }),
        }
    }

    async fn exists(&self, path: &str, timeout: Duration) -> bool {
        if self.hung_paths.contains(path) {
            let _ = tokio::time::timeout(timeout, std::future::pending::<()>()).await;
            return false;
        }
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        self.files.contains_key(path) || self.files.keys().any(|k| k.starts_with(&dir_prefix))
    }

    async fn read_file(&self, path: &str, _timeout: Duration) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn filesystem_root(&self) -> Option<&Path> {
        None
    }

    fn command_root(&self) -> Option<&Path> {
        self.command_root.as_deref()
    }
}
