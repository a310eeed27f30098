//! Manager Probe: which package managers exist in the target.
//!
//! Detection is an existence check of each manager's canonical binary.
//! Checks are independent and time-bounded; a timeout counts as "not
//! detected". An empty result is the distroless terminal state, not an error.

use futures::future::join_all;
use std::time::Duration;
use tracing::debug;

use crate::exec::ExecContext;
use crate::layout::{manager_binary_candidates, OS_RELEASE_PATHS};
use crate::model::ManagerKind;

pub struct ManagerProbe {
    timeout: Duration,
}

impl ManagerProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns detected manager kinds in [`ManagerKind::PROBED`] order.
    pub async fn detect(&self, ctx: &dyn ExecContext) -> Vec<ManagerKind> {
        let checks = ManagerKind::PROBED
            .iter()
            .map(|kind| async move { (*kind, self.is_present(ctx, *kind).await) });

        join_all(checks)
            .await
            .into_iter()
            .filter_map(|(kind, present)| present.then_some(kind))
            .collect()
    }

    pub async fn is_present(&self, ctx: &dyn ExecContext, kind: ManagerKind) -> bool {
        for candidate in manager_binary_candidates(kind) {
            if ctx.exists(&candidate, self.timeout).await {
                debug!(manager = %kind, path = %candidate, "package manager detected");
                return true;
            }
        }
        false
    }
}

/// Operating system identity from `os-release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub name: String,
    pub family: String,
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            family: "unknown".to_string(),
        }
    }
}

pub async fn detect_os(ctx: &dyn ExecContext, timeout: Duration) -> OsInfo {
    for path in OS_RELEASE_PATHS {
        if let Some(content) = ctx.read_text(path, timeout).await {
            return parse_os_release(&content);
        }
    }
    OsInfo::default()
}

pub fn parse_os_release(content: &str) -> OsInfo {
    let mut pretty_name = None;
    let mut name = None;
    let mut id = None;
    let mut id_like = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "PRETTY_NAME" => pretty_name = Some(value),
            "NAME" => name = Some(value),
            "ID" => id = Some(value),
            "ID_LIKE" => id_like = Some(value),
            _ => {}
        }
    }

    let family = id_like
        .and_then(|like| like.split_whitespace().next().map(str::to_string))
        .or(id.clone())
        .unwrap_or_else(|| "unknown".to_string());

    OsInfo {
        name: pretty_name
            .or(name)
            .or(id)
            .unwrap_or_else(|| "unknown".to_string()),
        family,
    }
}
