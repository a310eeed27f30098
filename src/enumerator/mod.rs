//! Package enumerators, one per manager kind.
//!
//! Each enumerator lists installed packages as normalized [`RawPackage`]
//! triples. A failed lookup for one package never aborts its manager's
//! scan; that package is simply left without a native license.
//!
//! When the context reports a `command_root`, every listing command is
//! pointed at that root (`--admindir`, `--root`, `--prefix`) so host
//! tools never report the host's own packages.
//!
//! | Enumerator | Listing | Native license |
//! |------------|---------|----------------|
//! | [`AptEnumerator`] | `dpkg-query -W`, one batched query | never (dpkg has no license field) |
//! | [`RpmEnumerator`] | `rpm -qa --queryformat` | `%{LICENSE}` |
//! | [`ApkEnumerator`] | `apk info -v` | `apk info --license`, batched |
//! | [`NpmEnumerator`] | `npm list --json --depth=0` | installed `package.json` |
//!
//! # Example
//!
//! ```no_run
//! use licenscan::enumerator::{enumerator_for, EnumeratorOptions};
//! use licenscan::exec::LocalContext;
//! use licenscan::ManagerKind;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = LocalContext::host();
//!     let options = EnumeratorOptions::default();
//!
//!     if let Some(enumerator) = enumerator_for(ManagerKind::Apt, &options) {
//!         for pkg in enumerator.list_installed(&ctx).await? {
//!             println!("{} {}", pkg.name, pkg.version);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod apk;
mod apt;
mod npm;
mod rpm;

pub use apk::ApkEnumerator;
pub use apt::AptEnumerator;
pub use npm::NpmEnumerator;
pub use rpm::RpmEnumerator;

use crate::exec::ExecContext;
use crate::model::ManagerKind;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A package as reported by its manager, before license resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPackage {
    pub name: String,
    pub version: String,
    pub native_license: Option<String>,
}

impl RawPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            native_license: None,
        }
    }

    pub fn with_license(mut self, license: Option<String>) -> Self {
        self.native_license = license.filter(|l| !l.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnumeratorOptions {
    /// Budget for listing and metadata commands.
    pub command_timeout: Duration,
    /// Budget for single file reads.
    pub file_timeout: Duration,
    /// Application directories whose npm dependencies are listed too.
    pub npm_project_dirs: Vec<String>,
    /// Package names per `apk info --license` invocation.
    pub apk_batch_size: usize,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            file_timeout: Duration::from_secs(5),
            npm_project_dirs: Vec::new(),
            apk_batch_size: 50,
        }
    }
}

/// Lists the packages one manager has installed.
#[async_trait]
pub trait PackageEnumerator: Send + Sync {
    /// Human-readable name of this enumerator.
    fn name(&self) -> &'static str;

    /// The manager kind this enumerator handles.
    fn kind(&self) -> ManagerKind;

    /// Lists installed packages.
    ///
    /// # Errors
    ///
    /// Returns an error only if the listing itself is unavailable (command
    /// missing, timed out, or unparseable). Per-package failures are absorbed.
    async fn list_installed(&self, ctx: &dyn ExecContext) -> Result<Vec<RawPackage>>;
}

/// Returns the enumerator bound to `kind`.
pub fn enumerator_for(
    kind: ManagerKind,
    options: &EnumeratorOptions,
) -> Option<Box<dyn PackageEnumerator>> {
    match kind {
        ManagerKind::Apt => Some(Box::new(AptEnumerator::new(options.command_timeout))),
        ManagerKind::Rpm => Some(Box::new(RpmEnumerator::new(options.command_timeout))),
        ManagerKind::Apk => Some(Box::new(ApkEnumerator::new(
            options.command_timeout,
            options.apk_batch_size,
        ))),
        ManagerKind::Npm => Some(Box::new(NpmEnumerator::new(
            options.command_timeout,
            options.file_timeout,
            options.npm_project_dirs.clone(),
        ))),
        ManagerKind::Unknown => None,
    }
}

/// The alternate root as a command argument, if commands need one.
pub(crate) fn command_root_arg(ctx: &dyn ExecContext) -> Option<String> {
    ctx.command_root()
        .map(|root| root.to_string_lossy().into_owned())
}

/// Host path of `image_path` for command arguments.
pub(crate) fn command_path(ctx: &dyn ExecContext, image_path: &str) -> String {
    match ctx.command_root() {
        Some(root) => root
            .join(image_path.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned(),
        None => image_path.to_string(),
    }
}

/// Strips whitespace and one layer of surrounding quotes.
pub(crate) fn clean_field(value: &str) -> String {
    let trimmed = value.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}
