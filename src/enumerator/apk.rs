use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{clean_field, command_root_arg, PackageEnumerator, RawPackage};
use crate::exec::ExecContext;
use crate::model::ManagerKind;

/// Alpine packages via `apk info`.
///
/// Licenses come from `apk info --license`, queried for many packages per
/// invocation. A failed batch leaves its packages unresolved.
pub struct ApkEnumerator {
    timeout: Duration,
    batch_size: usize,
}

impl ApkEnumerator {
    pub fn new(timeout: Duration, batch_size: usize) -> Self {
        Self {
            timeout,
            batch_size: batch_size.max(1),
        }
    }

    async fn query_licenses(
        &self,
        ctx: &dyn ExecContext,
        root: Option<&str>,
        names: &[&str],
    ) -> HashMap<String, String> {
        let mut args = root_args(root);
        args.extend(["info", "--license"]);
        args.extend_from_slice(names);

        match ctx.run("apk", &args, self.timeout).await {
            Ok(output) if !output.stdout.trim().is_empty() => parse_license_blocks(&output.stdout),
            Ok(output) => {
                debug!(
                    count = names.len(),
                    "apk license query returned nothing: {}",
                    output.stderr.trim()
                );
                HashMap::new()
            }
            Err(e) => {
                debug!(count = names.len(), error = %e, "apk license query failed");
                HashMap::new()
            }
        }
    }
}

fn root_args(root: Option<&str>) -> Vec<&str> {
    root.map(|root| vec!["--root", root]).unwrap_or_default()
}

struct Installed {
    token: String,
    name: String,
    version: String,
}

#[async_trait]
impl PackageEnumerator for ApkEnumerator {
    fn name(&self) -> &'static str {
        "APK Packages"
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Apk
    }

    async fn list_installed(&self, ctx: &dyn ExecContext) -> Result<Vec<RawPackage>> {
        let root = command_root_arg(ctx);
        let mut args = root_args(root.as_deref());
        args.extend(["info", "-v"]);

        let output = ctx
            .run("apk", &args, self.timeout)
            .await
            .context("Failed to execute apk")?;

        if !output.success() && output.stdout.trim().is_empty() {
            bail!("apk info failed: {}", output.stderr.trim());
        }

        let installed: Vec<Installed> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.contains(char::is_whitespace))
            .map(|token| {
                let (name, version) = split_name_version(token);
                Installed {
                    token: token.to_string(),
                    name,
                    version,
                }
            })
            .collect();

        let mut licenses = HashMap::new();
        for chunk in installed.chunks(self.batch_size) {
            let names: Vec<&str> = chunk.iter().map(|p| p.name.as_str()).collect();
            licenses.extend(self.query_licenses(ctx, root.as_deref(), &names).await);
        }

        Ok(installed
            .into_iter()
            .map(|pkg| {
                let license = licenses
                    .get(&pkg.token)
                    .or_else(|| licenses.get(&pkg.name))
                    .cloned();
                RawPackage::new(pkg.name, pkg.version).with_license(license)
            })
            .collect())
    }
}

/// Splits `musl-1.2.4-r2` into `("musl", "1.2.4-r2")`.
pub(crate) fn split_name_version(token: &str) -> (String, String) {
    let parts: Vec<&str> = token.rsplitn(3, '-').collect();
    if let [release, version, name] = parts.as_slice() {
        let looks_like_release = release.len() > 1
            && release.starts_with('r')
            && release[1..].chars().all(|c| c.is_ascii_digit())
            && version.starts_with(|c: char| c.is_ascii_digit());
        if looks_like_release && !name.is_empty() {
            return (name.to_string(), format!("{}-{}", version, release));
        }
    }
    (token.to_string(), "unknown".to_string())
}

/// Parses `apk info --license` output:
///
/// ```text
/// musl-1.2.4-r2 license:
/// MIT
///
/// ```
///
/// Keys are the `name-version` tokens from the headers.
pub(crate) fn parse_license_blocks(stdout: &str) -> HashMap<String, String> {
    let mut licenses = HashMap::new();
    let mut current: Option<String> = None;

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_suffix(" license:") {
            current = Some(header.trim().to_string());
            continue;
        }
        if let Some(token) = current.take() {
            let license = clean_field(line);
            if !license.is_empty() {
                licenses.insert(token, license);
            }
        }
    }

    licenses
}
