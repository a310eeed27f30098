use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::debug;

use super::{clean_field, command_path, PackageEnumerator, RawPackage};
use crate::exec::ExecContext;
use crate::model::ManagerKind;

/// npm packages: global installs plus configured application directories.
///
/// Licenses are read from each installed `package.json`, so no registry
/// access is needed. Each source (the global tree, every project directory)
/// is listed independently; the scan fails only when none could be listed.
pub struct NpmEnumerator {
    command_timeout: Duration,
    file_timeout: Duration,
    project_dirs: Vec<String>,
}

#[derive(Deserialize)]
struct NpmListOutput {
    dependencies: Option<BTreeMap<String, NpmDependency>>,
}

#[derive(Deserialize)]
struct NpmDependency {
    version: Option<String>,
}

#[derive(Deserialize)]
struct PackageManifest {
    license: Option<LicenseField>,
    licenses: Option<Vec<LicenseField>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LicenseField {
    Name(String),
    Object {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl LicenseField {
    fn name(&self) -> &str {
        match self {
            LicenseField::Name(name) => name,
            LicenseField::Object { kind } => kind,
        }
    }
}

impl NpmEnumerator {
    pub fn new(command_timeout: Duration, file_timeout: Duration, project_dirs: Vec<String>) -> Self {
        Self {
            command_timeout,
            file_timeout,
            project_dirs,
        }
    }

    async fn global_root(&self, ctx: &dyn ExecContext) -> Result<String> {
        let output = ctx
            .run("npm", &["root", "-g"], self.command_timeout)
            .await
            .context("Failed to execute npm. Is npm installed?")?;

        let root = output.stdout.trim();
        if !output.success() || root.is_empty() {
            bail!("npm root -g failed: {}", output.stderr.trim());
        }
        Ok(root.to_string())
    }

    async fn list_global(&self, ctx: &dyn ExecContext) -> Result<(String, Vec<(String, String)>)> {
        let root = self.global_root(ctx).await?;
        let deps = self
            .list_dependencies(ctx, &["list", "-g", "--json", "--depth=0"])
            .await?;
        Ok((root, deps))
    }

    async fn list_dependencies(
        &self,
        ctx: &dyn ExecContext,
        args: &[&str],
    ) -> Result<Vec<(String, String)>> {
        let output = ctx
            .run("npm", args, self.command_timeout)
            .await
            .context("Failed to execute npm list")?;

        // npm list exits 1 on peer dependency problems but still prints valid JSON
        if output.stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        let listing: NpmListOutput =
            serde_json::from_str(&output.stdout).context("Failed to parse npm list output")?;

        Ok(listing
            .dependencies
            .unwrap_or_default()
            .into_iter()
            .map(|(name, dep)| {
                let version = dep.version.unwrap_or_else(|| "unknown".to_string());
                (name, version)
            })
            .collect())
    }

    async fn installed_license(
        &self,
        ctx: &dyn ExecContext,
        node_modules: &str,
        name: &str,
    ) -> Option<String> {
        let manifest_path = format!("{}/{}/package.json", node_modules.trim_end_matches('/'), name);
        let content = ctx.read_text(&manifest_path, self.file_timeout).await?;
        match serde_json::from_str::<PackageManifest>(&content) {
            Ok(manifest) => manifest_license(&manifest),
            Err(e) => {
                debug!(package = name, error = %e, "unreadable package.json");
                None
            }
        }
    }

    async fn collect(
        &self,
        ctx: &dyn ExecContext,
        node_modules: &str,
        dependencies: Vec<(String, String)>,
        seen: &mut HashSet<(String, String)>,
        packages: &mut Vec<RawPackage>,
    ) {
        for (name, version) in dependencies {
            if !seen.insert((name.clone(), version.clone())) {
                continue;
            }
            let license = self.installed_license(ctx, node_modules, &name).await;
            packages.push(RawPackage::new(name, version).with_license(license));
        }
    }
}

fn manifest_license(manifest: &PackageManifest) -> Option<String> {
    if let Some(license) = &manifest.license {
        return Some(clean_field(license.name()));
    }

    let names: Vec<String> = manifest
        .licenses
        .as_ref()?
        .iter()
        .map(|l| clean_field(l.name()))
        .filter(|l| !l.is_empty())
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.join(" OR "))
    }
}

#[async_trait]
impl PackageEnumerator for NpmEnumerator {
    fn name(&self) -> &'static str {
        "NPM Packages"
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Npm
    }

    async fn list_installed(&self, ctx: &dyn ExecContext) -> Result<Vec<RawPackage>> {
        let mut packages = Vec::new();
        let mut seen = HashSet::new();
        let mut listed_any = false;
        let mut last_error = None;

        // The host's global tree says nothing about an alternate root.
        if ctx.command_root().is_some() {
            debug!("skipping global npm packages under an alternate root");
        } else {
            match self.list_global(ctx).await {
                Ok((global_root, global)) => {
                    listed_any = true;
                    self.collect(ctx, &global_root, global, &mut seen, &mut packages)
                        .await;
                }
                Err(e) => {
                    debug!(error = %e, "global npm listing failed");
                    last_error = Some(e);
                }
            }
        }

        for dir in &self.project_dirs {
            let dir = dir.trim_end_matches('/');
            if !ctx
                .exists(&format!("{}/package.json", dir), self.file_timeout)
                .await
            {
                continue;
            }

            let prefix = command_path(ctx, dir);
            let args = ["list", "--json", "--depth=0", "--prefix", prefix.as_str()];
            match self.list_dependencies(ctx, &args).await {
                Ok(deps) => {
                    listed_any = true;
                    let node_modules = format!("{}/node_modules", dir);
                    self.collect(ctx, &node_modules, deps, &mut seen, &mut packages)
                        .await;
                }
                Err(e) => {
                    debug!(dir, error = %e, "npm project listing failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !listed_any => Err(e),
            _ => Ok(packages),
        }
    }
}
