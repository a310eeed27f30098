//! Scan orchestration.
//!
//! A scan runs probe → enumerate → resolve → report, then harvests
//! copyright files into the same report. Only establishing the execution
//! context can fail; everything here degrades instead of erroring.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{Config, IgnoreConfig};
use crate::enumerator::{enumerator_for, EnumeratorOptions, RawPackage};
use crate::exec::ExecContext;
use crate::harvest::Harvester;
use crate::license::LicenseResolver;
use crate::model::{ManagerKind, Package, ScanReport};
use crate::probe::{detect_os, ManagerProbe};

pub struct ScanPipeline {
    probe: ManagerProbe,
    enumerator_options: EnumeratorOptions,
    resolver: LicenseResolver,
    harvester: Option<Harvester>,
    copyright_dir: PathBuf,
    ignore: IgnoreConfig,
    parallel: bool,
    concurrency: usize,
}

impl ScanPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            probe: ManagerProbe::new(config.probe_timeout()),
            enumerator_options: config.enumerator_options(),
            resolver: LicenseResolver::new(config.fallback_table(), config.file_timeout()),
            harvester: config
                .harvest
                .enabled
                .then(|| Harvester::new(config.harvest_options())),
            copyright_dir: config.copyright_dir(),
            ignore: config.ignore.clone(),
            parallel: config.parallel,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Runs the full scan of `ctx`, labelling the report with `image`.
    pub async fn run(&self, ctx: &dyn ExecContext, image: &str) -> ScanReport {
        let mut report = self.scan_packages(ctx, image).await;
        self.harvest(ctx, &mut report).await;
        report
    }

    /// Detects the OS and package managers, then lists and resolves every
    /// installed package. With no manager detected the report is marked as
    /// a distroless image.
    pub async fn scan_packages(&self, ctx: &dyn ExecContext, image: &str) -> ScanReport {
        let mut report = ScanReport::new(image);

        let os = detect_os(ctx, self.enumerator_options.file_timeout).await;
        report.operating_system = os.name;
        report.os_family = os.family;

        let managers = self.probe.detect(ctx).await;
        if managers.is_empty() {
            info!(context = %ctx.describe(), "no package manager detected");
            report.mark_distroless();
            return report;
        }
        info!(
            managers = ?managers.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            "package managers detected"
        );
        report.package_managers = managers.clone();

        let listed = self.enumerate(ctx, &managers).await;
        report.packages = self.resolve_all(ctx, listed).await;
        report
    }

    /// Mirrors copyright files into the configured directory. Skipped when
    /// harvesting is disabled or the context has no host filesystem.
    pub async fn harvest(&self, ctx: &dyn ExecContext, report: &mut ScanReport) {
        let Some(harvester) = &self.harvester else {
            return;
        };
        let Some(root) = ctx.filesystem_root() else {
            debug!(context = %ctx.describe(), "no filesystem to harvest");
            return;
        };

        let files = harvester.harvest(root, &self.copyright_dir).await;
        report.set_copyright_files(files);
    }

    async fn enumerate(
        &self,
        ctx: &dyn ExecContext,
        managers: &[ManagerKind],
    ) -> Vec<(ManagerKind, Vec<RawPackage>)> {
        if self.parallel && managers.len() > 1 {
            join_all(managers.iter().map(|kind| self.enumerate_one(ctx, *kind))).await
        } else {
            let mut listed = Vec::with_capacity(managers.len());
            for kind in managers {
                listed.push(self.enumerate_one(ctx, *kind).await);
            }
            listed
        }
    }

    async fn enumerate_one(
        &self,
        ctx: &dyn ExecContext,
        kind: ManagerKind,
    ) -> (ManagerKind, Vec<RawPackage>) {
        let Some(enumerator) = enumerator_for(kind, &self.enumerator_options) else {
            return (kind, Vec::new());
        };

        match enumerator.list_installed(ctx).await {
            Ok(packages) => {
                debug!(manager = %kind, count = packages.len(), "packages listed");
                (kind, packages)
            }
            Err(e) => {
                warn!(manager = %kind, error = %e, "package listing failed");
                (kind, Vec::new())
            }
        }
    }

    /// Resolves licenses with bounded concurrency, keeping listing order.
    async fn resolve_all(
        &self,
        ctx: &dyn ExecContext,
        listed: Vec<(ManagerKind, Vec<RawPackage>)>,
    ) -> Vec<Package> {
        let pending: Vec<(ManagerKind, RawPackage)> = listed
            .into_iter()
            .flat_map(|(kind, packages)| packages.into_iter().map(move |p| (kind, p)))
            .filter(|(_, p)| !self.ignore.should_ignore_package(&p.name))
            .collect();

        stream::iter(pending)
            .map(|(kind, raw)| async move {
                let resolution = self.resolver.resolve(ctx, &raw, kind).await;
                Package::from_resolution(raw.name, raw.version, kind, resolution)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockContext;
    use crate::exec::LocalContext;
    use crate::model::{ImageType, LicenseSource, OSI_APPROVED_LICENSE};
    use std::fs;
    use tempfile::TempDir;

    const DPKG_QUERY: &str = "dpkg-query -W -f=${Package}\t${Version}\t${db:Status-Abbrev}\n";

    fn config(output: &TempDir) -> Config {
        Config {
            output_dir: output.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn debian_context() -> MockContext {
        MockContext::new()
            .with_file("/usr/bin/dpkg", "")
            .with_file(
                "/etc/os-release",
                "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n",
            )
            .with_file(
                "/usr/share/doc/libfoo1/copyright",
                "This library is under the GNU Lesser General Public License version 2.1\n",
            )
            .with_command(
                DPKG_QUERY,
                "adduser\t3.134\tii \nlibfoo1\t1.0\tii \nmystery-tool\t0.1\tii \nremoved\t1.0\trc \n",
            )
    }

    #[tokio::test]
    async fn test_no_manager_is_distroless() {
        let out = TempDir::new().unwrap();
        let ctx = MockContext::new();

        let report = ScanPipeline::from_config(&config(&out))
            .run(&ctx, "gcr.io/distroless/static")
            .await;

        assert_eq!(report.image_type, ImageType::MinimalDistroless);
        assert!(report.packages.is_empty());
        assert!(report.package_managers.is_empty());
        assert!(report.note.is_some());
        assert_eq!(report.operating_system, "unknown");
    }

    #[tokio::test]
    async fn test_debian_image_resolution_chain() {
        let out = TempDir::new().unwrap();
        let ctx = debian_context();

        let report = ScanPipeline::from_config(&config(&out))
            .run(&ctx, "debian:12")
            .await;

        assert_eq!(report.image_type, ImageType::Standard);
        assert_eq!(report.operating_system, "Debian GNU/Linux 12 (bookworm)");
        assert_eq!(report.os_family, "debian");
        assert_eq!(report.package_managers, vec![ManagerKind::Apt]);

        let names: Vec<&str> = report.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["adduser", "libfoo1", "mystery-tool"]);

        assert_eq!(report.packages[0].license, "GPL-2.0");
        assert_eq!(report.packages[0].license_source, LicenseSource::FallbackTable);
        assert_eq!(report.packages[1].license, "LGPL-2.1");
        assert_eq!(report.packages[1].license_source, LicenseSource::CopyrightFile);
        assert_eq!(report.packages[2].license, OSI_APPROVED_LICENSE);

        assert!(report.packages.iter().all(|p| !p.license.is_empty()));
        // the mock has no host filesystem
        assert!(report.copyright_files.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_packages_are_dropped() {
        let out = TempDir::new().unwrap();
        let mut config = config(&out);
        config.ignore.packages = vec!["mystery-*".to_string()];

        let report = ScanPipeline::from_config(&config)
            .run(&debian_context(), "debian:12")
            .await;

        assert!(report.packages.iter().all(|p| p.name != "mystery-tool"));
        assert_eq!(report.packages.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_fallback_rule_in_config_is_ignored() {
        let out = TempDir::new().unwrap();
        let mut config = config(&out);
        config.fallback = vec![
            crate::license::FallbackRule::new("adduser", ""),
            crate::license::FallbackRule::new("*", "  "),
        ];

        let report = ScanPipeline::from_config(&config)
            .run(&debian_context(), "debian:12")
            .await;

        assert!(report.packages.iter().all(|p| !p.license.trim().is_empty()));
        assert_eq!(report.packages[0].license, "GPL-2.0");
        assert_eq!(report.packages[2].license, OSI_APPROVED_LICENSE);
    }

    #[tokio::test]
    async fn test_failed_listing_degrades_to_empty() {
        let out = TempDir::new().unwrap();
        let ctx = MockContext::new()
            .with_file("/usr/bin/dpkg", "")
            .with_timeout(DPKG_QUERY);

        let report = ScanPipeline::from_config(&config(&out))
            .run(&ctx, "debian:12")
            .await;

        assert_eq!(report.image_type, ImageType::Standard);
        assert_eq!(report.package_managers, vec![ManagerKind::Apt]);
        assert!(report.packages.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let out = TempDir::new().unwrap();
        let mut config = config(&out);

        let parallel = ScanPipeline::from_config(&config)
            .scan_packages(&debian_context(), "debian:12")
            .await;
        config.parallel = false;
        config.concurrency = 1;
        let sequential = ScanPipeline::from_config(&config)
            .scan_packages(&debian_context(), "debian:12")
            .await;

        assert_eq!(parallel.packages, sequential.packages);
    }

    #[tokio::test]
    async fn test_local_root_is_harvested() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let doc = root.path().join("usr/share/doc/adduser");
        fs::create_dir_all(&doc).unwrap();
        fs::write(doc.join("copyright"), "GPL-2\n").unwrap();

        let ctx = LocalContext::with_root(root.path()).unwrap();
        let report = ScanPipeline::from_config(&config(&out))
            .run(&ctx, "rootfs")
            .await;

        assert!(report.is_distroless());
        assert_eq!(report.copyright_files.len(), 1);
        assert_eq!(
            report.copyright_files[0].original_path,
            "/usr/share/doc/adduser/copyright"
        );
        assert!(out
            .path()
            .join("copyright_files/usr/share/doc/adduser/copyright")
            .exists());
    }

    #[tokio::test]
    async fn test_local_root_never_reports_host_packages() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("usr/bin")).unwrap();
        fs::write(root.path().join("usr/bin/dpkg"), "").unwrap();
        fs::create_dir_all(root.path().join("var/lib/dpkg")).unwrap();

        let ctx = LocalContext::with_root(root.path()).unwrap();
        let report = ScanPipeline::from_config(&config(&out))
            .scan_packages(&ctx, "rootfs")
            .await;

        // The rootfs has dpkg but an empty database.
        assert_eq!(report.package_managers, vec![ManagerKind::Apt]);
        assert!(report.packages.is_empty());
    }

    #[tokio::test]
    async fn test_harvest_can_be_disabled() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(root.path().join("LICENSE"), "MIT\n").unwrap();

        let mut config = config(&out);
        config.harvest.enabled = false;
        let ctx = LocalContext::with_root(root.path()).unwrap();
        let report = ScanPipeline::from_config(&config).run(&ctx, "rootfs").await;

        assert!(report.copyright_files.is_empty());
    }
}
