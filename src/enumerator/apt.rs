use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::{command_path, PackageEnumerator, RawPackage};
use crate::exec::ExecContext;
use crate::layout::DPKG_ADMIN_DIR;
use crate::model::ManagerKind;

pub(crate) const DPKG_QUERY_FORMAT: &str = "-f=${Package}\t${Version}\t${db:Status-Abbrev}\n";

/// Debian/Ubuntu packages via `dpkg-query`.
///
/// All name/version pairs come from a single query; licenses are left to
/// the resolver's copyright-file stage.
pub struct AptEnumerator {
    timeout: Duration,
}

impl AptEnumerator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PackageEnumerator for AptEnumerator {
    fn name(&self) -> &'static str {
        "APT/DPKG Packages"
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Apt
    }

    async fn list_installed(&self, ctx: &dyn ExecContext) -> Result<Vec<RawPackage>> {
        let admindir = ctx
            .command_root()
            .map(|_| format!("--admindir={}", command_path(ctx, DPKG_ADMIN_DIR)));
        let mut args: Vec<&str> = admindir.iter().map(String::as_str).collect();
        args.extend(["-W", DPKG_QUERY_FORMAT]);

        let output = ctx
            .run("dpkg-query", &args, self.timeout)
            .await
            .context("Failed to execute dpkg-query")?;

        if !output.success() && output.stdout.trim().is_empty() {
            bail!("dpkg-query failed: {}", output.stderr.trim());
        }

        Ok(parse_dpkg_query(&output.stdout))
    }
}

pub(crate) fn parse_dpkg_query(stdout: &str) -> Vec<RawPackage> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let version = fields.next().map(str::trim).unwrap_or_default();
            let status = fields.next().map(str::trim).unwrap_or("ii");

            // Removed packages whose config files remain show up as "rc".
            if name.is_empty() || !status.starts_with('i') {
                return None;
            }

            let version = if version.is_empty() { "unknown" } else { version };
            Some(RawPackage::new(name, version))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockContext;

    fn query_command() -> String {
        format!("dpkg-query -W {}", DPKG_QUERY_FORMAT)
    }

    #[test]
    fn test_parse_dpkg_query_skips_removed() {
        let packages = parse_dpkg_query(
            "adduser\t3.134\tii \nlibc6\t2.36-9+deb12u4\tii \nold-tool\t1.0\trc \n\n",
        );

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0], RawPackage::new("adduser", "3.134"));
        assert_eq!(packages[1].version, "2.36-9+deb12u4");
        assert!(packages.iter().all(|p| p.native_license.is_none()));
    }

    #[tokio::test]
    async fn test_single_batched_query() {
        let ctx = MockContext::new().with_command(
            &query_command(),
            "adduser\t3.134\tii \nbash\t5.2.15-2+b2\tii \n",
        );

        let packages = AptEnumerator::new(Duration::from_secs(1))
            .list_installed(&ctx)
            .await
            .unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(ctx.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_alternate_root_selects_its_database() {
        let ctx = MockContext::new()
            .with_command_root("/srv/rootfs")
            .with_command(&query_command(), "hostpkg\t1.0\tii \n")
            .with_command(
                &format!(
                    "dpkg-query --admindir=/srv/rootfs/var/lib/dpkg -W {}",
                    DPKG_QUERY_FORMAT
                ),
                "adduser\t3.134\tii \n",
            );

        let packages = AptEnumerator::new(Duration::from_secs(1))
            .list_installed(&ctx)
            .await
            .unwrap();

        assert_eq!(packages, vec![RawPackage::new("adduser", "3.134")]);
    }

    #[tokio::test]
    async fn test_timeout_is_an_error_for_the_listing() {
        let ctx = MockContext::new().with_timeout(&query_command());
        let result = AptEnumerator::new(Duration::from_secs(1))
            .list_installed(&ctx)
            .await;
        assert!(result.is_err());
    }
}
