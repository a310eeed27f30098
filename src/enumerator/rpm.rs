use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::{clean_field, command_root_arg, PackageEnumerator, RawPackage};
use crate::exec::ExecContext;
use crate::model::ManagerKind;

pub(crate) const RPM_QUERY_FORMAT: &str = "%{NAME}\t%{VERSION}-%{RELEASE}\t%{LICENSE}\n";

/// RHEL/Fedora/SUSE packages via `rpm -qa`. The license field is authoritative.
pub struct RpmEnumerator {
    timeout: Duration,
}

impl RpmEnumerator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PackageEnumerator for RpmEnumerator {
    fn name(&self) -> &'static str {
        "RPM Packages"
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Rpm
    }

    async fn list_installed(&self, ctx: &dyn ExecContext) -> Result<Vec<RawPackage>> {
        let root = command_root_arg(ctx);
        let mut args = Vec::new();
        if let Some(root) = &root {
            args.extend(["--root", root.as_str()]);
        }
        args.extend(["-qa", "--queryformat", RPM_QUERY_FORMAT]);

        let output = ctx
            .run("rpm", &args, self.timeout)
            .await
            .context("Failed to execute rpm")?;

        if !output.success() && output.stdout.trim().is_empty() {
            bail!("rpm query failed: {}", output.stderr.trim());
        }

        Ok(parse_rpm_query(&output.stdout))
    }
}

pub(crate) fn parse_rpm_query(stdout: &str) -> Vec<RawPackage> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let name = fields.next()?.trim();
            let version = fields.next().map(str::trim).unwrap_or("unknown");
            let license = fields.next().map(clean_field);

            // Imported signing keys are listed as packages.
            if name.is_empty() || name == "gpg-pubkey" {
                return None;
            }

            let license = license.filter(|l| l != "(none)");
            Some(RawPackage::new(name, version).with_license(license))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockContext;

    #[test]
    fn test_parse_rpm_query_native_license() {
        let packages = parse_rpm_query(
            "bash\t5.0-6.el8\tGNU General Public License v3.0 or later \nzlib\t1.2.11-25.el8\tzlib and Boost\n",
        );

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "bash");
        assert_eq!(packages[0].version, "5.0-6.el8");
        assert_eq!(
            packages[0].native_license.as_deref(),
            Some("GNU General Public License v3.0 or later")
        );
    }

    #[test]
    fn test_parse_rpm_query_skips_pubkeys_and_none() {
        let packages = parse_rpm_query(
            "gpg-pubkey\t8483c65d-5ccc5b19\tpubkey\nfilesystem\t3.8-6.el8\t(none)\n",
        );

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "filesystem");
        assert_eq!(packages[0].native_license, None);
    }

    #[tokio::test]
    async fn test_list_installed() {
        let ctx = MockContext::new().with_command(
            &format!("rpm -qa --queryformat {}", RPM_QUERY_FORMAT),
            "bash\t5.0-6.el8\tGPLv3+\n",
        );

        let packages = RpmEnumerator::new(Duration::from_secs(1))
            .list_installed(&ctx)
            .await
            .unwrap();

        assert_eq!(packages[0].native_license.as_deref(), Some("GPLv3+"));
    }

    #[tokio::test]
    async fn test_alternate_root_is_passed_to_rpm() {
        let ctx = MockContext::new()
            .with_command_root("/srv/rootfs")
            .with_command(
                &format!("rpm -qa --queryformat {}", RPM_QUERY_FORMAT),
                "hostpkg\t1.0-1\tMIT\n",
            )
            .with_command(
                &format!("rpm --root /srv/rootfs -qa --queryformat {}", RPM_QUERY_FORMAT),
                "bash\t5.0-6.el8\tGPLv3+\n",
            );

        let packages = RpmEnumerator::new(Duration::from_secs(1))
            .list_installed(&ctx)
            .await
            .unwrap();

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "bash");
    }
}
