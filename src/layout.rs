//! Well-known locations inside a Linux image.
//!
//! These are the paths the probe, the resolver and the harvester look at.
//! All paths are absolute inside the scanned filesystem.

use crate::model::ManagerKind;

const BIN_DIRS: [&str; 6] = [
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
    "/usr/local/bin",
    "/usr/local/sbin",
];

/// Canonical binary that proves a manager is installed.
pub fn manager_binary(kind: ManagerKind) -> Option<&'static str> {
    match kind {
        ManagerKind::Apt => Some("dpkg"),
        ManagerKind::Rpm => Some("rpm"),
        ManagerKind::Apk => Some("apk"),
        ManagerKind::Npm => Some("npm"),
        ManagerKind::Unknown => None,
    }
}

/// Every location where the manager's binary may live, most common first.
pub fn manager_binary_candidates(kind: ManagerKind) -> Vec<String> {
    match manager_binary(kind) {
        Some(binary) => BIN_DIRS
            .iter()
            .map(|dir| format!("{}/{}", dir, binary))
            .collect(),
        None => Vec::new(),
    }
}

/// `os-release` files, in lookup order.
pub const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// dpkg's database directory.
pub const DPKG_ADMIN_DIR: &str = "/var/lib/dpkg";

/// Debian-style per-package copyright file.
pub fn debian_copyright_path(package: &str) -> String {
    format!("/usr/share/doc/{}/copyright", package)
}

/// Directory of full license texts shipped by Debian's base-files.
pub const COMMON_LICENSES_DIR: &str = "/usr/share/common-licenses/";

/// Conventional directories expected to be dense in license files.
pub const LICENSE_DIRS: [&str; 9] = [
    "/usr/share/doc",
    "/usr/share/licenses",
    "/usr/share/common-licenses",
    "/usr/local/share/doc",
    "/usr/local/share/licenses",
    "/usr/lib/node_modules",
    "/usr/local/lib/node_modules",
    "/opt",
    "/app",
];

/// Pseudo filesystems skipped when walking a live host.
pub const SKIPPED_DIRS: [&str; 4] = ["proc", "sys", "dev", "run"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_binary_candidates() {
        let candidates = manager_binary_candidates(ManagerKind::Apk);
        assert_eq!(candidates.len(), BIN_DIRS.len());
        assert!(candidates.contains(&"/sbin/apk".to_string()));
        assert!(manager_binary_candidates(ManagerKind::Unknown).is_empty());
    }

    #[test]
    fn test_debian_copyright_path() {
        assert_eq!(
            debian_copyright_path("adduser"),
            "/usr/share/doc/adduser/copyright"
        );
    }
}
