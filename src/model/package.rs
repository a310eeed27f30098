use serde::{Deserialize, Serialize};

/// Sentinel emitted when no strategy, not even the fallback table, produced a license.
pub const UNKNOWN_LICENSE: &str = "Unknown";

/// Sentinel used by the fallback table's catch-all: open source, exact license unspecified.
pub const OSI_APPROVED_LICENSE: &str = "OSI-Approved";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    Apt,
    Rpm,
    Apk,
    Npm,
    Unknown,
}

impl ManagerKind {
    /// Manager kinds the probe looks for, in report order.
    pub const PROBED: [ManagerKind; 4] = [
        ManagerKind::Apt,
        ManagerKind::Rpm,
        ManagerKind::Apk,
        ManagerKind::Npm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerKind::Apt => "apt",
            ManagerKind::Rpm => "rpm",
            ManagerKind::Apk => "apk",
            ManagerKind::Npm => "npm",
            ManagerKind::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ManagerKind::Apt => "APT",
            ManagerKind::Rpm => "RPM",
            ManagerKind::Apk => "APK",
            ManagerKind::Npm => "NPM",
            ManagerKind::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for ManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apt" | "dpkg" | "deb" => Ok(ManagerKind::Apt),
            "rpm" | "yum" | "dnf" => Ok(ManagerKind::Rpm),
            "apk" => Ok(ManagerKind::Apk),
            "npm" => Ok(ManagerKind::Npm),
            _ => Err(format!(
                "Unknown package manager: {}. Use: apt, rpm, apk, npm",
                s
            )),
        }
    }
}

/// The strategy that produced a package's license string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseSource {
    Native,
    CopyrightFile,
    FallbackTable,
    GenericDefault,
}

impl LicenseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseSource::Native => "native",
            LicenseSource::CopyrightFile => "copyright_file",
            LicenseSource::FallbackTable => "fallback_table",
            LicenseSource::GenericDefault => "generic_default",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LicenseSource::Native => "Native",
            LicenseSource::CopyrightFile => "Copyright file",
            LicenseSource::FallbackTable => "Fallback table",
            LicenseSource::GenericDefault => "Generic default",
        }
    }
}

impl std::fmt::Display for LicenseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of running the resolution chain for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseResolution {
    pub license: String,
    pub source: LicenseSource,
}

impl LicenseResolution {
    pub fn new(license: impl Into<String>, source: LicenseSource) -> Self {
        Self {
            license: license.into(),
            source,
        }
    }

    pub fn generic_default() -> Self {
        Self::new(UNKNOWN_LICENSE, LicenseSource::GenericDefault)
    }
}

/// An installed package with its resolved license.
///
/// Identity is `(name, version, manager)`. Packages are built once the
/// resolver has run and are not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(rename = "package_manager")]
    pub manager: ManagerKind,
    pub license: String,
    pub license_source: LicenseSource,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        manager: ManagerKind,
        license: impl Into<String>,
        license_source: LicenseSource,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            manager,
            license: license.into(),
            license_source,
        }
    }

    pub fn from_resolution(
        name: impl Into<String>,
        version: impl Into<String>,
        manager: ManagerKind,
        resolution: LicenseResolution,
    ) -> Self {
        Self::new(name, version, manager, resolution.license, resolution.source)
    }

    pub fn identity(&self) -> (&str, &str, ManagerKind) {
        (&self.name, &self.version, self.manager)
    }

    pub fn is_unknown(&self) -> bool {
        self.license == UNKNOWN_LICENSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_manager_kind_from_str_aliases() {
        assert_eq!(ManagerKind::from_str("dpkg"), Ok(ManagerKind::Apt));
        assert_eq!(ManagerKind::from_str("RPM"), Ok(ManagerKind::Rpm));
        assert_eq!(ManagerKind::from_str("apk"), Ok(ManagerKind::Apk));
        assert!(ManagerKind::from_str("pacman").is_err());
    }

    #[test]
    fn test_package_serializes_manager_as_package_manager() {
        let package = Package::new(
            "bash",
            "5.0-6.el8",
            ManagerKind::Rpm,
            "GPLv3+",
            LicenseSource::Native,
        );
        let json = serde_json::to_value(&package).unwrap();

        assert_eq!(json["package_manager"], "rpm");
        assert_eq!(json["license_source"], "native");
        assert_eq!(json["license"], "GPLv3+");
    }

    #[test]
    fn test_generic_default_is_unknown_sentinel() {
        let resolution = LicenseResolution::generic_default();
        assert_eq!(resolution.license, UNKNOWN_LICENSE);
        assert_eq!(resolution.source, LicenseSource::GenericDefault);
    }
}
