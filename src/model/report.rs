use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LicenseSource, ManagerKind, Package};

pub const DISTROLESS_NOTE: &str = "No package manager was detected. This looks like a minimal or \
distroless image: package licenses cannot be enumerated, only harvested copyright files are reported.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "minimal/distroless")]
    MinimalDistroless,
}

/// A license/notice file harvested from the scanned filesystem.
///
/// `original_path` is absolute inside the scanned filesystem and unique
/// within a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyrightFile {
    pub original_path: String,
    pub size_bytes: u64,
    pub extracted_relative_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub image: String,
    pub scan_date: DateTime<Utc>,
    pub operating_system: String,
    pub os_family: String,
    pub image_type: ImageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub package_managers: Vec<ManagerKind>,
    pub packages: Vec<Package>,
    pub copyright_files: Vec<CopyrightFile>,
}

impl ScanReport {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            scan_date: Utc::now(),
            operating_system: "unknown".to_string(),
            os_family: "unknown".to_string(),
            image_type: ImageType::Standard,
            note: None,
            package_managers: Vec::new(),
            packages: Vec::new(),
            copyright_files: Vec::new(),
        }
    }

    /// Annotates the report as the distroless terminal state.
    pub fn mark_distroless(&mut self) {
        self.image_type = ImageType::MinimalDistroless;
        self.note = Some(DISTROLESS_NOTE.to_string());
        self.package_managers.clear();
        self.packages.clear();
    }

    pub fn is_distroless(&self) -> bool {
        self.image_type == ImageType::MinimalDistroless
    }

    pub fn set_copyright_files(&mut self, mut files: Vec<CopyrightFile>) {
        files.sort_by(|a, b| a.original_path.cmp(&b.original_path));
        self.copyright_files = files;
    }

    /// Packages grouped by manager, keeping discovery order within each group.
    pub fn packages_by_manager(&self) -> Vec<(ManagerKind, Vec<&Package>)> {
        let mut groups: Vec<(ManagerKind, Vec<&Package>)> = Vec::new();
        for package in &self.packages {
            match groups.iter_mut().find(|(kind, _)| *kind == package.manager) {
                Some((_, members)) => members.push(package),
                None => groups.push((package.manager, vec![package])),
            }
        }
        groups
    }

    pub fn source_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for package in &self.packages {
            *counts.entry(package.license_source.as_str()).or_default() += 1;
        }
        counts
    }

    pub fn count_by_source(&self, source: LicenseSource) -> usize {
        self.packages
            .iter()
            .filter(|p| p.license_source == source)
            .count()
    }

    pub fn unknown_count(&self) -> usize {
        self.packages.iter().filter(|p| p.is_unknown()).count()
    }
}
