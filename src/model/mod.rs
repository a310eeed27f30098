//! Core data types for packages, license resolution, and scan reports.
//!
//! - [`Package`] - An installed package with its resolved license
//! - [`ManagerKind`] - The package manager a package came from
//! - [`LicenseResolution`] - Which strategy produced a license
//! - [`CopyrightFile`] - A harvested license/notice file
//! - [`ScanReport`] - Everything a scan produced, ready for serializers
//!
//! # Example
//!
//! ```
//! use licenscan::{LicenseSource, ManagerKind, Package, ScanReport};
//!
//! let package = Package::new("adduser", "3.118", ManagerKind::Apt, "GPL-2.0", LicenseSource::FallbackTable);
//! let mut report = ScanReport::new("debian:12");
//! report.packages.push(package);
//!
//! println!("Resolved {} packages", report.packages.len());
//! ```

mod package;
mod report;

pub use package::*;
pub use report::*;
