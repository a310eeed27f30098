use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

use crate::model::{LicenseSource, ScanReport};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "License")]
    license: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "Packages")]
    count: usize,
}

/// Renders the human-readable report: one table per manager, then a summary.
pub fn render_table(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Image:            {}", report.image);
    let _ = writeln!(
        out,
        "Scanned at:       {}",
        report.scan_date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Operating system: {}", report.operating_system);
    let _ = writeln!(out, "OS family:        {}", report.os_family);
    let _ = writeln!(out);

    if let Some(note) = &report.note {
        let _ = writeln!(out, "Image type: minimal/distroless");
        let _ = writeln!(out, "{}", note);
        let _ = writeln!(out);
    } else if report.packages.is_empty() {
        let _ = writeln!(out, "No packages found.");
        let _ = writeln!(out);
    }

    for (manager, packages) in report.packages_by_manager() {
        let _ = writeln!(
            out,
            "{} packages ({}):",
            manager.display_name(),
            packages.len()
        );

        let rows: Vec<PackageRow> = packages
            .iter()
            .map(|p| PackageRow {
                name: truncate(&p.name, 40),
                version: truncate(&p.version, 30),
                license: truncate(&p.license, 50),
                source: p.license_source.display_name().to_string(),
            })
            .collect();

        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Copyright files harvested: {}",
        report.copyright_files.len()
    );
    let _ = writeln!(out);

    if !report.packages.is_empty() {
        out.push_str(&render_summary(report));
    }

    out
}

fn render_summary(report: &ScanReport) -> String {
    let mut rows: Vec<SummaryRow> = report
        .packages_by_manager()
        .into_iter()
        .map(|(manager, packages)| SummaryRow {
            label: manager.display_name().to_string(),
            count: packages.len(),
        })
        .collect();

    rows.extend(
        [
            LicenseSource::Native,
            LicenseSource::CopyrightFile,
            LicenseSource::FallbackTable,
            LicenseSource::GenericDefault,
        ]
        .into_iter()
        .map(|source| SummaryRow {
            label: format!("via {}", source.display_name()),
            count: report.count_by_source(source),
        }),
    );

    rows.push(SummaryRow {
        label: "Total".to_string(),
        count: report.packages.len(),
    });

    let mut out = String::from("Summary:\n");
    let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));

    let unknown = report.unknown_count();
    if unknown > 0 {
        let _ = writeln!(out, "{} package(s) have an unknown license.", unknown);
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ManagerKind, Package};

    #[test]
    fn test_table_groups_by_manager() {
        let mut report = ScanReport::new("debian:12");
        report.packages = vec![
            Package::new("bash", "5.2", ManagerKind::Apt, "GPL-3.0", LicenseSource::CopyrightFile),
            Package::new("left-pad", "1.3.0", ManagerKind::Npm, "WTFPL", LicenseSource::Native),
        ];

        let text = render_table(&report);
        assert!(text.contains("APT packages (1):"));
        assert!(text.contains("NPM packages (1):"));
        assert!(text.contains("GPL-3.0"));
        assert!(text.contains("Summary:"));
        assert!(text.contains("Total"));
    }

    #[test]
    fn test_table_shows_distroless_note() {
        let mut report = ScanReport::new("gcr.io/distroless/static");
        report.mark_distroless();

        let text = render_table(&report);
        assert!(text.contains("minimal/distroless"));
        assert!(!text.contains("Summary:"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
