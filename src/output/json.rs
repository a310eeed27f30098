use crate::model::ScanReport;
use anyhow::Result;

pub fn render_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CopyrightFile, LicenseSource, ManagerKind, Package};

    #[test]
    fn test_json_document_shape() {
        let mut report = ScanReport::new("alpine:3.19");
        report.operating_system = "Alpine Linux v3.19".to_string();
        report.os_family = "alpine".to_string();
        report.packages = vec![Package::new(
            "musl",
            "1.2.4-r2",
            ManagerKind::Apk,
            "MIT",
            LicenseSource::Native,
        )];
        report.set_copyright_files(vec![CopyrightFile {
            original_path: "/usr/share/licenses/musl/COPYRIGHT".to_string(),
            size_bytes: 42,
            extracted_relative_path: "usr/share/licenses/musl/COPYRIGHT".to_string(),
        }]);

        let json: serde_json::Value =
            serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["image"], "alpine:3.19");
        assert!(json["scan_date"].is_string());
        assert_eq!(json["operating_system"], "Alpine Linux v3.19");
        assert_eq!(json["os_family"], "alpine");
        assert_eq!(json["packages"][0]["name"], "musl");
        assert_eq!(json["packages"][0]["package_manager"], "apk");
        assert_eq!(json["packages"][0]["license_source"], "native");
        assert_eq!(json["copyright_files"][0]["size_bytes"], 42);
    }
}
