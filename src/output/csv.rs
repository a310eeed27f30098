use crate::model::ScanReport;

pub const CSV_HEADER: &str = "package_name,version,license,package_manager";

/// Renders packages as CSV. Every field is quoted and embedded quotes are
/// doubled, so commas and newlines in license text survive.
pub fn render_csv(report: &ScanReport) -> String {
    let mut out = String::with_capacity(64 * (report.packages.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for package in &report.packages {
        let fields = [
            quote(&package.name),
            quote(&package.version),
            quote(&package.license),
            quote(package.manager.as_str()),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
