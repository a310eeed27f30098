//! License extraction from Debian `copyright` files.

use super::normalize::normalize_license;
use crate::layout::COMMON_LICENSES_DIR;

/// Only this many leading lines are searched for a license keyword.
const KEYWORD_SCAN_LINES: usize = 50;

/// Extracts and normalizes the license a `copyright` file declares.
///
/// In order:
/// 1. machine-readable files (`Format: ...copyright-format...`): the first
///    `License:` field,
/// 2. a reference into `/usr/share/common-licenses/`: that file's name,
/// 3. the first of the leading lines mentioning a known license family.
pub fn extract_copyright_license(text: &str) -> Option<String> {
    let raw = if let Some(field) = structured_license_field(text) {
        field
    } else if let Some(name) = common_license_reference(text) {
        name
    } else {
        return text
            .lines()
            .take(KEYWORD_SCAN_LINES)
            .find_map(normalize_license);
    };

    normalize_license(&raw)
}

fn is_structured(text: &str) -> bool {
    text.lines().take(5).any(|line| {
        let lower = line.to_lowercase();
        lower.starts_with("format:")
            && (lower.contains("copyright-format") || lower.contains("dep5") || lower.contains("dep-5"))
    })
}

fn structured_license_field(text: &str) -> Option<String> {
    if !is_structured(text) {
        return None;
    }
    text.lines()
        .filter_map(|line| line.strip_prefix("License:"))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn common_license_reference(text: &str) -> Option<String> {
    let start = text.find(COMMON_LICENSES_DIR)? + COMMON_LICENSES_DIR.len();
    let name: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+' | '_'))
        .collect();
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = "\
Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/
Upstream-Name: zlib
Source: http://zlib.net/

Files: *
Copyright: 1995-2013 Jean-loup Gailly and Mark Adler
License: Zlib

Files: debian/*
License: GPL-2+
";

    const REFERENCE: &str = "\
This is Debian's adduser.

Copyright (C) 1997-2013 Guy Maor and others

This program is free software; you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by

On Debian systems, the complete text of the GNU General Public
License version 2 can be found in `/usr/share/common-licenses/GPL-2'.
";

    #[test]
    fn test_structured_takes_first_license_field() {
        assert_eq!(extract_copyright_license(STRUCTURED).as_deref(), Some("Zlib"));
    }

    #[test]
    fn test_common_licenses_reference() {
        assert_eq!(extract_copyright_license(REFERENCE).as_deref(), Some("GPL-2.0"));
        assert_eq!(common_license_reference(REFERENCE).as_deref(), Some("GPL-2"));
    }

    #[test]
    fn test_keyword_scan() {
        let text = "Copyright 2004 Someone\n\nThis library is distributed under the\nGNU Lesser General Public License version 2.1\n";
        assert_eq!(extract_copyright_license(text).as_deref(), Some("LGPL-2.1"));
    }

    #[test]
    fn test_keyword_scan_is_limited_to_leading_lines() {
        let mut text = "filler\n".repeat(KEYWORD_SCAN_LINES);
        text.push_str("Released under the MIT license\n");
        assert_eq!(extract_copyright_license(&text), None);
    }

    #[test]
    fn test_structured_without_known_family_is_unresolved() {
        let text = "Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/\n\nFiles: *\nLicense: public-domain\n";
        assert_eq!(extract_copyright_license(text), None);
    }
}
