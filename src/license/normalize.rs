//! Free-text license normalization.
//!
//! Matching is substring based: text mentioning "GPL" and containing a
//! "3" anywhere becomes `GPL-3.0`. Dual-licensed prose such as
//! "GPLv3 or LGPLv2.1" is classified by the first family that matches.

/// Normalizes free text into a short license token, or `None` when no
/// known family is mentioned.
pub fn normalize_license(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    if has_token(text, "AGPL") || lower.contains("affero") {
        return Some("AGPL-3.0".to_string());
    }

    if has_token(text, "LGPL")
        || lower.contains("lesser general public")
        || lower.contains("library general public")
    {
        let version = if text.contains("2.1") {
            "LGPL-2.1"
        } else if text.contains('3') {
            "LGPL-3.0"
        } else if text.contains('2') {
            "LGPL-2.0"
        } else {
            "LGPL"
        };
        return Some(version.to_string());
    }

    if has_token(text, "GPL") || lower.contains("general public license") {
        let version = if text.contains('3') {
            "GPL-3.0"
        } else if text.contains('2') {
            "GPL-2.0"
        } else {
            "GPL"
        };
        return Some(version.to_string());
    }

    if has_token(text, "MIT") || lower.contains("expat") {
        return Some("MIT".to_string());
    }

    if has_token(text, "BSD") {
        let version = if lower.contains("4-clause") || lower.contains("bsd-4") {
            "BSD-4-Clause"
        } else if lower.contains("3-clause") || lower.contains("bsd-3") {
            "BSD-3-Clause"
        } else if lower.contains("2-clause") || lower.contains("bsd-2") {
            "BSD-2-Clause"
        } else {
            "BSD"
        };
        return Some(version.to_string());
    }

    if lower.contains("apache") {
        let version = if text.contains('2') {
            "Apache-2.0"
        } else if text.contains("1.1") {
            "Apache-1.1"
        } else {
            "Apache"
        };
        return Some(version.to_string());
    }

    if lower.contains("mozilla") || has_token(text, "MPL") {
        let version = if text.contains('2') {
            "MPL-2.0"
        } else if text.contains("1.1") {
            "MPL-1.1"
        } else {
            "MPL"
        };
        return Some(version.to_string());
    }

    if has_token(text, "ISC") {
        return Some("ISC".to_string());
    }

    if lower.contains("zlib") {
        return Some("Zlib".to_string());
    }

    if lower.contains("artistic") {
        let version = if text.contains('2') {
            "Artistic-2.0"
        } else {
            "Artistic-1.0"
        };
        return Some(version.to_string());
    }

    None
}

/// True if `token` occurs in `text` without a letter directly before it,
/// so `MIT` does not match inside `LIMITED` and `GPL` not inside `LGPL`.
pub(crate) fn has_token(text: &str, token: &str) -> bool {
    text.match_indices(token).any(|(index, _)| {
        !text[..index]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphabetic())
    })
}
