//! Candidate selection for each harvest pass.

use super::index::{FileIndex, IndexedFile};
use crate::config::glob_match;
use crate::layout::LICENSE_DIRS;

/// File names that conventionally hold license or attribution text.
pub const CANONICAL_NAMES: [&str; 19] = [
    "copyright",
    "COPYRIGHT",
    "Copyright",
    "COPYING",
    "copying",
    "LICENSE",
    "license",
    "License",
    "LICENCE",
    "licence",
    "NOTICE",
    "notice",
    "AUTHORS",
    "authors",
    "CREDITS",
    "credits",
    "LEGAL",
    "legal",
    "COPYING.LIB",
];

/// Lower-cased name globs used inside license-dense directories.
pub const DIRECTORY_PATTERNS: [&str; 7] = [
    "*license*",
    "*licence*",
    "*copying*",
    "*copyright*",
    "*notice*",
    "*legal*",
    "*.spdx",
];

/// Content keywords; a sniffed file needs the first and one of the rest.
pub const SNIFF_REQUIRED: &str = "copyright";
pub const SNIFF_ANY: [&str; 5] = [
    "license",
    "licence",
    "all rights reserved",
    "permission is hereby granted",
    "public domain",
];

const SNIFF_EXTENSIONS: [&str; 4] = ["txt", "md", "rst", "text"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestPass {
    ExactName,
    SubstringName,
    Directory,
    ContentSniff,
}

impl HarvestPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestPass::ExactName => "exact-name",
            HarvestPass::SubstringName => "substring-name",
            HarvestPass::Directory => "directory",
            HarvestPass::ContentSniff => "content-sniff",
        }
    }
}

impl std::fmt::Display for HarvestPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Files named exactly like a canonical name, at most `cap` per name.
pub fn exact_name_candidates(index: &FileIndex, cap: usize) -> Vec<&IndexedFile> {
    CANONICAL_NAMES
        .iter()
        .flat_map(|name| {
            index
                .files()
                .iter()
                .filter(move |f| f.file_name == *name)
                .take(cap)
        })
        .collect()
}

/// Files whose name contains a canonical name, at most `cap` per name.
pub fn substring_name_candidates(index: &FileIndex, cap: usize) -> Vec<&IndexedFile> {
    CANONICAL_NAMES
        .iter()
        .flat_map(|name| {
            index
                .files()
                .iter()
                .filter(move |f| f.file_name.contains(name))
                .take(cap)
        })
        .collect()
}

/// Files under conventional license directories matching a license-like
/// pattern, at most `cap` per pattern.
pub fn directory_candidates(index: &FileIndex, cap: usize) -> Vec<&IndexedFile> {
    DIRECTORY_PATTERNS
        .iter()
        .flat_map(|pattern| {
            index
                .files()
                .iter()
                .filter(move |f| {
                    LICENSE_DIRS.iter().any(|dir| f.is_under(dir))
                        && glob_match(pattern, &f.file_name.to_lowercase())
                })
                .take(cap)
        })
        .collect()
}

/// Plain-text and README-like files small enough to read.
pub fn sniff_candidates(index: &FileIndex, max_bytes: u64) -> Vec<&IndexedFile> {
    index
        .files()
        .iter()
        .filter(|f| f.size > 0 && f.size <= max_bytes && is_sniffable(&f.file_name))
        .collect()
}

fn is_sniffable(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    if lower.starts_with("readme") {
        return true;
    }
    lower
        .rsplit_once('.')
        .is_some_and(|(_, ext)| SNIFF_EXTENSIONS.contains(&ext))
}

/// True if `content` reads like a license or copyright notice.
pub fn looks_like_notice(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains(SNIFF_REQUIRED) && SNIFF_ANY.iter().any(|kw| lower.contains(kw))
}
