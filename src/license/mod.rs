//! License resolution.
//!
//! - [`normalize`] - free text to short license tokens
//! - [`copyright`] - Debian `copyright` file parsing
//! - [`fallback`] - the static package-name table
//! - [`resolver`] - the chain tying them together

pub mod copyright;
pub mod fallback;
pub mod normalize;
pub mod resolver;

pub use copyright::extract_copyright_license;
pub use fallback::{FallbackRule, FallbackTable};
pub use normalize::normalize_license;
pub use resolver::{LicenseResolver, ResolutionStage};
