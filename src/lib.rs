pub mod config;
pub mod enumerator;
pub mod error;
pub mod exec;
pub mod harvest;
pub mod layout;
pub mod license;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod probe;

pub use config::Config;
pub use enumerator::{PackageEnumerator, RawPackage};
pub use error::{ExecError, ScanError};
pub use exec::{ContainerContext, ExecContext, LocalContext};
pub use harvest::Harvester;
pub use license::{FallbackTable, LicenseResolver};
pub use model::{
    CopyrightFile, ImageType, LicenseResolution, LicenseSource, ManagerKind, Package, ScanReport,
};
pub use pipeline::ScanPipeline;
pub use probe::ManagerProbe;
