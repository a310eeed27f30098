use std::time::Duration;
use tracing::trace;

use super::copyright::extract_copyright_license;
use super::fallback::FallbackTable;
use crate::enumerator::{clean_field, RawPackage};
use crate::exec::ExecContext;
use crate::layout::debian_copyright_path;
use crate::model::{LicenseResolution, LicenseSource, ManagerKind, UNKNOWN_LICENSE};

/// Resolution stages, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Native,
    CopyrightFile,
    FallbackTable,
    GenericDefault,
}

impl ResolutionStage {
    pub fn next(self) -> Option<Self> {
        match self {
            ResolutionStage::Native => Some(ResolutionStage::CopyrightFile),
            ResolutionStage::CopyrightFile => Some(ResolutionStage::FallbackTable),
            ResolutionStage::FallbackTable => Some(ResolutionStage::GenericDefault),
            ResolutionStage::GenericDefault => None,
        }
    }

    pub fn source(self) -> LicenseSource {
        match self {
            ResolutionStage::Native => LicenseSource::Native,
            ResolutionStage::CopyrightFile => LicenseSource::CopyrightFile,
            ResolutionStage::FallbackTable => LicenseSource::FallbackTable,
            ResolutionStage::GenericDefault => LicenseSource::GenericDefault,
        }
    }
}

/// Runs the resolution chain: native metadata, then the Debian copyright
/// file (APT only), then the fallback table, then the `Unknown` sentinel.
pub struct LicenseResolver {
    fallback: FallbackTable,
    file_timeout: Duration,
}

impl LicenseResolver {
    pub fn new(fallback: FallbackTable, file_timeout: Duration) -> Self {
        Self {
            fallback,
            file_timeout,
        }
    }

    pub fn fallback(&self) -> &FallbackTable {
        &self.fallback
    }

    /// Resolves a license for `package`. Always produces a non-empty license.
    pub async fn resolve(
        &self,
        ctx: &dyn ExecContext,
        package: &RawPackage,
        kind: ManagerKind,
    ) -> LicenseResolution {
        let mut stage = Some(ResolutionStage::Native);

        while let Some(current) = stage {
            if let Some(license) = self.attempt(ctx, current, package, kind).await {
                trace!(package = %package.name, ?current, %license, "license resolved");
                return LicenseResolution::new(license, current.source());
            }
            stage = current.next();
        }

        LicenseResolution::generic_default()
    }

    async fn attempt(
        &self,
        ctx: &dyn ExecContext,
        stage: ResolutionStage,
        package: &RawPackage,
        kind: ManagerKind,
    ) -> Option<String> {
        match stage {
            ResolutionStage::Native => package
                .native_license
                .as_deref()
                .map(clean_field)
                .filter(|license| !license.is_empty()),
            ResolutionStage::CopyrightFile if kind == ManagerKind::Apt => {
                let name = package.name.split(':').next().unwrap_or(&package.name);
                let text = ctx
                    .read_text(&debian_copyright_path(name), self.file_timeout)
                    .await?;
                extract_copyright_license(&text)
            }
            ResolutionStage::CopyrightFile => None,
            ResolutionStage::FallbackTable => self
                .fallback
                .lookup(&package.name)
                .map(|rule| rule.license.trim().to_string())
                .filter(|license| !license.is_empty()),
            ResolutionStage::GenericDefault => Some(UNKNOWN_LICENSE.to_string()),
        }
    }
}
