use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::errors::InstallationError;
use crate::domain::installations::PackageKind;

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Extracts `archive` and replaces the `<kind dir>/<slug>` directory with it.
    async fn install(
        &self,
        kind: PackageKind,
        slug: &str,
        archive: &[u8],
    ) -> Result<PathBuf, InstallationError>;

    /// Removes an installed package. Missing packages are not an error.
    async fn remove(&self, kind: PackageKind, slug: &str) -> Result<(), InstallationError>;
}
