use std::path::PathBuf;

use crate::application::errors::InstallationError;
use crate::application::ports::package_fetcher::PackageFetcher;
use crate::application::ports::package_installer::PackageInstaller;
use crate::application::registry::InstallationRegistry;
use crate::application::repository::RepositoryResolver;
use crate::domain::installations::installation::DEFAULT_BRANCH;
use crate::domain::installations::{InstallationRecord, PackageKind};

#[derive(Debug, Clone)]
pub struct InstallRequest<'r> {
    pub kind: PackageKind,
    pub repository_url: &'r str,
    pub branch: &'r str,
    pub access_token: &'r str,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub record: InstallationRecord,
    pub path: PathBuf,
    pub message: String,
}

pub struct InstallFromRepository<'a, F, I>
where
    F: PackageFetcher + ?Sized,
    I: PackageInstaller + ?Sized,
{
    pub resolver: &'a RepositoryResolver,
    pub fetcher: &'a F,
    pub installer: &'a I,
    pub registry: InstallationRegistry<'a>,
}

impl<'a, F, I> InstallFromRepository<'a, F, I>
where
    F: PackageFetcher + ?Sized,
    I: PackageInstaller + ?Sized,
{
    pub async fn execute(&self, req: InstallRequest<'_>) -> Result<InstallOutcome, InstallationError> {
        let branch = match req.branch.trim() {
            "" => DEFAULT_BRANCH,
            b => b,
        };
        let access_token = req.access_token.trim();
        let resolved = self.resolver.resolve(req.repository_url, branch)?;

        tracing::info!(
            kind = %req.kind,
            slug = %resolved.slug,
            branch = %branch,
            "package_install_started"
        );

        let token = Some(access_token).filter(|t| !t.is_empty());
        let archive = self.fetcher.fetch(&resolved.download_url, token).await?;
        let path = self
            .installer
            .install(req.kind, &resolved.slug, &archive)
            .await?;

        let record = self
            .registry
            .record_installation(
                req.kind,
                &resolved.slug,
                req.repository_url.trim(),
                branch,
                access_token,
            )
            .await?;

        tracing::info!(
            id = %record.id,
            kind = %req.kind,
            slug = %record.slug,
            path = %path.display(),
            "package_installed"
        );

        let message = format!(
            "{} \"{}\" installed successfully.",
            req.kind.label(),
            resolved.slug
        );
        Ok(InstallOutcome {
            record,
            path,
            message,
        })
    }
}
