use crate::application::errors::InstallationError;
use crate::application::ports::package_installer::PackageInstaller;
use crate::application::ports::snippet_storage::SnippetStorage;
use crate::application::registry::InstallationRegistry;
use crate::domain::installations::{InstallationKind, PackageKind};

pub struct UninstallInstallation<'a, I, S>
where
    I: PackageInstaller + ?Sized,
    S: SnippetStorage + ?Sized,
{
    pub installer: &'a I,
    pub snippets: &'a S,
    pub registry: InstallationRegistry<'a>,
}

impl<'a, I, S> UninstallInstallation<'a, I, S>
where
    I: PackageInstaller + ?Sized,
    S: SnippetStorage + ?Sized,
{
    /// Removes the installed files, then the registry record.
    pub async fn execute(&self, id: &str) -> Result<String, InstallationError> {
        let record = self
            .registry
            .find_by_id(id)
            .await?
            .ok_or_else(|| InstallationError::InstallationNotFound(id.to_string()))?;

        let message = match &record.kind {
            InstallationKind::Theme => {
                let active = self.registry.active_theme().await?;
                if active.as_deref() == Some(record.slug.as_str()) {
                    return Err(InstallationError::ActiveThemeUninstallBlocked);
                }
                self.installer.remove(PackageKind::Theme, &record.slug).await?;
                format!("Theme \"{}\" uninstalled successfully.", record.slug)
            }
            InstallationKind::Plugin => {
                self.installer.remove(PackageKind::Plugin, &record.slug).await?;
                format!("Plugin \"{}\" uninstalled successfully.", record.slug)
            }
            InstallationKind::Snippet(details) => {
                for file in &details.files {
                    let removed = self
                        .snippets
                        .remove(file)
                        .await
                        .map_err(InstallationError::FilesystemPermission)?;
                    if !removed {
                        tracing::debug!(file = %file, "snippet_file_already_missing");
                    }
                }
                format!(
                    "Snippet repository \"{}\" uninstalled successfully.",
                    record.display_name()
                )
            }
        };

        self.registry.remove(&record.id).await?;
        tracing::info!(id = %record.id, kind = record.kind.as_str(), slug = %record.slug, "installation_removed");
        Ok(message)
    }
}
