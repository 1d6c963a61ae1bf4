use crate::application::errors::InstallationError;
use crate::application::registry::InstallationRegistry;
use crate::domain::installations::InstallationRecord;

#[derive(Debug, Clone, Default)]
pub struct InstallationListing {
    pub packages: Vec<InstallationRecord>,
    pub snippets: Vec<InstallationRecord>,
    pub active_theme: Option<String>,
}

pub struct ListInstallations<'a> {
    pub registry: InstallationRegistry<'a>,
}

impl<'a> ListInstallations<'a> {
    pub async fn execute(&self) -> Result<InstallationListing, InstallationError> {
        Ok(InstallationListing {
            packages: self.registry.list().await?,
            snippets: self.registry.list_snippets().await?,
            active_theme: self.registry.active_theme().await?,
        })
    }
}
