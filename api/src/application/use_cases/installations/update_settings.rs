use crate::application::errors::InstallationError;
use crate::application::registry::{InstallationRegistry, SettingsPatch};
use crate::application::webhook_auth::generate_webhook_secret;
use crate::domain::installations::InstallationRecord;

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub webhook_secret: Option<String>,
    /// Replaces the secret with a freshly generated one. Wins over `webhook_secret`.
    pub regenerate_secret: bool,
    pub name: Option<String>,
}

pub struct UpdateInstallationSettings<'a> {
    pub registry: InstallationRegistry<'a>,
}

impl<'a> UpdateInstallationSettings<'a> {
    pub async fn execute(
        &self,
        id: &str,
        update: SettingsUpdate,
    ) -> Result<InstallationRecord, InstallationError> {
        let webhook_secret = if update.regenerate_secret {
            Some(generate_webhook_secret())
        } else {
            update.webhook_secret.map(|s| s.trim().to_string())
        };
        let name = update.name.map(|n| n.trim().to_string());

        if let Some(record) = self.registry.find_by_id(id).await? {
            if name.is_some() && !record.is_snippet() {
                return Err(InstallationError::InvalidRequest(
                    "only snippet installations carry a display name".into(),
                ));
            }
        }

        let record = self
            .registry
            .update_installation(
                id,
                SettingsPatch {
                    webhook_secret,
                    name,
                },
            )
            .await?;
        tracing::info!(id = %record.id, "installation_settings_updated");
        Ok(record)
    }
}
