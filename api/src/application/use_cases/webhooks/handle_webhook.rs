use crate::application::errors::InstallationError;
use crate::application::ports::package_fetcher::PackageFetcher;
use crate::application::ports::package_installer::PackageInstaller;
use crate::application::ports::repository_content::RepositoryContentApi;
use crate::application::ports::snippet_storage::SnippetStorage;
use crate::application::registry::InstallationRegistry;
use crate::application::repository::RepositoryResolver;
use crate::application::use_cases::installations::install_from_repository::{
    InstallFromRepository, InstallRequest,
};
use crate::application::use_cases::snippets::import_from_repository::{
    ImportSnippetsFromRepository, SnippetImportRequest,
};
use crate::application::webhook_auth::{WebhookCredentials, is_authenticated};
use crate::domain::installations::InstallationKind;

/// Per-delivery values that take precedence over the stored record.
#[derive(Debug, Clone, Default)]
pub struct RepositoryOverrides {
    pub repository_url: Option<String>,
    pub branch: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub installation_id: String,
    pub credentials: WebhookCredentials,
    pub overrides: RepositoryOverrides,
}

/// Where a delivery failed. Lookup and authentication failures are the
/// caller's fault; `Sync` wraps anything that went wrong while re-installing.
#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("Installation identifier is required.")]
    MissingInstallation,
    #[error("The requested installation does not exist.")]
    NotFound,
    #[error("Invalid webhook secret.")]
    InvalidSecret,
    #[error("The installation is missing repository details.")]
    MissingRepository,
    #[error(transparent)]
    Lookup(InstallationError),
    #[error(transparent)]
    Sync(InstallationError),
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingInstallation => "missing_installation",
            WebhookError::NotFound => "installation_not_found",
            WebhookError::InvalidSecret => InstallationError::AuthenticationFailed.code(),
            WebhookError::MissingRepository => "missing_repository",
            WebhookError::Lookup(err) => err.code(),
            WebhookError::Sync(_) => "webhook_failed",
        }
    }
}

pub struct HandleWebhook<'a, F, I, C, S>
where
    F: PackageFetcher + ?Sized,
    I: PackageInstaller + ?Sized,
    C: RepositoryContentApi + ?Sized,
    S: SnippetStorage + ?Sized,
{
    pub resolver: &'a RepositoryResolver,
    pub fetcher: &'a F,
    pub installer: &'a I,
    pub contents: &'a C,
    pub storage: &'a S,
    pub registry: InstallationRegistry<'a>,
    pub snippet_max_depth: usize,
}

impl<'a, F, I, C, S> HandleWebhook<'a, F, I, C, S>
where
    F: PackageFetcher + ?Sized,
    I: PackageInstaller + ?Sized,
    C: RepositoryContentApi + ?Sized,
    S: SnippetStorage + ?Sized,
{
    /// Re-syncs the installation and returns the success message.
    pub async fn execute(&self, delivery: WebhookDelivery) -> Result<String, WebhookError> {
        let id = delivery.installation_id.trim();
        if id.is_empty() {
            return Err(WebhookError::MissingInstallation);
        }

        let record = self
            .registry
            .find_by_id(id)
            .await
            .map_err(WebhookError::Lookup)?
            .ok_or(WebhookError::NotFound)?;

        if !is_authenticated(&record.webhook_secret, &delivery.credentials) {
            tracing::warn!(id = %record.id, "webhook_authentication_failed");
            return Err(WebhookError::InvalidSecret);
        }

        if record.repository_url.trim().is_empty() {
            return Err(WebhookError::MissingRepository);
        }

        let overrides = delivery.overrides;
        let repository_url = pick(overrides.repository_url.as_deref(), &record.repository_url);
        let branch = pick(overrides.branch.as_deref(), &record.branch);
        let access_token = pick(overrides.access_token.as_deref(), &record.access_token);

        tracing::info!(
            id = %record.id,
            kind = record.kind.as_str(),
            branch = %branch,
            "webhook_sync_started"
        );

        let result = match &record.kind {
            InstallationKind::Plugin | InstallationKind::Theme => {
                let Some(kind) = record.kind.package_kind() else {
                    return Err(WebhookError::MissingRepository);
                };
                InstallFromRepository {
                    resolver: self.resolver,
                    fetcher: self.fetcher,
                    installer: self.installer,
                    registry: self.registry,
                }
                .execute(InstallRequest {
                    kind,
                    repository_url,
                    branch,
                    access_token,
                })
                .await
                .map(|outcome| outcome.message)
            }
            InstallationKind::Snippet(_) => ImportSnippetsFromRepository {
                resolver: self.resolver,
                contents: self.contents,
                storage: self.storage,
                registry: self.registry,
                max_depth: self.snippet_max_depth,
            }
            .execute(SnippetImportRequest {
                installation_id: Some(&record.id),
                repository_url,
                branch,
                access_token,
                name: None,
            })
            .await
            .map(|outcome| outcome.message),
        };

        result.map_err(|err| {
            tracing::error!(id = %record.id, error = ?err, "webhook_sync_failed");
            WebhookError::Sync(err)
        })
    }
}

fn pick<'s>(candidate: Option<&'s str>, stored: &'s str) -> &'s str {
    candidate
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::repository_content::EntryKind;
    use crate::application::registry::SettingsPatch;
    use crate::application::snippets::content::render_snippet;
    use crate::application::webhook_auth::sha256_signature;
    use crate::domain::installations::PackageKind;
    use crate::test_support::{
        FakeRepositoryContent, InMemoryOptionStore, InMemorySnippetStorage, RecordingInstaller,
        StaticFetcher,
    };

    struct Fixture {
        store: InMemoryOptionStore,
        fetcher: StaticFetcher,
        installer: RecordingInstaller,
        contents: FakeRepositoryContent,
        storage: InMemorySnippetStorage,
        resolver: RepositoryResolver,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryOptionStore::default(),
                fetcher: StaticFetcher::ok(b"zip".to_vec()),
                installer: RecordingInstaller::default(),
                contents: FakeRepositoryContent::default(),
                storage: InMemorySnippetStorage::default(),
                resolver: RepositoryResolver::default(),
            }
        }

        fn registry(&self) -> InstallationRegistry<'_> {
            InstallationRegistry::new(&self.store, None)
        }

        fn handler(&self) -> HandleWebhook<'_, StaticFetcher, RecordingInstaller, FakeRepositoryContent, InMemorySnippetStorage> {
            HandleWebhook {
                resolver: &self.resolver,
                fetcher: &self.fetcher,
                installer: &self.installer,
                contents: &self.contents,
                storage: &self.storage,
                registry: self.registry(),
                snippet_max_depth: 8,
            }
        }

        async fn plugin_with_secret(&self, secret: &str) -> String {
            let record = self
                .registry()
                .record_installation(PackageKind::Plugin, "hello", "https://github.com/acme/hello", "main", "stored")
                .await
                .unwrap();
            self.registry()
                .update_installation(
                    &record.id,
                    SettingsPatch {
                        webhook_secret: Some(secret.to_string()),
                        name: None,
                    },
                )
                .await
                .unwrap();
            record.id
        }
    }

    fn delivery(id: &str, credentials: WebhookCredentials) -> WebhookDelivery {
        WebhookDelivery {
            installation_id: id.to_string(),
            credentials,
            overrides: RepositoryOverrides::default(),
        }
    }

    #[tokio::test]
    async fn signed_delivery_reinstalls_plugin() {
        let fx = Fixture::new();
        let id = fx.plugin_with_secret("s").await;
        let credentials = WebhookCredentials {
            hub_signature_256: sha256_signature("s", b"{}"),
            raw_body: b"{}".to_vec(),
            ..Default::default()
        };

        let message = fx.handler().execute(delivery(&id, credentials)).await.unwrap();
        assert_eq!(message, "Plugin \"hello\" installed successfully.");
        assert_eq!(
            fx.fetcher.requests(),
            vec![(
                "https://api.github.com/repos/acme/hello/zipball/main".to_string(),
                Some("stored".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_without_download() {
        let fx = Fixture::new();
        let id = fx.plugin_with_secret("s").await;
        let credentials = WebhookCredentials {
            secret_header: Some("nope".into()),
            ..Default::default()
        };
        let err = fx.handler().execute(delivery(&id, credentials)).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSecret));
        assert!(fx.fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn overrides_take_precedence() {
        let fx = Fixture::new();
        let id = fx.plugin_with_secret("").await;
        let mut req = delivery(&id, WebhookCredentials::default());
        req.overrides = RepositoryOverrides {
            repository_url: None,
            branch: Some("release".into()),
            access_token: Some("  ".into()),
        };
        fx.handler().execute(req).await.unwrap();
        assert_eq!(
            fx.fetcher.requests(),
            vec![(
                "https://api.github.com/repos/acme/hello/zipball/release".to_string(),
                Some("stored".to_string())
            )]
        );
        let stored = fx.registry().find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.branch, "release");
        assert_eq!(stored.webhook_secret, "");
    }

    #[tokio::test]
    async fn lookup_errors_map_to_kinds() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.handler().execute(delivery(" ", WebhookCredentials::default())).await,
            Err(WebhookError::MissingInstallation)
        ));
        assert!(matches!(
            fx.handler().execute(delivery("unknown", WebhookCredentials::default())).await,
            Err(WebhookError::NotFound)
        ));
    }

    #[tokio::test]
    async fn install_failure_is_sync_error() {
        let mut fx = Fixture::new();
        fx.fetcher = StaticFetcher::status(500, "Download failed with status code 500.");
        let id = fx.plugin_with_secret("").await;
        let err = fx
            .handler()
            .execute(delivery(&id, WebhookCredentials::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Sync(InstallationError::HttpStatusError { status: 500, .. })));
        assert_eq!(err.code(), "webhook_failed");
        assert_eq!(err.to_string(), "Download failed with status code 500.");
    }

    #[tokio::test]
    async fn snippet_installation_is_reimported() {
        let mut fx = Fixture::new();
        fx.contents.dir("php", &[("hello.php", EntryKind::File)]);
        fx.contents.file("php/hello.php", b"<?php echo 1;");
        let record = fx
            .registry()
            .record_snippet_import(crate::application::registry::SnippetImportRecord {
                installation_id: None,
                slug: "demo".into(),
                name: None,
                repository_url: "https://github.com/acme/demo".into(),
                branch: "main".into(),
                access_token: String::new(),
                files: vec!["flygit-demo-hello.php".into()],
                sources: [("flygit-demo-hello.php".to_string(), "hello.php".to_string())].into(),
                imported_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        fx.storage.insert(
            "flygit-demo-hello.php",
            &render_snippet("flygit-demo-hello.php", b"old", chrono::Utc::now()),
        );

        let credentials = WebhookCredentials {
            gitlab_token: Some("anything".into()),
            ..Default::default()
        };
        let message = fx.handler().execute(delivery(&record.id, credentials)).await.unwrap();
        assert_eq!(message, "Imported 1 snippet from \"demo\".");
        assert!(fx.storage.get("flygit-demo-hello.php").unwrap().contains("echo 1;"));
    }
}
