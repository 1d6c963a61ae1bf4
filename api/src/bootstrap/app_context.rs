use std::sync::Arc;

use crate::application::ports::option_store::OptionStore;
use crate::application::ports::package_fetcher::PackageFetcher;
use crate::application::ports::package_installer::PackageInstaller;
use crate::application::ports::repository_content::RepositoryContentApi;
use crate::application::ports::snippet_storage::SnippetStorage;
use crate::application::registry::InstallationRegistry;
use crate::application::repository::RepositoryResolver;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    option_store: Arc<dyn OptionStore>,
    package_fetcher: Arc<dyn PackageFetcher>,
    package_installer: Arc<dyn PackageInstaller>,
    repository_content: Arc<dyn RepositoryContentApi>,
    snippet_storage: Arc<dyn SnippetStorage>,
    resolver: RepositoryResolver,
}

impl AppServices {
    pub fn new(
        option_store: Arc<dyn OptionStore>,
        package_fetcher: Arc<dyn PackageFetcher>,
        package_installer: Arc<dyn PackageInstaller>,
        repository_content: Arc<dyn RepositoryContentApi>,
        snippet_storage: Arc<dyn SnippetStorage>,
        resolver: RepositoryResolver,
    ) -> Self {
        Self {
            option_store,
            package_fetcher,
            package_installer,
            repository_content,
            snippet_storage,
            resolver,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn option_store(&self) -> Arc<dyn OptionStore> {
        self.services.option_store.clone()
    }

    pub fn package_fetcher(&self) -> Arc<dyn PackageFetcher> {
        self.services.package_fetcher.clone()
    }

    pub fn package_installer(&self) -> Arc<dyn PackageInstaller> {
        self.services.package_installer.clone()
    }

    pub fn repository_content(&self) -> Arc<dyn RepositoryContentApi> {
        self.services.repository_content.clone()
    }

    pub fn snippet_storage(&self) -> Arc<dyn SnippetStorage> {
        self.services.snippet_storage.clone()
    }

    pub fn resolver(&self) -> &RepositoryResolver {
        &self.services.resolver
    }

    /// Registry view over the configured option store.
    pub fn registry(&self) -> InstallationRegistry<'_> {
        InstallationRegistry::new(
            self.services.option_store.as_ref(),
            self.cfg.active_theme.as_deref(),
        )
    }
}
