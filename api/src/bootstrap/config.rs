use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::repository::DEFAULT_GITHUB_API_BASE;
use crate::application::use_cases::snippets::import_from_repository::DEFAULT_MAX_DEPTH;

const DEV_ADMIN_TOKEN: &str = "development-token-change-me";

/// Where the installation registry lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryBackend {
    Postgres { database_url: String },
    File { path: PathBuf },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_port: u16,
    pub registry_backend: RegistryBackend,
    pub plugins_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub snippets_dir: PathBuf,
    pub github_api_base: String,
    pub http_timeout: Duration,
    pub snippet_max_depth: usize,
    pub active_theme: Option<String>,
    pub admin_token: String,
    pub public_base_url: Option<String>,
    pub is_production: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let data_dir = PathBuf::from(env::var("FLYGIT_DATA_DIR").unwrap_or_else(|_| "./data".into()));
        let registry_backend = match non_empty_var("DATABASE_URL") {
            Some(database_url) => RegistryBackend::Postgres { database_url },
            None => RegistryBackend::File {
                path: data_dir.join("options.json"),
            },
        };
        let plugins_dir = non_empty_var("FLYGIT_PLUGINS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("plugins"));
        let themes_dir = non_empty_var("FLYGIT_THEMES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("themes"));
        let snippets_dir = non_empty_var("FLYGIT_SNIPPETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("fluent-snippet-storage"));
        let github_api_base = non_empty_var("FLYGIT_GITHUB_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.into());
        let http_timeout = Duration::from_secs(
            env::var("FLYGIT_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );
        let snippet_max_depth = env::var("FLYGIT_SNIPPET_MAX_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);
        let active_theme = non_empty_var("FLYGIT_ACTIVE_THEME");
        let admin_token = env::var("FLYGIT_ADMIN_TOKEN").unwrap_or_else(|_| DEV_ADMIN_TOKEN.into());
        let public_base_url = env::var("PUBLIC_BASE_URL").ok().and_then(|v| {
            let trimmed = v.trim();
            if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                Some(trimmed.trim_end_matches('/').to_string())
            } else {
                None
            }
        });
        let is_production = matches!(
            env::var("RUST_ENV").ok().as_deref(),
            Some("production") | Some("prod")
        );

        if is_production && (admin_token == DEV_ADMIN_TOKEN || admin_token.len() < 16) {
            anyhow::bail!("FLYGIT_ADMIN_TOKEN must be set to a strong secret in production");
        }
        if admin_token == DEV_ADMIN_TOKEN {
            tracing::warn!("default_admin_token_in_use");
        }

        Ok(Self {
            api_port,
            registry_backend,
            plugins_dir,
            themes_dir,
            snippets_dir,
            github_api_base,
            http_timeout,
            snippet_max_depth,
            active_theme,
            admin_token,
            public_base_url,
            is_production,
        })
    }

    pub fn uses_default_admin_token(&self) -> bool {
        self.admin_token == DEV_ADMIN_TOKEN
    }

    /// Public URL a repository host should deliver webhooks for `id` to.
    pub fn webhook_url(&self, id: &str) -> String {
        let base = self
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.api_port));
        format!("{base}/api/installations/{id}/webhook")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
