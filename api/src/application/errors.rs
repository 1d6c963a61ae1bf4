/// Failures surfaced by installation, snippet import and webhook flows.
#[derive(thiserror::Error, Debug)]
pub enum InstallationError {
    #[error("invalid repository url: {0}")]
    InvalidRepository(String),
    #[error("unable to determine installation slug")]
    InvalidSlug,
    #[error("failed to download repository content")]
    DownloadFailed(#[source] anyhow::Error),
    #[error("{message}")]
    HttpStatusError { status: u16, message: String },
    #[error("repository download returned an empty response")]
    EmptyResponseBody,
    #[error("unable to extract the downloaded package")]
    ExtractionFailed(#[source] anyhow::Error),
    #[error("{0}")]
    MissingSourceContent(String),
    #[error("filesystem operation failed")]
    FilesystemPermission(#[source] anyhow::Error),
    #[error("installation {0} not found")]
    InstallationNotFound(String),
    #[error("the active theme cannot be uninstalled")]
    ActiveThemeUninstallBlocked,
    #[error("unable to write {target}")]
    WriteFailed {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid webhook secret")]
    AuthenticationFailed,
    #[error("failed to access the installation registry")]
    Registry(#[source] anyhow::Error),
    #[error("{0}")]
    InvalidRequest(String),
}

impl InstallationError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            InstallationError::InvalidRepository(_) => "invalid_repository",
            InstallationError::InvalidSlug => "invalid_slug",
            InstallationError::DownloadFailed(_) => "download_failed",
            InstallationError::HttpStatusError { .. } => "http_status_error",
            InstallationError::EmptyResponseBody => "empty_response_body",
            InstallationError::ExtractionFailed(_) => "extraction_failed",
            InstallationError::MissingSourceContent(_) => "missing_source_content",
            InstallationError::FilesystemPermission(_) => "filesystem_permission",
            InstallationError::InstallationNotFound(_) => "installation_not_found",
            InstallationError::ActiveThemeUninstallBlocked => "active_theme_uninstall_blocked",
            InstallationError::WriteFailed { .. } => "write_failed",
            InstallationError::AuthenticationFailed => "authentication_failed",
            InstallationError::Registry(_) => "registry_failed",
            InstallationError::InvalidRequest(_) => "invalid_request",
        }
    }
}
