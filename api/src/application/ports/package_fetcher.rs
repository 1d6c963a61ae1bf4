use async_trait::async_trait;

use crate::application::errors::InstallationError;

#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Downloads an archive. Fails with `DownloadFailed`, `HttpStatusError`
    /// or `EmptyResponseBody`.
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, InstallationError>;
}
