use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};

use crate::application::errors::InstallationError;
use crate::application::ports::package_fetcher::PackageFetcher;

const INSTALLER_USER_AGENT: &str = "FlyGit-Installer";

pub struct ReqwestPackageFetcher {
    client: reqwest::Client,
}

impl ReqwestPackageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PackageFetcher for ReqwestPackageFetcher {
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, InstallationError> {
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, "application/zip")
            .header(USER_AGENT, INSTALLER_USER_AGENT);
        if let Some(t) = token.map(str::trim).filter(|t| !t.is_empty()) {
            req = req.header(AUTHORIZATION, format!("token {t}"));
        }
        let resp = req
            .send()
            .await
            .map_err(|e| InstallationError::DownloadFailed(anyhow::anyhow!("request failed: {e}")))?;
        let status = resp.status().as_u16();
        if status != 200 {
            tracing::warn!(status, url = %url, "package_download_rejected");
            return Err(InstallationError::HttpStatusError {
                status,
                message: format!("Download failed with status code {status}."),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| {
            InstallationError::DownloadFailed(anyhow::anyhow!("failed to read body: {e}"))
        })?;
        if bytes.is_empty() {
            return Err(InstallationError::EmptyResponseBody);
        }
        tracing::debug!(size = bytes.len(), "package_downloaded");
        Ok(bytes.to_vec())
    }
}
