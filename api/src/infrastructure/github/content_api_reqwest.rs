use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use crate::application::errors::InstallationError;
use crate::application::ports::repository_content::{
    DirectoryEntry, EntryKind, RepositoryContent, RepositoryContentApi, RepositoryRef,
};

const SNIPPETS_USER_AGENT: &str = "FlyGit-Snippets";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Item(ContentItem),
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// GitHub REST `contents` endpoint client.
pub struct ReqwestGithubContentApi {
    client: reqwest::Client,
    api_base: String,
}

impl ReqwestGithubContentApi {
    pub fn new(api_base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn contents_url(&self, repository: &RepositoryRef, path: &str) -> String {
        let encoded_path = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base,
            urlencoding::encode(&repository.owner),
            urlencoding::encode(&repository.repo),
            encoded_path,
            urlencoding::encode(&repository.branch),
        )
    }
}

fn entry_kind(kind: &str) -> EntryKind {
    match kind {
        "file" => EntryKind::File,
        "dir" => EntryKind::Dir,
        _ => EntryKind::Other,
    }
}

fn decode_content(item: ContentItem) -> Result<RepositoryContent, InstallationError> {
    let missing = || {
        InstallationError::MissingSourceContent(
            "GitHub did not return any content for the requested file.".into(),
        )
    };
    let content = item.content.filter(|c| !c.is_empty()).ok_or_else(missing)?;
    let encoding = item.encoding.filter(|e| !e.is_empty()).ok_or_else(missing)?;

    let bytes = if encoding == "base64" {
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|_| {
                InstallationError::MissingSourceContent(
                    "Unable to decode the file contents received from GitHub.".into(),
                )
            })?
    } else {
        content.into_bytes()
    };
    Ok(RepositoryContent::File {
        path: item.path,
        content: bytes,
    })
}

#[async_trait]
impl RepositoryContentApi for ReqwestGithubContentApi {
    async fn contents(
        &self,
        repository: &RepositoryRef,
        path: &str,
    ) -> Result<RepositoryContent, InstallationError> {
        let url = self.contents_url(repository, path);
        let mut req = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, SNIPPETS_USER_AGENT);
        if let Some(token) = repository.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            req = req.header(AUTHORIZATION, format!("token {token}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| InstallationError::DownloadFailed(anyhow::anyhow!("request failed: {e}")))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| {
            InstallationError::DownloadFailed(anyhow::anyhow!("failed to read body: {e}"))
        })?;

        if status != 200 {
            let message = serde_json::from_slice::<ApiError>(&body)
                .ok()
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("GitHub API responded with status code {status}."));
            tracing::warn!(status, path = %path, "github_contents_request_failed");
            return Err(InstallationError::HttpStatusError { status, message });
        }

        let parsed: ContentsResponse = serde_json::from_slice(&body).map_err(|e| {
            InstallationError::DownloadFailed(anyhow::anyhow!(
                "unexpected response received from GitHub: {e}"
            ))
        })?;

        match parsed {
            ContentsResponse::Listing(items) => Ok(RepositoryContent::Directory(
                items
                    .into_iter()
                    .map(|item| DirectoryEntry {
                        kind: entry_kind(&item.kind),
                        name: item.name,
                        path: item.path,
                    })
                    .collect(),
            )),
            ContentsResponse::Item(item) if item.kind == "file" || item.content.is_some() => {
                decode_content(item)
            }
            ContentsResponse::Item(item) => Err(InstallationError::MissingSourceContent(format!(
                "{} is not a file.",
                item.path
            ))),
        }
    }
}
