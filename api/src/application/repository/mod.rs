use reqwest::Url;

use crate::application::errors::InstallationError;
use crate::domain::installations::slug::sanitize_key;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepository {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepository {
    pub slug: String,
    pub download_url: String,
    pub github: Option<GithubRepository>,
}

/// Turns repository URLs into an installation slug and an archive download URL.
#[derive(Debug, Clone)]
pub struct RepositoryResolver {
    api_base: String,
}

impl Default for RepositoryResolver {
    fn default() -> Self {
        Self::new(DEFAULT_GITHUB_API_BASE)
    }
}

impl RepositoryResolver {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Derives the install slug and zip download URL for a repository.
    ///
    /// `.zip` basenames go through `sanitize_key` like every other slug, so
    /// `Fancy.Plugin.zip` installs as `fancyplugin`.
    pub fn resolve(
        &self,
        repository_url: &str,
        branch: &str,
    ) -> Result<ResolvedRepository, InstallationError> {
        let repository_url = repository_url.trim();
        let parsed = parse_with_host(repository_url)?;
        let host = parsed.host_str().unwrap_or_default();

        let (slug, download_url, github) = if repository_url.ends_with(".zip") {
            let base = last_segment(&parsed);
            let base = base.strip_suffix(".zip").unwrap_or(&base).to_string();
            (sanitize_key(&base), repository_url.to_string(), None)
        } else if host.contains("github.com") {
            let github = github_segments(&parsed)?;
            let download_url = format!(
                "{}/repos/{}/{}/zipball/{}",
                self.api_base,
                urlencoding::encode(&github.owner),
                urlencoding::encode(&github.repo),
                urlencoding::encode(branch),
            );
            (sanitize_key(&github.repo), download_url, Some(github))
        } else {
            (
                sanitize_key(&last_segment(&parsed)),
                repository_url.to_string(),
                None,
            )
        };

        if slug.is_empty() {
            return Err(InstallationError::InvalidSlug);
        }

        Ok(ResolvedRepository {
            slug,
            download_url,
            github,
        })
    }

    /// Owner and repository name of a GitHub URL. Other hosts are rejected.
    pub fn parse_github(&self, repository_url: &str) -> Result<GithubRepository, InstallationError> {
        let parsed = parse_with_host(repository_url.trim())?;
        let host = parsed.host_str().unwrap_or_default();
        if !host.contains("github.com") {
            return Err(InstallationError::InvalidRepository(
                "only GitHub repositories are supported for snippets".into(),
            ));
        }
        github_segments(&parsed)
    }
}

fn parse_with_host(repository_url: &str) -> Result<Url, InstallationError> {
    let parsed = Url::parse(repository_url)
        .map_err(|_| InstallationError::InvalidRepository(repository_url.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(InstallationError::InvalidRepository(repository_url.to_string())),
    }
}

fn decoded_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|d| d.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn last_segment(url: &Url) -> String {
    decoded_segments(url).pop().unwrap_or_default()
}

fn github_segments(url: &Url) -> Result<GithubRepository, InstallationError> {
    let segments = decoded_segments(url);
    if segments.len() < 2 {
        return Err(InstallationError::InvalidRepository(
            "unable to determine repository owner and name".into(),
        ));
    }
    let owner = segments[0].clone();
    let repo = segments[1]
        .strip_suffix(".git")
        .unwrap_or(&segments[1])
        .to_string();
    if owner.is_empty() || repo.is_empty() {
        return Err(InstallationError::InvalidRepository(
            "unable to determine repository owner and name".into(),
        ));
    }
    Ok(GithubRepository { owner, repo })
}
