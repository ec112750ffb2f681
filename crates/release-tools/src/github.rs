//! GitHub release pages.
use git_url_parse::GitUrl;
use log::*;
use octocrab::Octocrab;
use secrecy::SecretString;
use semver::Version;
use std::path::PathBuf;

use crate::{
    config,
    error::{ReleaseToolsError, Result},
    git::GitRepository,
};

const GITHUB_HOST: &str = "github.com";

/// Owner and name of a GitHub hosted repository, parsed from a git remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub scheme: String,
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RemoteRepo {
    /// Parse an https or ssh remote url.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = GitUrl::parse(url)?;

        let host = parsed.host.ok_or_else(|| {
            ReleaseToolsError::invalid_remote(format!(
                "unable to parse host from remote: {url}"
            ))
        })?;

        let owner = parsed.owner.ok_or_else(|| {
            ReleaseToolsError::invalid_remote(format!(
                "unable to parse owner from remote: {url}"
            ))
        })?;

        let scheme = match parsed.scheme {
            git_url_parse::Scheme::Http => "http",
            _ => "https",
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            owner,
            repo: parsed.name,
        })
    }

    /// Browser url of the repository.
    pub fn web_url(&self) -> String {
        format!("{}://{}/{}/{}", self.scheme, self.host, self.owner, self.repo)
    }

    /// REST api base for GitHub Enterprise hosts, `None` for github.com.
    fn enterprise_api_url(&self) -> Option<String> {
        if self.host == GITHUB_HOST {
            return None;
        }
        Some(format!("{}://{}/api/v3", self.scheme, self.host))
    }
}

/// Inputs for creating a release page.
#[derive(Debug, Clone)]
pub struct CreateReleaseOptions {
    pub cwd: PathBuf,
    pub token: Option<SecretString>,
    pub version: Version,
    pub description: String,
    pub remote: String,
    pub tag_prefix: String,
}

fn build_client(token: SecretString, remote: &RemoteRepo) -> Result<Octocrab> {
    let mut builder = Octocrab::builder().personal_token(token);

    if let Some(api_url) = remote.enterprise_api_url() {
        debug!("using enterprise api: {api_url}");
        builder = builder.base_uri(api_url)?;
    }

    Ok(builder.build()?)
}

/// Create a published release for the version tag and return its url.
pub async fn create_github_release(
    options: CreateReleaseOptions,
) -> Result<String> {
    let token = options.token.ok_or_else(|| {
        ReleaseToolsError::missing_token("a token is required to create a release")
    })?;

    let remote_url =
        GitRepository::open(&options.cwd)?.remote_url(&options.remote)?;
    let remote = RemoteRepo::parse(&remote_url)?;

    let instance = build_client(token, &remote)?;

    let tag = config::tag_name(&options.tag_prefix, &options.version);

    info!("creating release {tag} for {}/{}", remote.owner, remote.repo);

    let release = instance
        .repos(&remote.owner, &remote.repo)
        .releases()
        .create(&tag)
        .name(&tag)
        .body(&options.description)
        .draft(false)
        .prerelease(false)
        .send()
        .await?;

    Ok(release.html_url.to_string())
}
