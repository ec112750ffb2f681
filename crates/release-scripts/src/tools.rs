//! The release tooling as seen by the release pipeline.
use async_trait::async_trait;
use color_eyre::eyre::{Result, eyre};
use release_tools::{
    CommitAndTagOptions, CreateReleaseOptions, PushOptions, ValidateOptions,
};
use secrecy::SecretString;
use semver::Version;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

use crate::config::ReleaseConfig;

/// Operations the release scripts delegate to the release tooling.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReleaseTools: Send + Sync {
    /// Latest version recorded in the changelog.
    fn get_last_from_changelog(&self) -> Result<Version>;
    /// Changelog entries written for `version`.
    fn get_changes_for_version(&self, version: &Version) -> Result<Option<String>>;
    /// One message per problem that blocks releasing `version`.
    async fn validate_repository_to_release(
        &self,
        version: &Version,
        changes: Option<String>,
        branch: &str,
    ) -> Result<Vec<String>>;
    async fn update_versions(&self, version: &Version) -> Result<()>;
    async fn commit_and_tag(
        &self,
        version: &Version,
        files: Vec<String>,
    ) -> Result<()>;
    async fn push(&self, release_branch: &str, version: &Version) -> Result<()>;
    /// Create the release page and return its url.
    async fn create_github_release(
        &self,
        token: Option<SecretString>,
        version: &Version,
        description: &str,
    ) -> Result<String>;
    async fn provide_token(&self) -> Result<SecretString>;
}

/// [`ReleaseTools`] backed by the `release-tools` crate, operating on the
/// repository in `cwd`.
pub struct Toolkit {
    cwd: PathBuf,
    config: ReleaseConfig,
}

impl Toolkit {
    pub fn new(cwd: PathBuf, config: ReleaseConfig) -> Self {
        Self { cwd, config }
    }
}

#[async_trait]
impl ReleaseTools for Toolkit {
    fn get_last_from_changelog(&self) -> Result<Version> {
        release_tools::get_last_from_changelog(&self.cwd, &self.config.changelog_file)?
            .ok_or_else(|| {
                eyre!(
                    "no released version found in {}",
                    self.config.changelog_file
                )
            })
    }

    fn get_changes_for_version(&self, version: &Version) -> Result<Option<String>> {
        Ok(release_tools::get_changes_for_version(
            &self.cwd,
            &self.config.changelog_file,
            version,
        )?)
    }

    async fn validate_repository_to_release(
        &self,
        version: &Version,
        changes: Option<String>,
        branch: &str,
    ) -> Result<Vec<String>> {
        Ok(release_tools::validate_repository_to_release(&ValidateOptions {
            cwd: self.cwd.clone(),
            version: version.clone(),
            changes,
            branch: branch.to_string(),
            tag_prefix: self.config.tag_prefix.clone(),
        })?)
    }

    async fn update_versions(&self, version: &Version) -> Result<()> {
        Ok(release_tools::update_versions(
            &self.cwd,
            &self.config.version_file,
            version,
        )?)
    }

    async fn commit_and_tag(
        &self,
        version: &Version,
        files: Vec<String>,
    ) -> Result<()> {
        Ok(release_tools::commit_and_tag(&CommitAndTagOptions {
            cwd: self.cwd.clone(),
            version: version.clone(),
            files,
            tag_prefix: self.config.tag_prefix.clone(),
        })?)
    }

    async fn push(&self, release_branch: &str, version: &Version) -> Result<()> {
        Ok(release_tools::push(&PushOptions {
            cwd: self.cwd.clone(),
            remote: self.config.remote.clone(),
            release_branch: release_branch.to_string(),
            version: version.clone(),
            tag_prefix: self.config.tag_prefix.clone(),
        })?)
    }

    async fn create_github_release(
        &self,
        token: Option<SecretString>,
        version: &Version,
        description: &str,
    ) -> Result<String> {
        let url = release_tools::create_github_release(CreateReleaseOptions {
            cwd: self.cwd.clone(),
            token,
            version: version.clone(),
            description: description.to_string(),
            remote: self.config.remote.clone(),
            tag_prefix: self.config.tag_prefix.clone(),
        })
        .await?;

        Ok(url)
    }

    async fn provide_token(&self) -> Result<SecretString> {
        Ok(release_tools::provide_token()?)
    }
}
