//! Error types for the release tooling.

use thiserror::Error;

/// Main error type for release tooling operations.
#[derive(Error, Debug)]
pub enum ReleaseToolsError {
    // Manifest errors
    #[error("Unsupported version file: {0}")]
    UnsupportedVersionFile(String),

    #[error("No version field found in {0}")]
    VersionNotFound(String),

    // Forge/Git errors
    #[error("Missing GitHub token: {0}")]
    MissingToken(String),

    #[error("Invalid git remote: {0}")]
    InvalidRemote(String),

    #[error("Git URL parse error: {0}")]
    GitUrlError(#[from] git_url_parse::GitUrlParseError),

    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    // Network/API errors
    #[error("GitHub request failed: {0}")]
    GithubError(#[from] octocrab::Error),

    // Version/parsing errors
    #[error("Invalid version format: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("TOML edit error: {0}")]
    TomlEditError(#[from] toml_edit::TomlError),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias using ReleaseToolsError
pub type Result<T> = std::result::Result<T, ReleaseToolsError>;

impl ReleaseToolsError {
    /// Create an invalid remote error
    pub fn invalid_remote(msg: impl Into<String>) -> Self {
        Self::InvalidRemote(msg.into())
    }

    /// Create a missing token error
    pub fn missing_token(msg: impl Into<String>) -> Self {
        Self::MissingToken(msg.into())
    }
}
