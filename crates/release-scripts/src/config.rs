//! Release configuration loaded from `release.toml`.
use color_eyre::eyre::{Context, Result};
use log::*;
use release_tools::config::{
    DEFAULT_CHANGELOG_FILE, DEFAULT_RELEASE_BRANCH, DEFAULT_REMOTE,
    DEFAULT_TAG_PREFIX, DEFAULT_VERSION_FILE,
};
use serde::Deserialize;
use std::{fs, path::Path};

/// Optional configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Static settings for one release run
pub struct ReleaseConfig {
    /// Branch the release must be cut from and that gets pushed.
    ///
    /// default: `master`
    pub release_branch: String,
    /// Manifest holding the version field. The only file committed by the
    /// release commit.
    ///
    /// default: `package.json`
    pub version_file: String,
    /// default: `CHANGELOG.md`
    pub changelog_file: String,
    /// Remote receiving the push and hosting the release page.
    ///
    /// default: `origin`
    pub remote: String,
    /// default: `v`
    pub tag_prefix: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            release_branch: DEFAULT_RELEASE_BRANCH.to_string(),
            version_file: DEFAULT_VERSION_FILE.to_string(),
            changelog_file: DEFAULT_CHANGELOG_FILE.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }
}

/// Load `release.toml` from `dir`, falling back to defaults when absent.
pub fn load_config(dir: &Path) -> Result<ReleaseConfig> {
    let path = dir.join(DEFAULT_CONFIG_FILE);

    if !path.exists() {
        debug!("no configuration found: using default");
        return Ok(ReleaseConfig::default());
    }

    let content = fs::read_to_string(&path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;

    let config: ReleaseConfig = toml::from_str(&content)
        .wrap_err_with(|| format!("failed to parse {}", path.display()))?;

    debug!("loaded configuration: {config:#?}");

    Ok(config)
}
