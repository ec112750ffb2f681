//! Defaults shared by the release tooling.

/// Branch releases are cut from.
pub const DEFAULT_RELEASE_BRANCH: &str = "master";
/// Manifest whose `version` field declares the package version.
pub const DEFAULT_VERSION_FILE: &str = "package.json";
/// Changelog maintained for the package.
pub const DEFAULT_CHANGELOG_FILE: &str = "CHANGELOG.md";
/// Remote that receives pushes and hosts the release page.
pub const DEFAULT_REMOTE: &str = "origin";
/// Prefix prepended to versions to form tag names.
pub const DEFAULT_TAG_PREFIX: &str = "v";
/// Environment variable consulted before prompting for a token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Tag name for `version` using `prefix`.
pub fn tag_name(prefix: &str, version: &semver::Version) -> String {
    format!("{prefix}{version}")
}

/// Commit message used for the release commit.
pub fn release_commit_message(version: &semver::Version) -> String {
    format!("Release: v{version}.")
}
