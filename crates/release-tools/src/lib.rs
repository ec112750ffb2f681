//! Release tooling: changelog handling, manifest version updates, git
//! release operations and GitHub release pages for a single package.
pub mod changelog;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod manifest;
pub mod release;
pub mod token;

pub use changelog::{
    GenerateChangelogOptions, GenerateChangelogOptionsBuilder,
    generate_changelog_for_single_package, get_changes_for_version,
    get_last_from_changelog,
};
pub use error::{ReleaseToolsError, Result};
pub use github::{CreateReleaseOptions, create_github_release};
pub use manifest::update_versions;
pub use release::{
    CommitAndTagOptions, PushOptions, ValidateOptions, commit_and_tag, push,
    validate_repository_to_release,
};
pub use token::provide_token;

#[cfg(test)]
pub mod test_helpers;
