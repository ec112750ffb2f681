//! Repository checks and git mutations performed while releasing.
use log::*;
use semver::Version;
use std::path::PathBuf;

use crate::{
    config::{release_commit_message, tag_name},
    error::Result,
    git::GitRepository,
};

/// Inputs for [`validate_repository_to_release`].
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub cwd: PathBuf,
    pub version: Version,
    pub changes: Option<String>,
    pub branch: String,
    pub tag_prefix: String,
}

/// Inputs for [`commit_and_tag`].
#[derive(Debug, Clone)]
pub struct CommitAndTagOptions {
    pub cwd: PathBuf,
    pub version: Version,
    pub files: Vec<String>,
    pub tag_prefix: String,
}

/// Inputs for [`push`].
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub cwd: PathBuf,
    pub remote: String,
    pub release_branch: String,
    pub version: Version,
    pub tag_prefix: String,
}

/// Check that the repository can be released as `version`.
///
/// Returns one human readable message per problem found. An empty list means
/// the release may proceed.
pub fn validate_repository_to_release(
    options: &ValidateOptions,
) -> Result<Vec<String>> {
    let repo = GitRepository::open(&options.cwd)?;
    let mut errors = vec![];

    let current_branch = repo.current_branch()?;
    if current_branch.as_deref() != Some(options.branch.as_str()) {
        debug!(
            "current branch {current_branch:?} is not {}",
            options.branch
        );
        errors.push(format!("Not on the \"#{}\" branch.", options.branch));
    }

    let has_changes = options
        .changes
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());

    if !has_changes {
        errors.push(format!(
            "Cannot find changelog entries for version \"{}\".",
            options.version
        ));
    }

    if repo.is_behind_remote()? {
        errors.push("The branch is behind with the remote.".to_string());
    }

    if repo.has_uncommitted_changes()? {
        errors.push(
            "The working directory contains uncommitted changes.".to_string(),
        );
    }

    let tag = tag_name(&options.tag_prefix, &options.version);
    if repo.tag_exists(&tag) {
        errors.push(format!("The tag \"{tag}\" already exists."));
    }

    Ok(errors)
}

/// Commit `files` as the release commit and tag it with the version tag.
pub fn commit_and_tag(options: &CommitAndTagOptions) -> Result<()> {
    let repo = GitRepository::open(&options.cwd)?;
    let tag = tag_name(&options.tag_prefix, &options.version);

    let sha = repo.commit_files(
        &options.cwd,
        &options.files,
        &release_commit_message(&options.version),
    )?;
    info!("created release commit {sha}");

    repo.tag_head(&tag)?;
    info!("created tag {tag}");

    Ok(())
}

/// Push the release branch and the version tag.
pub fn push(options: &PushOptions) -> Result<()> {
    let repo = GitRepository::open(&options.cwd)?;
    let tag = tag_name(&options.tag_prefix, &options.version);

    let ref_specs = vec![
        format!("refs/heads/{}", options.release_branch),
        format!("refs/tags/{tag}"),
    ];

    repo.push(&options.remote, &ref_specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestRepo;

    fn validate_options(repo: &TestRepo, changes: Option<&str>) -> ValidateOptions {
        ValidateOptions {
            cwd: repo.path().to_path_buf(),
            version: Version::new(3, 4, 0),
            changes: changes.map(|c| c.to_string()),
            branch: "master".into(),
            tag_prefix: "v".into(),
        }
    }

    #[test]
    fn clean_repository_has_no_errors() {
        let repo = TestRepo::new();
        repo.commit_file("package.json", "{}", "feat: init");

        let errors =
            validate_repository_to_release(&validate_options(&repo, Some("- Fixed a bug.")))
                .unwrap();

        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn reports_every_problem_in_order() {
        let repo = TestRepo::new();
        repo.commit_file("package.json", "{}", "feat: init");
        repo.tag("v3.4.0");
        repo.write_file("package.json", "{\"dirty\":true}");

        let mut options = validate_options(&repo, Some("   "));
        options.branch = "release".into();

        let errors = validate_repository_to_release(&options).unwrap();

        assert_eq!(
            errors,
            vec![
                "Not on the \"#release\" branch.".to_string(),
                "Cannot find changelog entries for version \"3.4.0\".".to_string(),
                "The working directory contains uncommitted changes.".to_string(),
                "The tag \"v3.4.0\" already exists.".to_string(),
            ]
        );
    }

    #[test]
    fn commits_version_file_and_tags() {
        let repo = TestRepo::new();
        repo.commit_file("package.json", "{\"version\":\"3.3.0\"}", "feat: init");
        repo.write_file("package.json", "{\"version\":\"3.4.0\"}");

        commit_and_tag(&CommitAndTagOptions {
            cwd: repo.path().to_path_buf(),
            version: Version::new(3, 4, 0),
            files: vec!["package.json".into()],
            tag_prefix: "v".into(),
        })
        .unwrap();

        let head = repo.repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some("Release: v3.4.0."));

        let tagged = repo
            .repo
            .find_reference("refs/tags/v3.4.0")
            .unwrap()
            .peel_to_commit()
            .unwrap();
        assert_eq!(tagged.id(), head.id());
    }

    #[test]
    fn push_fails_for_unknown_remote() {
        let repo = TestRepo::new();
        repo.commit_file("package.json", "{}", "feat: init");

        let result = push(&PushOptions {
            cwd: repo.path().to_path_buf(),
            remote: "origin".into(),
            release_branch: "master".into(),
            version: Version::new(1, 0, 0),
            tag_prefix: "v".into(),
        });

        assert!(result.is_err());
    }

    #[test]
    fn pushes_branch_and_tag_to_local_remote() {
        let remote = TempDirRemote::new();
        let repo = TestRepo::new();
        repo.commit_file("package.json", "{}", "feat: init");
        repo.tag("v1.0.0");
        repo.repo
            .remote("origin", remote.url().as_str())
            .unwrap();

        push(&PushOptions {
            cwd: repo.path().to_path_buf(),
            remote: "origin".into(),
            release_branch: "master".into(),
            version: Version::new(1, 0, 0),
            tag_prefix: "v".into(),
        })
        .unwrap();

        assert!(remote.repo.find_reference("refs/heads/master").is_ok());
        assert!(remote.repo.find_reference("refs/tags/v1.0.0").is_ok());
    }

    struct TempDirRemote {
        tmp_dir: tempfile::TempDir,
        repo: git2::Repository,
    }

    impl TempDirRemote {
        fn new() -> Self {
            let tmp_dir = tempfile::TempDir::new().unwrap();
            let repo = git2::Repository::init_bare(tmp_dir.path()).unwrap();
            Self { tmp_dir, repo }
        }

        fn url(&self) -> String {
            self.tmp_dir.path().display().to_string()
        }
    }
}
