//! Local git repository operations used while cutting a release.
//!
//! Wraps `git2::Repository` with the handful of queries and mutations the
//! release flow needs: branch and upstream inspection, committing a fixed set
//! of files, annotated tagging and pushing refs to a remote.
//!
//! Network operations authenticate through the user's own git setup
//! (ssh-agent or the configured credential helper). The GitHub token used for
//! the release page is never handed to git.
use git2::{
    BranchType, Cred, CredentialType, ErrorCode, RemoteCallbacks,
    StatusOptions,
};
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{ReleaseToolsError, Result};

/// A single commit as seen by changelog generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit sha.
    pub id: String,
    /// Raw commit message including body and footers.
    pub message: String,
}

/// High-level handle on the repository a release is cut from.
pub struct GitRepository {
    repo: git2::Repository,
}

/// Credential types already offered during one network operation.
struct CredentialAttempts {
    tried: CredentialType,
}

impl CredentialAttempts {
    fn new() -> Self {
        Self {
            tried: CredentialType::empty(),
        }
    }

    /// Next credential type to offer, `None` once every allowed type failed.
    fn next(&mut self, allowed: CredentialType) -> Option<CredentialType> {
        let candidate = [
            CredentialType::USERNAME,
            CredentialType::SSH_KEY,
            CredentialType::USER_PASS_PLAINTEXT,
            CredentialType::DEFAULT,
        ]
        .into_iter()
        .find(|kind| allowed.contains(*kind) && !self.tried.contains(*kind))?;

        self.tried.insert(candidate);
        Some(candidate)
    }
}

/// Credentials callbacks that defer to ssh-agent or the git credential
/// helper configured for the repository.
fn get_auth_callbacks<'r>(config: git2::Config) -> RemoteCallbacks<'r> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = CredentialAttempts::new();

    callbacks.credentials(move |url, username, allowed| {
        let user = username.unwrap_or("git");

        let Some(kind) = attempts.next(allowed) else {
            warn!("no credentials left to try for {url}");
            return Err(git2::Error::from_str("authentication failed"));
        };

        if kind == CredentialType::USERNAME {
            Cred::username(user)
        } else if kind == CredentialType::SSH_KEY {
            Cred::ssh_key_from_agent(user)
        } else if kind == CredentialType::USER_PASS_PLAINTEXT {
            Cred::credential_helper(&config, url, username)
        } else {
            Cred::default()
        }
    });

    callbacks.push_update_reference(|refname, status| {
        if let Some(message) = status {
            return Err(git2::Error::from_str(&format!(
                "remote rejected {refname}: {message}"
            )));
        }
        Ok(())
    });

    callbacks
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(path)?;
        Ok(Self { repo })
    }

    /// Name of the checked out branch, `None` for a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(err) if err.code() == ErrorCode::UnbornBranch => {
                // unborn branches still have a symbolic HEAD
                let head = self.repo.find_reference("HEAD")?;
                return Ok(head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(|s| s.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if !head.is_branch() {
            return Ok(None);
        }

        Ok(head.shorthand().map(|s| s.to_string()))
    }

    /// Whether the current branch has commits on its upstream that are not
    /// present locally. Branches without an upstream are never behind.
    pub fn is_behind_remote(&self) -> Result<bool> {
        let Some(branch_name) = self.current_branch()? else {
            return Ok(false);
        };

        let branch = match self.repo.find_branch(&branch_name, BranchType::Local)
        {
            Ok(branch) => branch,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let upstream = match branch.upstream() {
            Ok(upstream) => upstream,
            Err(err) if err.code() == ErrorCode::NotFound => {
                debug!("branch {branch_name} has no upstream");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        let (Some(local), Some(remote)) =
            (branch.get().target(), upstream.get().target())
        else {
            return Ok(false);
        };

        let (ahead, behind) = self.repo.graph_ahead_behind(local, remote)?;
        debug!("branch {branch_name}: ahead {ahead}, behind {behind}");

        Ok(behind > 0)
    }

    /// Whether tracked files differ from HEAD. Untracked files are ignored.
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::CURRENT))
    }

    /// Whether a tag with the given name exists locally.
    pub fn tag_exists(&self, tag: &str) -> bool {
        self.repo
            .find_reference(&format!("refs/tags/{tag}"))
            .is_ok()
    }

    /// Most recent tag reachable from HEAD whose name starts with `prefix`.
    pub fn latest_tag(&self, prefix: &str) -> Result<Option<String>> {
        let mut opts = git2::DescribeOptions::new();
        opts.describe_tags().pattern(&format!("{prefix}*"));

        let describe = match self.repo.describe(&opts) {
            Ok(describe) => describe,
            Err(err)
                if matches!(
                    err.code(),
                    ErrorCode::NotFound | ErrorCode::UnbornBranch
                ) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let mut format = git2::DescribeFormatOptions::new();
        format.abbreviated_size(0);

        Ok(Some(describe.format(Some(&format))?))
    }

    /// Stage exactly `files` (relative to `cwd`) and commit them with the
    /// committer configured in git.
    pub fn commit_files(
        &self,
        cwd: &Path,
        files: &[String],
        msg: &str,
    ) -> Result<String> {
        debug!("committing {files:?} with msg: {msg}");
        let config = self.repo.config()?.snapshot()?;
        let user = config.get_str("user.name")?;
        let email = config.get_str("user.email")?;

        let mut index = self.repo.index()?;
        for file in files {
            index.add_path(&self.repo_relative(cwd, file)?)?;
        }
        index.write()?;

        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(err) if err.code() == ErrorCode::UnbornBranch => None,
            Err(err) => return Err(err.into()),
        };
        let parents = parent.iter().collect::<Vec<&git2::Commit>>();

        let committer = git2::Signature::now(user, email)?;
        let id = self.repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            msg,
            &tree,
            &parents,
        )?;

        Ok(id.to_string())
    }

    /// `file` under `cwd`, as a path relative to the repository root.
    fn repo_relative(&self, cwd: &Path, file: &str) -> Result<PathBuf> {
        let workdir = self.repo.workdir().ok_or_else(|| {
            git2::Error::from_str("repository has no working directory")
        })?;

        let root = fs::canonicalize(workdir)?;
        let path = fs::canonicalize(cwd.join(file))?;

        path.strip_prefix(&root)
            .map(|p| p.to_path_buf())
            .map_err(|_| {
                git2::Error::from_str(&format!(
                    "{} is outside the repository",
                    path.display()
                ))
                .into()
            })
    }

    /// Create an annotated tag pointing at HEAD.
    pub fn tag_head(&self, tag: &str) -> Result<()> {
        let config = self.repo.config()?.snapshot()?;
        let user = config.get_str("user.name")?;
        let email = config.get_str("user.email")?;

        let commit = self.repo.head()?.peel_to_commit()?;
        let tagger = git2::Signature::now(user, email)?;

        self.repo
            .tag(tag, commit.as_object(), &tagger, tag, false)?;

        Ok(())
    }

    /// Push the given refspecs to `remote`.
    pub fn push(&self, remote: &str, ref_specs: &[String]) -> Result<()> {
        info!("pushing {ref_specs:?} to {remote}");
        let callbacks = get_auth_callbacks(self.repo.config()?);
        let mut push_opts = git2::PushOptions::new();
        push_opts.remote_callbacks(callbacks);

        let mut remote = self.repo.find_remote(remote)?;
        remote.push(ref_specs, Some(&mut push_opts))?;

        Ok(())
    }

    /// Fetch URL configured for `remote`.
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let found = self.repo.find_remote(remote)?;
        found.url().map(|u| u.to_string()).ok_or_else(|| {
            ReleaseToolsError::invalid_remote(format!(
                "remote {remote} has no valid url"
            ))
        })
    }

    /// Non-merge commits reachable from HEAD, newest first, stopping at the
    /// commit `tag` points to when given.
    pub fn commits_since(&self, tag: Option<&str>) -> Result<Vec<CommitInfo>> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        walk.push_head()?;

        if let Some(tag) = tag {
            let reference =
                self.repo.find_reference(&format!("refs/tags/{tag}"))?;
            let tagged = reference.peel_to_commit()?;
            walk.hide(tagged.id())?;
        }

        let mut commits = vec![];

        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;

            if commit.parent_count() > 1 {
                continue;
            }

            commits.push(CommitInfo {
                id: commit.id().to_string(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }

        Ok(commits)
    }
}
