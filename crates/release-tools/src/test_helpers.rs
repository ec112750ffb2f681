//! Common test helpers shared across test modules.
//!
//! Provides a throwaway git repository with a configured committer so tests
//! never depend on the global git configuration of the machine running them.
use std::{fs, path::Path};
use tempfile::TempDir;

pub struct TestRepo {
    pub tmp_dir: TempDir,
    pub repo: git2::Repository,
}

impl TestRepo {
    /// Creates an empty repository on `master` with a local committer.
    pub fn new() -> Self {
        let tmp_dir = TempDir::new().unwrap();

        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = git2::Repository::init_opts(tmp_dir.path(), &opts).unwrap();

        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Release Bot").unwrap();
        config.set_str("user.email", "release-bot@example.com").unwrap();

        Self { tmp_dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.tmp_dir.path()
    }

    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.path().join(name), content).unwrap();
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).unwrap()
    }

    /// Writes `name` and commits it with `message`, returning the commit sha.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> String {
        self.write_file(name, content);

        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let signature = self.repo.signature().unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        let parents = parent.iter().collect::<Vec<&git2::Commit>>();

        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .unwrap()
            .to_string()
    }

    /// Lightweight tag on HEAD.
    pub fn tag(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .unwrap();
    }
}
