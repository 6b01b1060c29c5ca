use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::contract::Vcs;
use crate::error::CommandError;
use crate::exec::run_command;

/// [`Vcs`] backed by the `git` binary, run inside `repo_dir`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, CommandError> {
        let cmdline = format!("git {}", args.join(" "));
        run_command("git", args, &self.repo_dir, &cmdline).await
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn current_branch(&self) -> Result<String, CommandError> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn pull(&self) -> Result<(), CommandError> {
        self.git(&["pull"]).await.map(|_| ())
    }

    async fn log_oneline(&self, since: &str, until: &str) -> Result<String, CommandError> {
        self.git(&["log", "--oneline", since, until]).await
    }

    async fn rev_parse(&self, rev: &str) -> Result<String, CommandError> {
        self.git(&["rev-parse", rev]).await
    }

    async fn diff_name_only(
        &self,
        from: &str,
        to: &str,
        path: &Path,
    ) -> Result<String, CommandError> {
        let path = path.to_string_lossy().into_owned();
        self.git(&["diff", "--name-only", from, to, "--", path.as_str()])
            .await
    }
}
