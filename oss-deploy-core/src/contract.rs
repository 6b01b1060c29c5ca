#![allow(unused)]

//! # contract: capability traits for the external tools
//!
//! The orchestrator never spawns processes itself. It talks to version control
//! through [`Vcs`] and to object storage through [`ObjectStore`]; the real
//! implementations ([`crate::git::GitCli`], [`crate::ossutil::OssUtil`]) shell out,
//! while tests use the `mockall`-generated `MockVcs` / `MockObjectStore`.
//!
//! Both traits only expose what the deployment flow consumes: stdout and success.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use mockall::{automock, predicate::*};

use crate::credentials::Credentials;
use crate::error::CommandError;

/// One upload as the orchestrator hands it to an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Local file or directory, already resolved (and staged, if configured).
    pub source: PathBuf,
    /// Object key below the bucket root.
    pub destination: String,
    /// Copy a directory tree rather than a single file.
    pub recursive: bool,
    pub credentials: Credentials,
}

impl UploadRequest {
    pub fn object_url(&self) -> String {
        self.credentials.object_url(&self.destination)
    }
}

/// Read-only (plus `pull`) view of the repository the tool runs in.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Vcs: Send + Sync {
    /// `rev-parse --abbrev-ref HEAD`
    async fn current_branch(&self) -> Result<String, CommandError>;

    /// `pull`
    async fn pull(&self) -> Result<(), CommandError>;

    /// `log --oneline <since> <until>`, returning stdout.
    async fn log_oneline(&self, since: &str, until: &str) -> Result<String, CommandError>;

    /// `rev-parse <rev>`, returning the commit hash.
    async fn rev_parse(&self, rev: &str) -> Result<String, CommandError>;

    /// `diff --name-only <from> <to> <path>`, returning stdout.
    async fn diff_name_only(
        &self,
        from: &str,
        to: &str,
        path: &Path,
    ) -> Result<String, CommandError>;
}

/// Destination bucket for uploads.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy `request.source` to `oss://<bucket>/<destination>`.
    async fn upload(&self, request: &UploadRequest) -> Result<(), CommandError>;
}
