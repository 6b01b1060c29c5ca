//! Error types shared by the deployment pipeline.
//!
//! None of these escape [`crate::deploy::deploy`]: the orchestrator converts every
//! failure into a logged outcome. They surface directly only from the lower-level
//! helpers and from config validation at the CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of an external command (`git`, `ossutil`).
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be launched at all (not installed, not executable).
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl CommandError {
    /// Convenience constructor used by fakes and tests.
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        CommandError::Failed {
            command: command.into(),
            status: "exit status: 1".to_string(),
            stderr: stderr.into(),
        }
    }
}

/// The credential bundle for a branch could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("missing required environment variables for branch `{branch}`: {}", variables.join(", "))]
    Missing {
        branch: String,
        variables: Vec<String>,
    },
}

/// A loaded deployment configuration is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no deployable branches configured")]
    NoBranches,

    #[error("target #{index} of branch `{branch}` has an empty destination")]
    EmptyDestination { branch: String, index: usize },

    #[error("environment variable template `{template}` does not contain `{{branch}}`")]
    TemplateWithoutBranch { template: String },

    #[error("change_detection.max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Copying a source into the staging directory failed.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("source {path:?} has no file name to stage under")]
    NoFileName { path: PathBuf },

    #[error("source {source_path:?} and staging directory {staging_dir:?} overlap")]
    Overlap {
        source_path: PathBuf,
        staging_dir: PathBuf,
    },

    #[error("failed to stage {from:?} into {to:?}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
