//! High-level pipeline: resolve branch → gate → credentials → upload.
//!
//! [`deploy`] is the only entrypoint the CLI needs. It walks the stages in
//! [`DeployStage`] order and converts every failure it meets into a logged
//! [`DeployOutcome`]; nothing is propagated to the caller as an error.
//!
//! # Stages
//! 1. Resolve the current branch through [`Vcs`] (fails soft to "unknown").
//! 2. Check it against the configured allow-list.
//! 3. Run the configured change detection; no change means no upload.
//! 4. Load and validate the branch's credential bundle from the [`Environment`].
//! 5. Upload each target through [`ObjectStore`], skipping missing sources.
//!
//! Uploads are not transactional: when one target fails the rest are still
//! attempted, and nothing already uploaded is rolled back.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::branch::{resolve_branch, BranchPolicy};
use crate::change::detect_changes;
use crate::config::{DeployConfig, Target};
use crate::contract::{ObjectStore, UploadRequest, Vcs};
use crate::credentials::{load_credentials, Credentials};
use crate::environment::Environment;
use crate::error::CredentialError;
use crate::staging::stage;

/// Points the orchestrator passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Start,
    BranchResolved,
    BranchValidated,
    ChangeChecked,
    CredentialsLoaded,
    CredentialsValidated,
    Uploaded,
    Done,
}

/// How a run ended. Only [`DeployOutcome::Completed`] attempted any upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployOutcome {
    UnknownBranch,
    UnsupportedBranch { branch: String },
    NoChanges { branch: String },
    MissingCredentials { branch: String, variables: Vec<String> },
    Completed(DeployReport),
}

impl DeployOutcome {
    /// True when something the operator asked for did not happen: missing
    /// credentials or at least one failed/missing upload.
    pub fn has_failures(&self) -> bool {
        match self {
            DeployOutcome::MissingCredentials { .. } => true,
            DeployOutcome::Completed(report) => report.has_failures(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub branch: String,
    pub uploads: Vec<UploadReport>,
}

impl DeployReport {
    pub fn uploaded(&self) -> usize {
        self.uploads
            .iter()
            .filter(|u| u.status == UploadStatus::Uploaded)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.uploads.iter().any(|u| u.status != UploadStatus::Uploaded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub source: PathBuf,
    pub destination: String,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded,
    SourceMissing,
    Failed(String),
}

fn enter(stage: DeployStage) {
    debug!(stage = ?stage, "[DEPLOY] stage");
}

/// Runs one deployment. See the module docs for the stage order.
pub async fn deploy<V, S>(
    config: &DeployConfig,
    env: &Environment,
    vcs: &V,
    store: &S,
) -> DeployOutcome
where
    V: Vcs + ?Sized,
    S: ObjectStore + ?Sized,
{
    enter(DeployStage::Start);
    info!("[DEPLOY] Starting deployment");

    let branch = resolve_branch(vcs).await;
    enter(DeployStage::BranchResolved);

    let policy = BranchPolicy::from_config(config);
    if !policy.is_deployable(branch.as_deref()) {
        enter(DeployStage::Done);
        return match branch {
            Some(branch) => DeployOutcome::UnsupportedBranch { branch },
            None => DeployOutcome::UnknownBranch,
        };
    }
    // is_deployable(None) is false, so the branch is known here.
    let Some(branch) = branch else {
        return DeployOutcome::UnknownBranch;
    };
    enter(DeployStage::BranchValidated);

    let targets = config.targets_for(&branch);
    let target_paths: Vec<PathBuf> = targets.iter().map(|t| t.source.clone()).collect();
    if !detect_changes(&config.change_detection, vcs, &target_paths).await {
        info!(branch = %branch, "No changes detected, skipping deployment.");
        enter(DeployStage::Done);
        return DeployOutcome::NoChanges { branch };
    }
    enter(DeployStage::ChangeChecked);

    let loaded = load_credentials(&branch, &config.env, env);
    enter(DeployStage::CredentialsLoaded);
    let credentials = match loaded {
        Ok(credentials) => credentials,
        Err(CredentialError::Missing { branch, variables }) => {
            error!(branch = %branch, missing = ?variables, "Missing required environment variables.");
            enter(DeployStage::Done);
            return DeployOutcome::MissingCredentials { branch, variables };
        }
    };
    enter(DeployStage::CredentialsValidated);

    let mut uploads = Vec::with_capacity(targets.len());
    for target in targets {
        let status = upload_target(config, target, &credentials, store).await;
        uploads.push(UploadReport {
            source: target.source.clone(),
            destination: target.destination.clone(),
            status,
        });
    }
    enter(DeployStage::Uploaded);

    let report = DeployReport { branch, uploads };
    info!(
        branch = %report.branch,
        uploaded = report.uploaded(),
        total = report.uploads.len(),
        "[DEPLOY] Deployment finished"
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[DEPLOY][DEBUG] Report as JSON"),
        Err(e) => error!(error = ?e, "[DEPLOY][DEBUG] Failed to serialize report as JSON"),
    }
    enter(DeployStage::Done);
    DeployOutcome::Completed(report)
}

async fn upload_target<S: ObjectStore + ?Sized>(
    config: &DeployConfig,
    target: &Target,
    credentials: &Credentials,
    store: &S,
) -> UploadStatus {
    let resolved = config.resolve_source(target);
    if !resolved.exists() {
        warn!(source = %resolved.display(), "File {} does not exist.", resolved.display());
        return UploadStatus::SourceMissing;
    }

    let source = match &config.staging_dir {
        Some(staging_dir) => match stage(&resolved, &config.resolve_staging(staging_dir)) {
            Ok(staged) => staged,
            Err(e) => {
                error!(error = %e, source = %resolved.display(), "Failed to stage source");
                return UploadStatus::Failed(e.to_string());
            }
        },
        None => resolved,
    };

    let request = UploadRequest {
        recursive: source.is_dir(),
        source,
        destination: target.destination.clone(),
        credentials: credentials.clone(),
    };
    match store.upload(&request).await {
        Ok(()) => {
            info!(
                source = %request.source.display(),
                url = %request.object_url(),
                "File {} uploaded to OSS successfully.",
                request.source.display()
            );
            UploadStatus::Uploaded
        }
        Err(e) => {
            error!(
                source = %request.source.display(),
                error = %e,
                "Failed to upload {}",
                request.source.display()
            );
            UploadStatus::Failed(e.to_string())
        }
    }
}
