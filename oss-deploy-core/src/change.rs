//! Change gating: decides whether a run has anything worth uploading.
//!
//! Every failure resolves to "no change", so a broken repository or network never
//! leads to an upload.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ChangeDetection;
use crate::contract::Vcs;

// Passed as two revisions, not `HEAD@{1}..HEAD`: the gate lists both histories.
const PREVIOUS_REF: &str = "HEAD@{1}";

/// Runs the configured strategy. `target_paths` are the branch's sources, used by
/// [`ChangeDetection::PathDiff`] when no explicit path is configured.
pub async fn detect_changes<V: Vcs + ?Sized>(
    strategy: &ChangeDetection,
    vcs: &V,
    target_paths: &[PathBuf],
) -> bool {
    match strategy {
        ChangeDetection::Always => true,
        ChangeDetection::NewCommits {
            max_attempts,
            delay_secs,
        } => check_for_new_commits(vcs, *max_attempts, Duration::from_secs(*delay_secs)).await,
        ChangeDetection::PathDiff { path: Some(path) } => check_file_changed(vcs, path).await,
        ChangeDetection::PathDiff { path: None } => {
            for path in target_paths {
                if check_file_changed(vcs, path).await {
                    return true;
                }
            }
            false
        }
    }
}

/// Pulls (retrying up to `max_attempts` times, `delay` apart) and reports whether
/// the pull brought in any commits.
pub async fn check_for_new_commits<V: Vcs + ?Sized>(
    vcs: &V,
    max_attempts: u32,
    delay: Duration,
) -> bool {
    let mut attempt = 1;
    loop {
        match vcs.pull().await {
            Ok(()) => break,
            Err(e) if attempt < max_attempts => {
                warn!(
                    attempt,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "Failed to check for new commits, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    attempts = attempt,
                    error = %e,
                    "Failed to check for new commits after all attempts"
                );
                return false;
            }
        }
    }

    match vcs.log_oneline(PREVIOUS_REF, "HEAD").await {
        Ok(log) => {
            let new_commits = !log.trim().is_empty();
            info!(
                new_commits,
                commits = log.lines().count(),
                "Checked for new commits"
            );
            new_commits
        }
        Err(e) => {
            warn!(error = %e, "Failed to list new commits");
            false
        }
    }
}

/// Whether `path` differs between `HEAD~1` and `HEAD`.
pub async fn check_file_changed<V: Vcs + ?Sized>(vcs: &V, path: &Path) -> bool {
    let diff = async {
        let previous = vcs.rev_parse("HEAD~1").await?;
        let current = vcs.rev_parse("HEAD").await?;
        vcs.diff_name_only(&previous, &current, path).await
    };
    match diff.await {
        Ok(diff) => {
            let changed = !diff.trim().is_empty();
            info!(path = %path.display(), changed, "Checked file changes");
            changed
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to check file changes");
            false
        }
    }
}
