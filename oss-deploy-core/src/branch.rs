use std::collections::BTreeSet;
use tracing::{error, info};

use crate::config::DeployConfig;
use crate::contract::Vcs;

/// Current branch name, or `None` when it cannot be determined.
///
/// Failures of the underlying command are logged, never propagated.
pub async fn resolve_branch<V: Vcs + ?Sized>(vcs: &V) -> Option<String> {
    match vcs.current_branch().await {
        Ok(name) if !name.trim().is_empty() => {
            let name = name.trim().to_string();
            info!(branch = %name, "Resolved current branch");
            Some(name)
        }
        Ok(_) => {
            error!("Failed to get current branch: empty output");
            None
        }
        Err(e) => {
            error!(error = %e, "Failed to get current branch");
            None
        }
    }
}

/// Allow-list of branches that may deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPolicy {
    allowed: BTreeSet<String>,
}

impl BranchPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(config.branches.keys().cloned())
    }

    pub fn is_deployable(&self, branch: Option<&str>) -> bool {
        match branch {
            Some(name) if self.allowed.contains(name) => true,
            Some(name) => {
                info!(branch = %name, "Unsupported branch: {}", name);
                false
            }
            None => {
                info!("Failed to determine the current branch.");
                false
            }
        }
    }
}
