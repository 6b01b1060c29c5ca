use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Placeholder substituted with the branch token in environment variable templates.
pub const BRANCH_PLACEHOLDER: &str = "{branch}";

/// Everything a deployment run needs besides secrets.
///
/// Built once at process start (from YAML or [`DeployConfig::default`]) and passed
/// by reference into the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Directory git runs in and relative sources resolve against.
    pub working_dir: PathBuf,
    /// Allow-list of deployable branches and what each one uploads.
    pub branches: BTreeMap<String, BranchTargets>,
    pub change_detection: ChangeDetection,
    pub env: EnvNaming,
    pub ossutil: OssUtilConfig,
    /// When set, every source is copied here first and the copy is uploaded.
    pub staging_dir: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let mut branches = BTreeMap::new();
        for branch in ["dev", "prod"] {
            let file = format!("{branch}.html");
            branches.insert(
                branch.to_string(),
                BranchTargets {
                    targets: vec![Target {
                        source: PathBuf::from(&file),
                        destination: file,
                    }],
                },
            );
        }
        Self {
            working_dir: PathBuf::from("."),
            branches,
            change_detection: ChangeDetection::default(),
            env: EnvNaming::default(),
            ossutil: OssUtilConfig::default(),
            staging_dir: None,
        }
    }
}

impl DeployConfig {
    /// Rejects configurations the orchestrator could not act on sensibly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branches.is_empty() {
            return Err(ConfigError::NoBranches);
        }
        for (branch, targets) in &self.branches {
            for (index, target) in targets.targets.iter().enumerate() {
                if target.destination.trim().is_empty() {
                    return Err(ConfigError::EmptyDestination {
                        branch: branch.clone(),
                        index,
                    });
                }
            }
        }
        for template in self.env.templates() {
            if !template.contains(BRANCH_PLACEHOLDER) {
                return Err(ConfigError::TemplateWithoutBranch {
                    template: template.to_string(),
                });
            }
        }
        if let ChangeDetection::NewCommits { max_attempts: 0, .. } = self.change_detection {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    pub fn targets_for(&self, branch: &str) -> &[Target] {
        self.branches
            .get(branch)
            .map(|b| b.targets.as_slice())
            .unwrap_or(&[])
    }

    /// Resolves a target's source against `working_dir` unless it is absolute.
    pub fn resolve_source(&self, target: &Target) -> PathBuf {
        self.resolve_path(&target.source)
    }

    pub fn resolve_staging(&self, staging_dir: &Path) -> PathBuf {
        self.resolve_path(staging_dir)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            working_dir = %self.working_dir.display(),
            branches = ?self.branches.keys().collect::<Vec<_>>(),
            change_detection = self.change_detection.name(),
            staging_dir = ?self.staging_dir,
            "Loaded DeployConfig"
        );
        debug!(?self, "DeployConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchTargets {
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// A single transfer unit: local source, bucket-relative destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub source: PathBuf,
    pub destination: String,
}

/// How the orchestrator decides whether anything needs uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChangeDetection {
    /// Pull, then treat any commit between `HEAD@{1}` and `HEAD` as a change.
    NewCommits {
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
        #[serde(default = "default_delay_secs")]
        delay_secs: u64,
    },
    /// Diff `path` (or every target source when unset) between `HEAD~1` and `HEAD`.
    PathDiff {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Upload unconditionally.
    Always,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> u64 {
    5
}

impl Default for ChangeDetection {
    fn default() -> Self {
        ChangeDetection::NewCommits {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl ChangeDetection {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeDetection::NewCommits { .. } => "new_commits",
            ChangeDetection::PathDiff { .. } => "path_diff",
            ChangeDetection::Always => "always",
        }
    }
}

/// Case applied to the branch token before it is substituted into a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCase {
    #[default]
    Upper,
    Verbatim,
}

/// Templates for the four per-branch credential variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvNaming {
    pub case: NameCase,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
}

impl Default for EnvNaming {
    fn default() -> Self {
        Self {
            case: NameCase::Upper,
            bucket: "OSS_BUCKET_NAME_{branch}".to_string(),
            access_key_id: "OSS_ACCESS_KEY_ID_{branch}".to_string(),
            secret_access_key: "OSS_SECRET_ACCESS_KEY_{branch}".to_string(),
            endpoint: "OSS_ENDPOINT_{branch}".to_string(),
        }
    }
}

impl EnvNaming {
    pub fn templates(&self) -> [&str; 4] {
        [
            self.bucket.as_str(),
            self.access_key_id.as_str(),
            self.secret_access_key.as_str(),
            self.endpoint.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OssUtilConfig {
    /// Program name or path of the object-storage CLI.
    pub program: String,
    /// Pass `--force` so existing objects are overwritten without prompting.
    pub force: bool,
}

impl Default for OssUtilConfig {
    fn default() -> Self {
        Self {
            program: "ossutil".to_string(),
            force: false,
        }
    }
}
