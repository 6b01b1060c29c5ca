///
/// This module implements the CLI interface for oss-deploy: command parsing,
/// argument validation and the async entrypoint used by `main` and the tests.
///
/// All decision logic (branch gating, change detection, credentials, uploads) lives
/// in the [`oss-deploy-core`] crate. This module only wires real implementations
/// into it and maps the outcome onto the process exit status.
///
/// ## Exit status
/// Every deployment outcome exits 0 by default, including "nothing to deploy" and
/// failed uploads. `--fail-on-error` turns missing credentials and failed or
/// missing uploads into a non-zero exit.
///
/// [`oss-deploy-core`]: ../../oss-deploy-core/
use crate::load_config::load_or_default;
use anyhow::Result;
use clap::{Parser, Subcommand};
use oss_deploy_core::branch::resolve_branch;
use oss_deploy_core::credentials::load_credentials;
use oss_deploy_core::deploy::{deploy, DeployOutcome};
use oss_deploy_core::environment::Environment;
use oss_deploy_core::git::GitCli;
use oss_deploy_core::ossutil::OssUtil;
use std::path::PathBuf;

/// CLI for oss-deploy: upload branch-specific artifacts to OSS from CI.
#[derive(Parser)]
#[clap(
    name = "oss-deploy",
    version,
    about = "Upload branch-specific build artifacts to an OSS bucket via ossutil"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the current branch's targets if the branch is allowed and something changed
    Deploy {
        /// Path to the YAML config file (built-in dev/prod defaults when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Log the ossutil command lines instead of running them
        #[clap(long)]
        dry_run: bool,
        /// Exit non-zero when credentials are missing or any upload fails
        #[clap(long)]
        fail_on_error: bool,
    },
    /// Check that the credential variables for a branch are set
    CheckEnv {
        /// Branch to check (defaults to the current git branch)
        #[clap(long)]
        branch: Option<String>,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Deploy {
            config,
            dry_run,
            fail_on_error,
        } => {
            let config = load_or_default(config.as_deref())?;
            let env = Environment::capture();
            tracing::info!(
                command = "deploy",
                dry_run,
                env_vars = env.len(),
                "Starting deployment"
            );

            let vcs = GitCli::new(&config.working_dir);
            let store = OssUtil::new(&config.ossutil, &config.working_dir).dry_run(dry_run);
            let outcome = deploy(&config, &env, &vcs, &store).await;

            report(&outcome)?;
            if fail_on_error && outcome.has_failures() {
                tracing::error!(command = "deploy", "Deployment finished with failures");
                anyhow::bail!("deployment finished with failures");
            }
            Ok(())
        }
        Commands::CheckEnv { branch, config } => {
            let config = load_or_default(config.as_deref())?;
            let branch = match branch {
                Some(branch) => branch,
                None => resolve_branch(&GitCli::new(&config.working_dir))
                    .await
                    .ok_or_else(|| anyhow::anyhow!("Failed to determine the current branch"))?,
            };
            let env = Environment::capture();
            match load_credentials(&branch, &config.env, &env) {
                Ok(_) => {
                    tracing::info!(command = "check-env", branch = %branch, "All credential variables present");
                    println!("All required environment variables are set correctly.");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "check-env", error = %e, "Credential check failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

/// Prints the outcome as JSON on stdout for CI consumption.
fn report(outcome: &DeployOutcome) -> Result<()> {
    tracing::info!(command = "deploy", ?outcome, "Deployment outcome");
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
