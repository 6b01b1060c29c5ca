//! [`ObjectStore`] implementation that shells out to Alibaba Cloud's `ossutil`.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::config::OssUtilConfig;
use crate::contract::{ObjectStore, UploadRequest};
use crate::error::CommandError;
use crate::exec::run_command;

const REDACTED: &str = "<hidden>";

#[derive(Debug, Clone)]
pub struct OssUtil {
    program: String,
    force: bool,
    dry_run: bool,
    cwd: PathBuf,
}

impl OssUtil {
    pub fn new(config: &OssUtilConfig, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            force: config.force,
            dry_run: false,
            cwd: cwd.into(),
        }
    }

    /// Log the command line instead of running it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Arguments for `ossutil cp`, in the order the tool documents them.
    pub fn cp_args(&self, request: &UploadRequest) -> Vec<String> {
        let creds = &request.credentials;
        let mut args = vec![
            "cp".to_string(),
            request.source.to_string_lossy().into_owned(),
            request.object_url(),
        ];
        if request.recursive {
            args.push("-r".to_string());
        }
        args.extend([
            "--access-key-id".to_string(),
            creds.access_key_id.clone(),
            "--access-key-secret".to_string(),
            creds.secret_access_key.clone(),
            "--endpoint".to_string(),
            creds.endpoint.clone(),
        ]);
        if self.force {
            args.push("--force".to_string());
        }
        args
    }

    /// Command line safe for logs: key id and secret replaced.
    pub fn display_command(&self, request: &UploadRequest) -> String {
        let creds = &request.credentials;
        let args = self.cp_args(request);
        let rendered: Vec<&str> = args
            .iter()
            .map(|arg| {
                if *arg == creds.access_key_id || *arg == creds.secret_access_key {
                    REDACTED
                } else {
                    arg.as_str()
                }
            })
            .collect();
        format!("{} {}", self.program, rendered.join(" "))
    }
}

#[async_trait]
impl ObjectStore for OssUtil {
    async fn upload(&self, request: &UploadRequest) -> Result<(), CommandError> {
        let cmdline = self.display_command(request);
        if self.dry_run {
            info!(command = %cmdline, "[DRY RUN] skipping ossutil invocation");
            return Ok(());
        }

        info!(
            source = %request.source.display(),
            url = %request.object_url(),
            recursive = request.recursive,
            "Uploading to OSS"
        );
        run_command(&self.program, self.cp_args(request), &self.cwd, &cmdline)
            .await
            .map(|_| ())
    }
}
