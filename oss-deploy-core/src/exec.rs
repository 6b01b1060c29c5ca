//! Process helpers shared by the git and ossutil backends.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::CommandError;

/// Runs `program args...` in `cwd`, waits for it, and returns trimmed stdout.
///
/// `cmdline` is the command line used in logs and errors; callers pass a redacted
/// rendering when the arguments contain secrets.
pub async fn run_command<I, S>(
    program: &str,
    args: I,
    cwd: &Path,
    cmdline: &str,
) -> Result<String, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(command = %cmdline, cwd = %cwd.display(), "Running command");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CommandError::Failed {
            command: cmdline.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
