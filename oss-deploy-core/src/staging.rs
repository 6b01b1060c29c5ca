use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StagingError;

/// Copies `source` (file or directory tree) into `staging_dir` under its own file
/// name and returns the staged path. An existing staged copy is replaced.
///
/// A source that already sits at its staged path is returned untouched. Sources
/// and staging directories that contain one another are rejected before anything
/// is created or removed.
pub fn stage(source: &Path, staging_dir: &Path) -> Result<PathBuf, StagingError> {
    let name = source.file_name().ok_or_else(|| StagingError::NoFileName {
        path: source.to_path_buf(),
    })?;
    let staged = staging_dir.join(name);
    let io_err = |source_err: io::Error| StagingError::Io {
        from: source.to_path_buf(),
        to: staged.clone(),
        source: source_err,
    };

    let real_source = fs::canonicalize(source).map_err(io_err)?;
    let real_staging = canonicalize_partial(staging_dir).map_err(io_err)?;
    let real_staged = real_staging.join(name);
    if real_staged == real_source {
        debug!(path = %source.display(), "Source already staged");
        return Ok(source.to_path_buf());
    }
    if real_staging.starts_with(&real_source) || real_source.starts_with(&real_staged) {
        return Err(StagingError::Overlap {
            source_path: source.to_path_buf(),
            staging_dir: staging_dir.to_path_buf(),
        });
    }

    fs::create_dir_all(staging_dir).map_err(io_err)?;
    if staged.is_dir() {
        fs::remove_dir_all(&staged).map_err(io_err)?;
    }

    if source.is_dir() {
        copy_dir(source, &staged).map_err(io_err)?;
    } else {
        fs::copy(source, &staged).map_err(io_err)?;
    }
    debug!(from = %source.display(), to = %staged.display(), "Staged source");
    Ok(staged)
}

/// Canonical form of `path`, which may not exist yet: the deepest existing
/// ancestor is canonicalized and the missing components are appended to it.
fn canonicalize_partial(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        match fs::canonicalize(existing) {
            Ok(real) => {
                return Ok(missing.iter().rev().fold(real, |acc, part| acc.join(part)));
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(part)) => {
                    missing.push(part.to_os_string());
                    existing = parent;
                }
                _ => return Err(e),
            },
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry_res in fs::read_dir(from)? {
        let entry = entry_res?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
