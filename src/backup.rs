//! `<file>.backup` copies taken before destructive writes.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub const BACKUP_SUFFIX: &str = ".backup";

/// `results.jsonl` -> `results.jsonl.backup`, next to the original.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy `path` to its backup path, replacing any older backup.
pub fn copy_to_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    fs::copy(path, &backup)
        .with_context(|| format!("backing up {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

/// Move the backup back over `path`. The backup file is gone afterwards.
pub fn restore_from_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    fs::rename(&backup, path)
        .with_context(|| format!("restoring {} from {}", path.display(), backup.display()))
}
