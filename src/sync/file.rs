//! File operations for backup and sync targets.
//!
//! - Atomic writes: write to a temp file beside the target, sync, rename
//! - Prefix purges that clear an item's previous backup before re-mirroring

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Temp file used while `path` is being written.
///
/// Lives in the same directory so the final rename never crosses
/// filesystems, and is hidden so a crash leaves no visible debris.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.rmsync-tmp"))
}

/// Write content to a file atomically.
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp, path)?;
    Ok(())
}

/// Move a fully written temp file over `dest`.
///
/// # Errors
///
/// Returns an error if the rename fails; the temp file is removed.
pub async fn promote(temp: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::rename(temp, dest).await {
        discard(temp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Remove a temp file, ignoring failures.
pub async fn discard(temp: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %temp.display(), error = %e, "Could not remove temp file");
        }
    }
}

/// Delete every entry directly in `dir` whose name starts with `prefix`.
///
/// Directories are removed recursively. A missing `dir` purges nothing.
/// Returns the number of entries removed.
///
/// # Errors
///
/// Returns an error if an entry cannot be removed.
pub async fn purge_prefix(dir: &Path, prefix: &str) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
        } else {
            tokio::fs::remove_file(entry.path()).await?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b.json");

        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path(Path::new("/sync/Work/Plan.pdf"));
        assert_eq!(temp, PathBuf::from("/sync/Work/.Plan.pdf.rmsync-tmp"));
    }

    #[tokio::test]
    async fn test_purge_prefix_only_touches_matches() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("abc").join("nested")).unwrap();
        fs::write(dir.path().join("abc").join("nested").join("p.rm"), b"").unwrap();
        fs::write(dir.path().join("abc.metadata"), b"").unwrap();
        fs::write(dir.path().join("xabc.metadata"), b"").unwrap();

        assert_eq!(purge_prefix(dir.path(), "abc").await.unwrap(), 2);
        assert!(!dir.path().join("abc").exists());
        assert!(dir.path().join("xabc.metadata").exists());
    }

    #[tokio::test]
    async fn test_purge_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        assert_eq!(purge_prefix(&dir.path().join("none"), "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_promote_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("doc.pdf");
        let temp = temp_path(&dest);
        fs::write(&dest, b"old").unwrap();
        fs::write(&temp, b"new").unwrap();

        promote(&temp, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(!temp.exists());
    }
}
