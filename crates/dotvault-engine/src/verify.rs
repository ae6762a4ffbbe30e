//! Backup verification by content hash

use dotvault_types::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Hex-encoded SHA-256 of a file's content
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| Error::io_at(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether two files have the same size and content
pub fn files_identical(left: &Path, right: &Path) -> Result<bool> {
    let left_len = left.metadata().map_err(|e| Error::io_at(left, e))?.len();
    let right_len = right.metadata().map_err(|e| Error::io_at(right, e))?.len();
    if left_len != right_len {
        return Ok(false);
    }
    Ok(sha256_file(left)? == sha256_file(right)?)
}

/// Outcome of comparing a backup tree with the live files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Files whose content matches
    pub matched: Vec<PathBuf>,
    /// Files present on both sides with different content
    pub mismatched: Vec<PathBuf>,
    /// Files in the backup with no live counterpart
    pub missing: Vec<PathBuf>,
}

impl VerifyReport {
    /// No mismatches and nothing missing
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }

    /// Number of files compared
    pub fn total(&self) -> usize {
        self.matched.len() + self.mismatched.len() + self.missing.len()
    }
}

/// Compare every file below `backup_root` with the same relative path below `live_root`
///
/// Paths in the report are relative to both roots.
pub fn verify_tree(backup_root: &Path, live_root: &Path) -> Result<VerifyReport> {
    if !backup_root.is_dir() {
        return Err(Error::other(format!(
            "Backup tree is not a directory: {}",
            backup_root.display()
        )));
    }

    let mut report = VerifyReport::default();
    for entry in WalkDir::new(backup_root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::other(format!("Failed to walk backup tree: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(backup_root)
            .map_err(|_| Error::unsafe_entry(entry.path().display().to_string()))?
            .to_path_buf();
        let live = live_root.join(&relative);

        if !live.is_file() {
            debug!("Missing live file {}", live.display());
            report.missing.push(relative);
        } else if files_identical(entry.path(), &live)? {
            report.matched.push(relative);
        } else {
            debug!("Content differs for {}", live.display());
            report.mismatched.push(relative);
        }
    }

    info!(
        "Verified {} files: {} matched, {} mismatched, {} missing",
        report.total(),
        report.matched.len(),
        report.mismatched.len(),
        report.missing.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_known_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_files_identical() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        fs::write(&c, b"diff").unwrap();

        assert!(files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &c).unwrap());
        assert!(files_identical(&a, &dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_verify_tree_report() {
        let backup = TempDir::new().unwrap();
        let live = TempDir::new().unwrap();
        for (name, body) in [(".bashrc", "a"), (".vimrc", "b"), (".zshrc", "c")] {
            fs::write(backup.path().join(name), body).unwrap();
        }
        fs::write(live.path().join(".bashrc"), "a").unwrap();
        fs::write(live.path().join(".vimrc"), "changed").unwrap();

        let report = verify_tree(backup.path(), live.path()).unwrap();
        assert_eq!(report.matched, vec![PathBuf::from(".bashrc")]);
        assert_eq!(report.mismatched, vec![PathBuf::from(".vimrc")]);
        assert_eq!(report.missing, vec![PathBuf::from(".zshrc")]);
        assert!(!report.is_clean());
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_verify_requires_directory() {
        let dir = TempDir::new().unwrap();
        assert!(verify_tree(&dir.path().join("nope"), dir.path()).is_err());
    }
}
