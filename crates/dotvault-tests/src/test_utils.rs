//! Unified test utilities for DotVault integration tests

use dotvault_engine::BackupEngine;
use dotvault_types::SelectedEntry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// Printable text, like a typical rc file
    Text,
    /// Deterministic pseudo-random bytes
    Binary,
}

/// Generate test data with the given pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Text => {
            let line = b"export PATH=\"$HOME/.local/bin:$PATH\"\n";
            line.iter().copied().cycle().take(size).collect()
        }
        TestDataPattern::Binary => {
            // Deterministic so failures are reproducible
            let mut state: u32 = 0x2545_f491;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    (state & 0xff) as u8
                })
                .collect()
        }
    }
}

/// A throwaway home directory
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    /// Create an empty home
    pub fn new() -> std::io::Result<Self> {
        Ok(Self { dir: TempDir::new()? })
    }

    /// Root of the home
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file below the home, creating parents
    pub fn write(&self, relative: &str, content: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a file of `size` bytes with the given pattern
    pub fn write_pattern(
        &self,
        relative: &str,
        size: usize,
        pattern: TestDataPattern,
    ) -> std::io::Result<PathBuf> {
        self.write(relative, &generate_test_data(size, pattern))
    }

    /// Selected entry for `~/<relative>`, sized like a catalog would
    pub fn entry(&self, relative: &str) -> SelectedEntry {
        let path = self.path().join(relative);
        let display = format!("~/{}", relative);
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {
                let size = snapshot(&path).values().map(|c| c.len() as u64).sum();
                SelectedEntry::new(display, true, true, size)
            }
            Ok(metadata) => SelectedEntry::new(display, false, true, metadata.len()),
            Err(_) => SelectedEntry::new(display, false, false, 0),
        }
    }

    /// Backup engine resolving `~` to this home
    pub fn engine(&self) -> BackupEngine {
        BackupEngine::with_home(self.path())
    }
}

/// Every regular file below `root`, keyed by POSIX relative path
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read(entry.path()).ok()?;
            Some((key, content))
        })
        .collect()
}

/// Relative paths of every regular file below `root`
pub fn file_names(root: &Path) -> Vec<String> {
    snapshot(root).into_keys().collect()
}
