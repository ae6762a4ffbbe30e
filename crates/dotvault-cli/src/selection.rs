//! Turn command-line paths into selected entries

use dotvault_engine::expand_home;
use dotvault_types::SelectedEntry;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Stat each argument and build the entry list handed to the backup engine
///
/// `~` is expanded against `home`, and relative paths are resolved against
/// `cwd`. Arguments that do not exist are kept with `exists == false` so the
/// engine can report them.
pub fn select_entries(arguments: &[String], home: &Path, cwd: &Path) -> Vec<SelectedEntry> {
    arguments
        .iter()
        .map(|argument| {
            let path = resolve(argument, home, cwd);
            match fs::metadata(&path) {
                Ok(metadata) if metadata.is_dir() => {
                    SelectedEntry::new(path.display().to_string(), true, true, tree_size(&path))
                }
                Ok(metadata) => {
                    SelectedEntry::new(path.display().to_string(), false, true, metadata.len())
                }
                Err(_) => SelectedEntry::new(path.display().to_string(), false, false, 0),
            }
        })
        .collect()
}

fn resolve(argument: &str, home: &Path, cwd: &Path) -> PathBuf {
    let expanded = expand_home(argument, home);
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

/// Sum of regular file sizes below `root`
pub fn tree_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
