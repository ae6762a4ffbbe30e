//! Backup and restore engines for DotVault
//!
//! This crate turns a list of selected dotfile entries into a backup and
//! brings a backup back into place.
//!
//! # Features
//!
//! - **Backup**: plain copy, zip or tar.gz output with exclude patterns
//! - **Restore**: tree or archive input with pluggable conflict resolution
//! - **Cancellation**: cooperative, checked between files
//! - **Verification**: SHA-256 comparison of a backup tree with live files
//! - **Workers**: runs on a background thread for interactive front ends
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotvault_engine::{BackupEngine, RestoreEngine, always_skip};
//! use dotvault_types::{ArchiveFormat, BackupOptions, RestoreOptions, SelectedEntry};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BackupEngine::new()?;
//! let entries = vec![SelectedEntry::new("~/.config/nvim", true, true, 4096)];
//! let options = BackupOptions::default().compressed(ArchiveFormat::Zip);
//!
//! let result = engine.backup(&entries, Path::new("/tmp/dots"), &options, |event| {
//!     println!("{} files", event.files_processed);
//! });
//! println!("Wrote {}", result.output_path.display());
//!
//! let restored = RestoreEngine::new().restore(
//!     &result.output_path,
//!     Path::new("/tmp/restored"),
//!     &RestoreOptions::default(),
//!     &always_skip(),
//!     |_| {},
//! );
//! println!("Restored {} files", restored.restored_files);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod conflict;
pub mod glob;
pub mod paths;
pub mod policy;
pub mod restore;
pub mod state;
pub mod verify;
pub mod worker;

pub use backup::{BackupEngine, BackupRequest, NO_ENTRIES_SELECTED, NO_EXISTING_ENTRIES};
pub use conflict::{
    always_overwrite, always_rename, always_skip, resolver_for, FixedResolver,
    InteractiveResolver, BACKUP_SUFFIX,
};
pub use glob::{glob_to_regex, matches_glob, GlobFilter};
pub use paths::{
    contract_home, expand_home, home_dir, is_hidden, relative_from_home, timestamped_folder_name,
    to_posix,
};
pub use policy::{should_skip, PathPolicy, SkipReason};
pub use restore::{renamed_path, RestoreEngine, RestoreRequest};
pub use state::RunState;
pub use verify::{files_identical, sha256_file, verify_tree, VerifyReport};
pub use worker::{spawn_backup, spawn_restore, Worker, DEFAULT_SHUTDOWN_GRACE, WORKER_THREAD_NAME};
