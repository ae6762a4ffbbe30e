//! Backup containers for DotVault
//!
//! This crate hides the three output shapes a backup can take behind one
//! writer trait, and the three shapes a restore source can take behind one
//! reader trait:
//!
//! - **Plain tree**: files copied below a directory, mode bits and mtimes kept
//! - **Zip**: one DEFLATE entry per file, modes in the external attributes
//! - **Tar + gzip**: GNU headers with long-name support, modes in the header
//!
//! Entry names are always POSIX-style paths relative to the user's home.
//!
//! # Examples
//!
//! ```rust
//! use dotvault_archive::{archive_path_for, open_source};
//! use dotvault_types::ArchiveFormat;
//! use std::path::Path;
//!
//! let target = archive_path_for(Path::new("/backups/dots"), ArchiveFormat::TarGz);
//! assert_eq!(target, Path::new("/backups/dots.tar.gz"));
//!
//! // Unknown extensions are rejected before anything is read
//! assert!(open_source(Path::new("/backups/dots.rar")).is_err());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod metadata;
pub mod reader;
pub mod targz;
pub mod tree;
pub mod writer;
pub mod zipfile;

// Re-export main types
pub use metadata::{apply_modified, apply_permission_bits, clear_target, permission_bits};
pub use reader::{open_source, sanitize_entry_name, ArchiveReader, EntryVisitor, SourceEntry};
pub use targz::{TarGzArchiveReader, TarGzArchiveWriter};
pub use tree::{TreeReader, TreeWriter};
pub use writer::{
    archive_path_for, create_archive_writer, create_tree_writer, ArchiveWriter,
    ARCHIVE_PROGRESS_INTERVAL, BUFFERED_ENTRY_LIMIT,
};
pub use zipfile::{ZipArchiveReader, ZipArchiveWriter};
