//! Core data model and error handling for DotVault
//!
//! This crate provides the foundational types shared by the DotVault crates:
//!
//! - **Error handling**: a single error enum grouped into kinds
//! - **Data model**: selected entries, run options, progress events and results
//! - **Traits**: cooperative cancellation and the restore conflict policy
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use dotvault_types::{BackupOptions, Result, SelectedEntry};
//!
//! fn select() -> Result<Vec<SelectedEntry>> {
//!     Ok(vec![SelectedEntry::new("~/.bashrc", false, true, 3_200)])
//! }
//!
//! let options = BackupOptions::default().with_timestamp_subfolder(false);
//! assert!(!options.compress);
//! assert_eq!(select().unwrap().len(), 1);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use traits::*;
pub use types::*;
