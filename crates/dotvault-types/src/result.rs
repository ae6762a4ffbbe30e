//! Result type alias for DotVault operations

use crate::Error;

/// Result type alias for DotVault operations
pub type Result<T> = std::result::Result<T, Error>;
