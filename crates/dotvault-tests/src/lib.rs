//! DotVault integration test suite
//!
//! Shared fixtures live in [`test_utils`]; the scenarios themselves are in
//! `tests/integration_tests.rs`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Fixtures that build a throwaway home directory and compare trees, used by
/// every integration test so the scenarios read the same way.
pub mod test_utils;
