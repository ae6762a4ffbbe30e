//! Built-in conflict resolvers
//!
//! The engine only knows the [`ConflictResolver`] trait. Prompting belongs to
//! the front end, which plugs into [`InteractiveResolver`].

use dotvault_types::{ConflictInfo, ConflictPolicy, ConflictResolution, ConflictResolver};
use std::fmt;
use std::sync::Arc;

/// Suffix appended to a file moved aside by [`ConflictResolution::Rename`]
pub const BACKUP_SUFFIX: &str = ".bak";

/// Resolver that answers the same way for every conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedResolver(pub ConflictResolution);

impl ConflictResolver for FixedResolver {
    fn resolve(&self, _conflict: &ConflictInfo) -> ConflictResolution {
        self.0
    }
}

/// Replace every existing file
pub fn always_overwrite() -> FixedResolver {
    FixedResolver(ConflictResolution::Overwrite)
}

/// Keep every existing file
pub fn always_skip() -> FixedResolver {
    FixedResolver(ConflictResolution::Skip)
}

/// Move every existing file aside before writing
pub fn always_rename() -> FixedResolver {
    FixedResolver(ConflictResolution::Rename)
}

type Prompt = dyn Fn(&ConflictInfo) -> Option<ConflictResolution> + Send + Sync;

/// Resolver that defers to a front-end prompt
///
/// Without a prompt, or when the prompt gives no answer, conflicts are
/// overwritten.
#[derive(Clone, Default)]
pub struct InteractiveResolver {
    prompt: Option<Arc<Prompt>>,
}

impl InteractiveResolver {
    /// Create a resolver with no prompt attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the prompt used for each conflict
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&ConflictInfo) -> Option<ConflictResolution> + Send + Sync + 'static,
    {
        self.prompt = Some(Arc::new(prompt));
        self
    }
}

impl fmt::Debug for InteractiveResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveResolver")
            .field("has_prompt", &self.prompt.is_some())
            .finish()
    }
}

impl ConflictResolver for InteractiveResolver {
    fn resolve(&self, conflict: &ConflictInfo) -> ConflictResolution {
        self.prompt
            .as_ref()
            .and_then(|prompt| prompt(conflict))
            .unwrap_or(ConflictResolution::Overwrite)
    }
}

/// Resolver for a configured policy
///
/// `Ask` yields a prompt-less [`InteractiveResolver`]; front ends that can
/// prompt build their own.
pub fn resolver_for(policy: ConflictPolicy) -> Box<dyn ConflictResolver> {
    match policy {
        ConflictPolicy::Overwrite => Box::new(always_overwrite()),
        ConflictPolicy::Skip => Box::new(always_skip()),
        ConflictPolicy::Rename => Box::new(always_rename()),
        ConflictPolicy::Ask => Box::new(InteractiveResolver::new()),
    }
}
