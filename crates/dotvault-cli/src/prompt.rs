//! Interactive conflict prompt

use crate::progress::ProgressTracker;
use dialoguer::Select;
use dotvault_engine::InteractiveResolver;
use dotvault_types::{ConflictInfo, ConflictResolution};
use tracing::debug;

const CHOICES: [ConflictResolution; 3] = [
    ConflictResolution::Overwrite,
    ConflictResolution::Skip,
    ConflictResolution::Rename,
];

/// Resolver asking on the terminal for every conflict
///
/// Without an attended terminal the resolver has no prompt and overwrites.
pub fn terminal_resolver(tracker: ProgressTracker) -> InteractiveResolver {
    if !console::user_attended() {
        debug!("No terminal attached, conflicts will be overwritten");
        return InteractiveResolver::new();
    }

    InteractiveResolver::new().with_prompt(move |conflict| {
        tracker.suspend(|| ask(conflict))
    })
}

fn ask(conflict: &ConflictInfo) -> Option<ConflictResolution> {
    let labels = ["Overwrite", "Skip (keep existing)", "Rename existing to .bak"];
    let prompt = format!(
        "{} already exists",
        conflict.destination_path.display()
    );

    Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()
        .and_then(|index| CHOICES.get(index).copied())
}
