use catalog::{Endpoint, FileKey, Filter, SortKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Composer, ComposerError, SlotId};

/// One recorded user interaction. Slots are addressed by their position in
/// the live footer and placeholders by their ordinal among the current
/// placeholders, so every command re-queries state before acting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ComposerCommand {
    AddMotif {
        file_key: FileKey,
    },
    AddTransition {
        file_key: FileKey,
        placeholder: usize,
    },
    Cancel {
        position: usize,
    },
    Swap {
        from: usize,
        to: usize,
    },
    Select {
        endpoint: Endpoint,
        option: String,
    },
    Reset,
    Sort {
        key: SortKey,
    },
    Filter {
        filter: Filter,
    },
}

fn slot_at(composer: &Composer, position: usize) -> Result<SlotId, ComposerError> {
    composer
        .slots()
        .get(position)
        .map(|s| s.id)
        .ok_or(ComposerError::PositionOutOfRange(position))
}

pub fn apply_command(composer: &mut Composer, command: ComposerCommand) -> Result<(), ComposerError> {
    match command {
        ComposerCommand::AddMotif { file_key } => composer.add_motif_by_key(&file_key).map(|_| ()),
        ComposerCommand::AddTransition {
            file_key,
            placeholder,
        } => {
            let at = composer
                .state()
                .placeholders()
                .get(placeholder)
                .copied()
                .ok_or(ComposerError::PlaceholderOutOfRange(placeholder))?;
            composer.add_transition_by_key(&file_key, at).map(|_| ())
        }
        ComposerCommand::Cancel { position } => {
            let slot = slot_at(composer, position)?;
            composer.cancel(slot)
        }
        ComposerCommand::Swap { from, to } => {
            let dragged = slot_at(composer, from)?;
            let target = slot_at(composer, to)?;
            composer.reorder(dragged, target)
        }
        ComposerCommand::Select { endpoint, option } => composer.select_endpoint(endpoint, &option),
        ComposerCommand::Reset => composer.reset_to_original(),
        ComposerCommand::Sort { key } => {
            composer.catalog_mut().request_sort(key);
            Ok(())
        }
        ComposerCommand::Filter { filter } => {
            composer.catalog_mut().set_filter(filter);
            Ok(())
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScriptReport {
    pub applied: usize,
    /// Index into the script and the reason the command was refused.
    pub rejected: Vec<(usize, ComposerError)>,
}

/// Replays commands in order. A refused command leaves state as it was and
/// the script carries on, like a drop that snaps back.
pub fn apply_script(composer: &mut Composer, commands: Vec<ComposerCommand>) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (idx, command) in commands.into_iter().enumerate() {
        match apply_command(composer, command) {
            Ok(()) => report.applied += 1,
            Err(err) => {
                debug!(index = idx, error = %err, "command rejected");
                report.rejected.push((idx, err));
            }
        }
    }
    report
}
