//! Tag resolution and per-board tag classification.
//!
//! Tag groups ("Project", "Direction", sprint boards, ...) each own a set of
//! states. A task stores, per group, the state it is set to. The engine
//! flattens all groups into a [`TagResolutionTable`] and then classifies a
//! task's states into four categorical columns using the board's
//! [`GroupBinding`].

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::TagGroup;
use crate::constants::{
    DEFAULT_DIRECTION_GROUP_ID, DEFAULT_PROJECT_GROUP_ID, SPECIAL_BOARD_ID, SPECIAL_DIRECTION_GROUP_ID,
    SPECIAL_PROJECT_GROUP_ID, SPRINT_MARKERS,
};

/// A tag state together with its owning group.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedState {
    pub name: String,
    pub group_id: String,
    pub group_name: String,
}

/// Flat index from state identifier to its name and owning group.
#[derive(Clone, Debug, Default)]
pub struct TagResolutionTable {
    states: HashMap<String, ResolvedState>,
}

impl TagResolutionTable {
    /// Flatten group definitions into a state lookup.
    ///
    /// A state identifier that appears in several groups resolves to the
    /// group listed last.
    pub fn from_groups(groups: &[TagGroup]) -> Self {
        let states = groups
            .iter()
            .flat_map(|group| {
                group.states.iter().map(move |state| {
                    (
                        state.id.clone(),
                        ResolvedState {
                            name: state.name.clone(),
                            group_id: group.id.clone(),
                            group_name: group.name.clone(),
                        },
                    )
                })
            })
            .collect();
        Self { states }
    }

    pub fn get(&self, state_id: &str) -> Option<&ResolvedState> {
        self.states.get(state_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Which tag groups carry the project and direction of a board's tasks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBinding {
    pub project_group: String,
    pub direction_group: String,
}

/// Board identifier → group binding, with a fallback for unlisted boards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagBindings {
    pub default: GroupBinding,
    pub boards: HashMap<String, GroupBinding>,
}

impl Default for TagBindings {
    fn default() -> Self {
        let mut boards = HashMap::new();
        boards.insert(
            SPECIAL_BOARD_ID.to_string(),
            GroupBinding {
                project_group: SPECIAL_PROJECT_GROUP_ID.to_string(),
                direction_group: SPECIAL_DIRECTION_GROUP_ID.to_string(),
            },
        );

        Self {
            default: GroupBinding {
                project_group: DEFAULT_PROJECT_GROUP_ID.to_string(),
                direction_group: DEFAULT_DIRECTION_GROUP_ID.to_string(),
            },
            boards,
        }
    }
}

impl TagBindings {
    /// Binding that applies to the given board.
    pub fn for_board(&self, board_id: &str) -> &GroupBinding {
        self.boards.get(board_id).unwrap_or(&self.default)
    }

    /// Reject empty group identifiers.
    pub fn validate(&self) -> Result<()> {
        let entries = std::iter::once(("default", &self.default))
            .chain(self.boards.iter().map(|(board, binding)| (board.as_str(), binding)));
        for (board, binding) in entries {
            if board.trim().is_empty() {
                anyhow::bail!("tags.boards contains an empty board identifier");
            }
            if binding.project_group.trim().is_empty() || binding.direction_group.trim().is_empty() {
                anyhow::bail!("tags binding for '{}' has an empty group identifier", board);
            }
        }
        Ok(())
    }
}

/// The four categorical columns derived from a task's tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagColumns {
    pub sprint_name: Option<String>,
    pub project_name: Option<String>,
    pub direction: Option<String>,
    pub state_category: Option<String>,
}

/// Whether a state name marks a sprint.
pub fn is_sprint_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SPRINT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Classify resolved states into the categorical columns.
///
/// Per state: the project group fills `project_name`, the direction group
/// fills `direction`. Independently, a sprint-like name fills `sprint_name`;
/// otherwise a state from any other group records its group name as
/// `state_category`. When several states land in the same column, the last
/// one visited wins.
pub fn classify<'a, I>(states: I, binding: &GroupBinding) -> TagColumns
where
    I: IntoIterator<Item = &'a ResolvedState>,
{
    let mut columns = TagColumns::default();

    for state in states {
        let is_project = state.group_id == binding.project_group;
        let is_direction = state.group_id == binding.direction_group;

        if is_project {
            columns.project_name = Some(state.name.clone());
        } else if is_direction {
            columns.direction = Some(state.name.clone());
        }

        if is_sprint_name(&state.name) {
            columns.sprint_name = Some(state.name.clone());
        } else if !is_project && !is_direction {
            columns.state_category = Some(state.group_name.clone());
        }
    }

    columns
}
