//! Raw API record → normalized row mapping.

use std::collections::HashMap;

use serde_json::Value;

use super::tags::{classify, TagBindings, TagColumns, TagResolutionTable};
use crate::backend::{field_str, RawRecord};
use crate::constants::{
    BOARD_NAME_FIELDS, TASK_TIMESTAMP_FIELDS, TASK_TITLE_FIELDS, UNKNOWN_USER_ID_CHARS, UNKNOWN_USER_PREFIX,
    USER_NAME_FIELDS,
};
use crate::entities::{board, task, user};
use crate::utils::datetime;

/// Column identifier → owning board identifier.
pub type ColumnBoardIndex = HashMap<String, String>;

/// Why a task record was not turned into a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The record has no identifier at all.
    MissingId,
    /// Neither a board field nor the column index yields a board.
    NoBoard,
}

fn first_str(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| field_str(record, key))
}

/// Index columns by identifier, skipping columns without a board.
pub fn build_column_index(columns: &[RawRecord]) -> ColumnBoardIndex {
    columns
        .iter()
        .filter_map(|column| Some((field_str(column, "id")?, field_str(column, "boardId")?)))
        .collect()
}

pub fn map_board(raw: &RawRecord) -> Option<board::Model> {
    Some(board::Model {
        id: field_str(raw, "id")?,
        name: first_str(raw, &BOARD_NAME_FIELDS).unwrap_or_default(),
    })
}

pub fn map_user(raw: &RawRecord) -> Option<user::Model> {
    Some(user::Model {
        id: field_str(raw, "id")?,
        name: first_str(raw, &USER_NAME_FIELDS).unwrap_or_default(),
    })
}

/// Placeholder user for an identifier only seen as a task assignee.
pub fn synthesize_user(id: &str) -> user::Model {
    let short: String = id.chars().take(UNKNOWN_USER_ID_CHARS).collect();
    user::Model {
        id: id.to_string(),
        name: format!("{UNKNOWN_USER_PREFIX}{short}"),
    }
}

/// Every non-empty entry of a task's assignee list, in order.
pub fn assignee_ids(raw: &RawRecord) -> Vec<String> {
    raw.get("assigned")
        .and_then(Value::as_array)
        .map(|assigned| {
            assigned
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Coerce a work-hours value to hours rounded to one decimal.
///
/// Accepts numbers and numeric strings. Rounds half away from zero, so
/// `2.25` becomes `2.3`. Negative or non-numeric input yields `None`.
pub fn parse_hours(value: &Value) -> Option<f64> {
    let hours = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    Some((hours * 10.0).round() / 10.0)
}

/// Maps raw task records using the run's tag table and board bindings.
pub struct TaskMapper<'a> {
    tags: &'a TagResolutionTable,
    bindings: &'a TagBindings,
    column_boards: &'a ColumnBoardIndex,
}

impl<'a> TaskMapper<'a> {
    pub fn new(tags: &'a TagResolutionTable, bindings: &'a TagBindings, column_boards: &'a ColumnBoardIndex) -> Self {
        Self {
            tags,
            bindings,
            column_boards,
        }
    }

    /// Board of a task: its own board field first, then its column's board.
    pub fn resolve_board(&self, raw: &RawRecord) -> Option<String> {
        field_str(raw, "boardId").or_else(|| {
            let column_id = field_str(raw, "columnId")?;
            self.column_boards.get(&column_id).cloned()
        })
    }

    /// Resolve a task's tag assignments into the categorical columns.
    ///
    /// Assignments are visited in ascending state-identifier order so the
    /// "last one wins" rule is reproducible between runs.
    pub fn tag_columns(&self, raw: &RawRecord, board_id: &str) -> TagColumns {
        let mut state_ids: Vec<String> = raw
            .get("stickers")
            .and_then(Value::as_object)
            .map(|stickers| {
                stickers
                    .values()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        state_ids.sort();

        let resolved = state_ids.iter().filter_map(|id| self.tags.get(id));
        classify(resolved, self.bindings.for_board(board_id))
    }

    pub fn map_task(&self, raw: &RawRecord) -> Result<task::Model, Rejection> {
        let id = field_str(raw, "id").ok_or(Rejection::MissingId)?;
        let board_id = self.resolve_board(raw).ok_or(Rejection::NoBoard)?;

        let created_at = TASK_TIMESTAMP_FIELDS
            .iter()
            .filter_map(|key| raw.get(*key))
            .find_map(datetime::parse_timestamp);

        let actual_time = raw
            .get("timeTracking")
            .and_then(|tt| tt.get("work"))
            .and_then(parse_hours);

        let tags = self.tag_columns(raw, &board_id);

        Ok(task::Model {
            id,
            title: first_str(raw, &TASK_TITLE_FIELDS).unwrap_or_default(),
            assignee_id: assignee_ids(raw).into_iter().next(),
            board_id,
            created_at,
            actual_time,
            sprint_name: tags.sprint_name,
            project_name: tags.project_name,
            direction: tags.direction,
            state_category: tags.state_category,
        })
    }
}
