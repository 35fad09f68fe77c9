//! Remote collection layer.
//!
//! This module defines the interface the sync engine uses to pull raw
//! collections from the project-management API, along with the error type
//! and the tag-group definitions that the mapper consumes.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::sync::tags::TagResolutionTable;

pub mod retry;
pub mod yougile;

/// A single record as returned by the API, before any mapping.
pub type RawRecord = Map<String, Value>;

/// Error types for remote operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<std::time::Duration> },

    #[error("Server error: HTTP {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unauthorized (HTTP 401). Check the bearer token.")]
    Unauthorized,

    #[error("Request rejected: HTTP {status}: {body}")]
    BadRequest { status: u16, body: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<ApiError> },
}

/// Remote collections the engine knows how to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Boards,
    Users,
    Columns,
    Tasks,
    StringStickers,
    SprintStickers,
}

impl Endpoint {
    /// Path segment relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Boards => "boards",
            Self::Users => "users",
            Self::Columns => "columns",
            Self::Tasks => "task-list",
            Self::StringStickers => "string-stickers",
            Self::SprintStickers => "sprint-stickers",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// One possible value of a tag group.
#[derive(Clone, Debug, PartialEq)]
pub struct TagState {
    pub id: String,
    pub name: String,
    /// Sprint window start, only present on sprint states.
    pub begin: Option<chrono::NaiveDate>,
    /// Sprint window end, only present on sprint states.
    pub end: Option<chrono::NaiveDate>,
}

/// A named taxonomy ("Project", "Direction", "Sprint", ...) and its states.
#[derive(Clone, Debug, PartialEq)]
pub struct TagGroup {
    pub id: String,
    pub name: String,
    pub states: Vec<TagState>,
}

impl TagGroup {
    /// Build a group from a raw definition record.
    ///
    /// Returns `None` when the record has no identifier. States without an
    /// identifier are dropped.
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let id = field_str(record, "id")?;
        let name = field_str(record, "name").unwrap_or_default();
        let states = record
            .get("states")
            .and_then(Value::as_array)
            .map(|states| {
                states
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|state| {
                        Some(TagState {
                            id: field_str(state, "id")?,
                            name: field_str(state, "name").unwrap_or_default(),
                            begin: state.get("begin").and_then(crate::utils::datetime::parse_timestamp),
                            end: state.get("end").and_then(crate::utils::datetime::parse_timestamp),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self { id, name, states })
    }
}

/// Read a field as an opaque string identifier or label.
///
/// Strings are returned as-is (trimmed, empty treated as missing); numbers are
/// rendered without any interpretation. Other JSON types count as missing.
pub fn field_str(record: &RawRecord, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Source of raw collections for a sync run.
///
/// The HTTP implementation lives in [`yougile`]; tests substitute scripted
/// sources.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch every record of a paginated collection, in page order.
    async fn fetch_collection(&self, endpoint: Endpoint) -> Result<Vec<RawRecord>, ApiError>;

    /// Fetch all tag-group definitions (string and sprint stickers).
    async fn fetch_tag_groups(&self) -> Result<Vec<TagGroup>, ApiError> {
        let mut groups = Vec::new();
        for endpoint in [Endpoint::StringStickers, Endpoint::SprintStickers] {
            let records = self.fetch_collection(endpoint).await?;
            groups.extend(records.iter().filter_map(TagGroup::from_record));
        }
        Ok(groups)
    }

    /// Fetch the tag groups and flatten them into a state lookup table.
    async fn fetch_tag_states(&self) -> Result<TagResolutionTable, ApiError> {
        let groups = self.fetch_tag_groups().await?;
        Ok(TagResolutionTable::from_groups(&groups))
    }
}
