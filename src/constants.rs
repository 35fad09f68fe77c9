//! Constants used throughout the application
//!
//! This module centralizes fixed strings, protocol keys and default values.

// API defaults
pub const DEFAULT_API_BASE_URL: &str = "https://ru.yougile.com/api-v2";
pub const DEFAULT_TOKEN_ENV: &str = "YOUGILE_API_TOKEN";
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Keys under which a wrapped response body may carry its record list
pub const ITEM_KEYS: [&str; 3] = ["content", "items", "data"];

/// Error response bodies are truncated to this many characters in messages
pub const ERROR_BODY_PREVIEW_CHARS: usize = 300;

// Database defaults
pub const DEFAULT_DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DEFAULT_SCHEMA: &str = "public";
pub const SCHEMA_ENV: &str = "PG_SCHEMA";

/// Maximum rows per INSERT statement inside an upsert batch
pub const UPSERT_CHUNK_SIZE: usize = 1000;

// Record mapping
pub const BOARD_NAME_FIELDS: [&str; 3] = ["name", "title", "caption"];
pub const USER_NAME_FIELDS: [&str; 2] = ["realName", "name"];
pub const TASK_TITLE_FIELDS: [&str; 2] = ["title", "name"];
pub const TASK_TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "timestamp"];
pub const UNKNOWN_USER_PREFIX: &str = "Unknown User ";
pub const UNKNOWN_USER_ID_CHARS: usize = 8;

/// Lowercase substrings marking a tag state as a sprint
pub const SPRINT_MARKERS: [&str; 2] = ["sprint", "спринт"];

// Tag group bindings shipped in the default configuration
pub const SPECIAL_BOARD_ID: &str = "b3ca4ebc-858e-46b9-8d43-c34035fe9f07";
pub const SPECIAL_PROJECT_GROUP_ID: &str = "5b0a3b20-1dbb-4df5-b3e6-37ae4581905a";
pub const SPECIAL_DIRECTION_GROUP_ID: &str = "093eef50-9bde-4d5a-b790-b902e0d1d1b9";
pub const DEFAULT_PROJECT_GROUP_ID: &str = "c3e14cd1-7d09-437c-9fe2-e009fb8cd313";
pub const DEFAULT_DIRECTION_GROUP_ID: &str = "120b46c6-ffac-42cb-87b4-e914077e0404";

// Log Messages
pub const LOG_CONNECTING: &str = "🔌 Connecting to database…";
pub const LOG_CHECKING_EXISTING: &str = "🔍 Checking existing data…";
pub const LOG_FETCHING_REMOTE: &str = "📥 Loading data from API…";
pub const LOG_FETCHING_TAGS: &str = "🏷️  Loading tag groups…";
pub const LOG_STORING_BOARDS: &str = "💾 Saving new boards…";
pub const LOG_STORING_USERS: &str = "💾 Saving new users…";
pub const LOG_STORING_TASKS: &str = "💾 Saving new tasks…";
pub const LOG_SYNC_FAILED: &str = "❌ Sync failed";

// CLI Messages
pub const CONFIG_GENERATED: &str = "✅ Generated default configuration file";
