//! Default values for stackctl configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// API Defaults
// ============================================================================

/// Base URL of the stack management API.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Timeout for calls that submit a long-running operation (seconds).
///
/// Backends may take a while to accept a restore or attach request.
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 60;

/// Timeout for plain reads such as status and checkpoint listing (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Timeout for a single task-status poll (seconds).
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Poller Defaults
// ============================================================================

/// Interval between task-status polls (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Consecutive transport failures tolerated before a poll is abandoned.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

// ============================================================================
// Backup Defaults
// ============================================================================

/// Number of checkpoints fetched on each refresh.
pub const DEFAULT_CHECKPOINT_LIMIT: usize = 10;

// ============================================================================
// File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "stackctl.toml";

/// Directory under the user config dir holding `config.toml`.
pub const USER_CONFIG_DIR: &str = "stackctl";
