//! Centralized default constants for mediatrack.
//!
//! Crates and the CLI reference these instead of defining their own values.

// =============================================================================
// CATALOG
// =============================================================================

/// Description stored for a category created without one.
pub const CATEGORY_DESCRIPTION: &str = "No description.";

/// Maximum length of category and field names.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a category description.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Maximum length of a username.
pub const MAX_USERNAME_LEN: usize = 100;

// =============================================================================
// DATABASE
// =============================================================================

/// Database URL used when `DATABASE_URL` is not set.
pub const DATABASE_URL: &str = "postgres://localhost/mediatrack";

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// LOGGING
// =============================================================================

/// Default `RUST_LOG` filter for the CLI.
pub const LOG_FILTER: &str = "mediatrack=info,mediatrack_core=info,mediatrack_db=info";

/// Default log format ("text" or "json").
pub const LOG_FORMAT: &str = "text";
