//! Default values for tracelink configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Cache Defaults
// ============================================================================

/// Maximum number of class-name and file-name lookups kept per cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Time-to-live for cached lookups (10 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

// ============================================================================
// Scan Defaults
// ============================================================================

/// Lines longer than this are not treated as stack-trace lines (4 KB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4 * 1024;

/// Highlight the call of the previous frame's method on caller frames.
pub const DEFAULT_HIGHLIGHT_CALL_SITES: bool = true;

// ============================================================================
// Index Defaults
// ============================================================================

/// File extensions indexed under source roots.
pub const DEFAULT_EXTENSIONS: &[&str] = &["java"];

/// Directories skipped while walking source roots.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Build output
    "target",
    "build",
    "out",
    "bin",
    // IDE
    ".idea",
    ".gradle",
    // Dependencies
    "node_modules",
];

// ============================================================================
// File Names
// ============================================================================

/// Project-local configuration file.
pub const PROJECT_CONFIG_FILE: &str = "tracelink.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "tracelink";

/// File name inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.toml";
