//! Constants shared across the workspace

use std::time::Duration;

/// Suffix carried by every artifact key (`<uuid>_vernier`).
pub const ARTIFACT_KEY_SUFFIX: &str = "_vernier";

/// Purpose suffix of the storage key holding a profile artifact.
pub const PROFILE_STORAGE_SUFFIX: &str = "profile";

/// Origin of the external profile viewer allowed to fetch artifacts.
pub const PROFILE_VIEWER_URL: &str = "https://vernier.prof";

/// Extension of profile files written by the file backend.
pub const PROFILE_FILE_EXTENSION: &str = ".json";

/// Default directory of the file backend, relative to the working directory.
pub const PROFILE_OUT_RELATIVE_DIRNAME: &str = "tmp/dial/profiles";

/// Default time-to-live of a stored artifact.
pub const STORAGE_TTL: Duration = Duration::from_secs(60 * 60);

/// Longest accepted time-to-live of a stored artifact (30 days).
pub const MAX_STORAGE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default sampling interval of the profiler, in microseconds.
pub const PROFILER_INTERVAL: u64 = 200;

/// Default allocation sampling interval of the profiler.
pub const PROFILER_ALLOCATION_INTERVAL: u64 = 20_000;

/// Default name of the query/form parameter that forces profiling.
pub const FORCE_PARAM: &str = "dial_force";

/// Default sampling percentage.
pub const SAMPLING_PERCENTAGE: u8 = 100;

/// Default key combination toggling the panel.
pub const TOGGLE_SHORTCUT_KEYS: [&str; 3] = ["Alt", "Shift", "D"];

/// Default route prefix the profile endpoint is mounted under.
pub const MOUNT_PATH: &str = "/dial";

/// Query patterns excluded from duplicate-query detection by default.
pub const IGNORED_QUERY_PATTERNS: [&str; 1] = ["(?i)schema_migrations"];

/// Queries longer than this are truncated when rendered.
pub const QUERY_CHARS_TRUNCATION_THRESHOLD: usize = 100;

/// Closing body marker the panel is injected in front of.
pub const BODY_CLOSE_MARKER: &str = "</body>";

/// Placeholder for values that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// HTML media type.
pub const CONTENT_TYPE_HTML: &str = "text/html";
