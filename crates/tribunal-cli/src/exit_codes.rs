//! Stable process exit codes.

/// Run completed and a report exists (possibly degraded or halted).
pub const OK: i32 = 0;
/// Invalid rubric, config, or missing credentials.
pub const CONFIG_ERROR: i32 = 2;
