//! Stable exit codes for verbfuzz CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid scaffold, config or arguments, or any other failure.
pub const INVALID: i32 = 1;
/// `verbfuzz mutate` ran every round without committing a mutation.
pub const NO_MUTATION: i32 = 2;
