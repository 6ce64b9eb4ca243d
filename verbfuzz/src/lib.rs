//! Model-based fuzzing core for RDMA verb sequences.
//!
//! A verb sequence is only worth executing if every call in it is legal given
//! what came before. This crate models that legality and keeps it intact
//! while mutating sequences:
//!
//! - **[`core`]**: Pure, deterministic logic. Verb contracts, path
//!   expressions over verb payloads, the transactional resource table and
//!   sequence replay. No I/O.
//! - **[`mutate`]**: The mutation engine. Every edit is validated against the
//!   contract model before it is committed.
//! - **[`verbs`]**: The verb catalog.
//! - **[`io`]**: Side-effecting operations (config and scaffold files).
//!
//! [`run`] and the CLI coordinate the engine with I/O.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mutate;
pub mod run;
pub mod scaffold;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verbs;
