//! Deterministic, pure logic: the contract model and its validator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod error;
pub mod instantiate;
pub mod invariants;
pub mod node;
pub mod path;
pub mod replay;
pub mod spec;
pub mod state;
pub mod table;
