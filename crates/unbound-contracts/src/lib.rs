//! # unbound-contracts
//!
//! Shared types and the error taxonomy for the Unbound command policy gateway.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions and error types.

pub mod command;
pub mod error;
pub mod rule;
pub mod user;
pub mod verdict;
