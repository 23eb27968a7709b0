//! Command-line form layer over the entity store.
//!
//! Each invocation loads a catalog, opens the store, optionally logs in,
//! runs one command and prints its result as JSON.

pub mod args;
pub mod catalog;
pub mod commands;
pub mod state;
