//! scmdiff - diffs for Cliosoft SOS and ClearCase/VersionVault workspaces
//!
//! This library provides:
//! - [`scm`]: Backend trait, command execution, and the SOS and ClearCase backends
//! - [`diff`]: Per-file diff engine, unified writer, and DiffX container
//! - [`fetch`]: Scratch space and scoped content retrieval
//! - [`filter`]: Include/exclude path filtering
//! - [`model`]: Domain models
//! - [`config`]: Library-level configuration

pub mod config;
pub mod diff;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod scm;
