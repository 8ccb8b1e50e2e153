//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RepoSlug
//! - [`config`] - User configuration and the repository list
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Configuration is validated when loaded, never half-way through a run

pub mod config;
pub mod types;
