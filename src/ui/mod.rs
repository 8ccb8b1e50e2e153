//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`browser`] - Opening pull request links
//!
//! # Design
//!
//! Everything meant for the user goes through this module. Diagnostics go
//! through `tracing` instead.

pub mod browser;
pub mod output;
