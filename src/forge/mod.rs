//! forge
//!
//! Abstraction for the code-hosting service that receives pull requests.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for interacting with remote
//! hosting services. Commands use the [`create_forge`] factory function
//! rather than importing specific forge implementations directly.
//!
//! Forge operations run only after a branch has been pushed. A forge
//! failure is reported against the repository but never rolls back the
//! local commit or the pushed branch.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing
//! - `token`: Bearer token sources
//! - `factory`: Forge creation

mod factory;
pub mod github;
pub mod mock;
mod token;
mod traits;

pub use factory::{create_forge, create_forge_with_token};
pub use token::{EnvTokenProvider, StaticToken, TokenProvider};
pub use traits::*;
