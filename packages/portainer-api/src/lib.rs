//! Portainer API Library
//!
//! This crate provides a small client for the Portainer management API:
//! authentication, endpoint resolution and stack creation/update.

pub mod adapter;
pub mod client;
pub mod error;
pub mod models;

// Re-exports for convenience
pub use adapter::StackApi;
pub use client::PortainerClient;
pub use error::{Error, Result};
pub use models::{Endpoint, EnvVar, RepositoryCredentials, RepositorySource, Stack};
