//! Stack API Adapter Trait
//!
//! Defines the interface the deployment pipeline drives. `PortainerClient`
//! is the HTTP implementation.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::models::{Endpoint, EnvVar, RepositorySource, Stack};

#[async_trait]
pub trait StackApi: Send + Sync {
    /// Liveness check against the server root
    async fn connect(&self) -> Result<()>;

    /// Log in and keep the returned token for every later call
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()>;

    /// Resolve an endpoint by exact name, including its cluster identifier
    async fn find_endpoint_by_name(&self, name: &str) -> Result<Endpoint>;

    /// Look up a stack by exact name. `Ok(None)` means the stack does not exist.
    async fn find_stack_by_name(&self, name: &str) -> Result<Option<Stack>>;

    /// Create a stack from an inline compose definition
    async fn deploy_from_string(
        &self,
        endpoint: &Endpoint,
        name: &str,
        content: &str,
        env: &[EnvVar],
    ) -> Result<()>;

    /// Create a stack from a compose file in a git repository
    async fn deploy_from_repository(
        &self,
        endpoint: &Endpoint,
        name: &str,
        repository: &RepositorySource,
        env: &[EnvVar],
    ) -> Result<()>;

    /// Create a stack from a local compose file
    async fn deploy_from_file(
        &self,
        endpoint: &Endpoint,
        name: &str,
        path: &Path,
        env: &[EnvVar],
    ) -> Result<()> {
        let content = read_stack_file(path).await?;
        self.deploy_from_string(endpoint, name, &content, env).await
    }

    /// Replace the definition of an existing stack
    async fn update_from_string(
        &self,
        stack: &Stack,
        content: &str,
        prune: bool,
        env: &[EnvVar],
    ) -> Result<()>;

    /// Replace the definition of an existing stack with a local compose file
    async fn update_from_file(
        &self,
        stack: &Stack,
        path: &Path,
        prune: bool,
        env: &[EnvVar],
    ) -> Result<()> {
        let content = read_stack_file(path).await?;
        self.update_from_string(stack, &content, prune, env).await
    }
}

pub(crate) async fn read_stack_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })
}
