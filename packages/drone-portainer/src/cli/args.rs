//! Command line arguments
//!
//! Plugin settings normally arrive as `PLUGIN_*` environment variables set by
//! the CI runner. Flags take precedence over them; the alias lists are
//! resolved in `config`.

use clap::{Args as ClapArgs, Parser};
use std::path::PathBuf;

use crate::plugin::plan::{ForeignStackPolicy, LookupFailurePolicy};

#[derive(Debug, Default, Parser)]
#[command(name = "drone-portainer")]
#[command(author, version, about = "Deploy or update a Portainer stack from a CI pipeline")]
pub struct Args {
    /// Optional TOML file with plugin settings
    #[arg(long, env = "PLUGIN_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Portainer server address [aliases: PLUGIN_PORTAINER_ADDRESS, PLUGIN_PORTAINER, PLUGIN_ADDRESS, PORTAINER_ADDRESS]
    #[arg(long)]
    pub portainer_address: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub portainer_insecure: Option<bool>,

    /// Endpoint name to deploy to (default: local)
    #[arg(long)]
    pub portainer_endpoint: Option<String>,

    /// Portainer username
    #[arg(long)]
    pub portainer_username: Option<String>,

    /// Portainer password
    #[arg(long)]
    pub portainer_password: Option<String>,

    /// Stack name (default: stack)
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Compose file path (default: docker-compose.yml)
    #[arg(long)]
    pub stack_file: Option<PathBuf>,

    /// Inline compose fragment, joined with newlines (repeatable)
    #[arg(long, value_name = "YAML")]
    pub stack_config: Vec<String>,

    /// Stack environment variable as KEY=VALUE (repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    pub stack_environment: Vec<String>,

    /// Remove services missing from the new definition on update (default: true)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub stack_prune: Option<bool>,

    /// What to do when the stack list cannot be fetched
    #[arg(long, value_enum)]
    pub on_lookup_failure: Option<LookupFailurePolicy>,

    /// What to do when the stack name is taken on another endpoint
    #[arg(long, value_enum)]
    pub on_foreign_stack: Option<ForeignStackPolicy>,

    /// Plugin secret (repeatable, passed through)
    #[arg(long)]
    pub secrets: Vec<String>,

    /// Enable debug logging
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub debug: Option<bool>,

    #[command(flatten)]
    pub build: BuildArgs,
}

/// CI metadata provided by the Drone runner. Only logged.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct BuildArgs {
    /// Repository full name
    #[arg(long = "repo.fullname", env = "DRONE_REPO", hide = true)]
    pub repo: Option<String>,

    /// Repository link
    #[arg(long = "repo.link", env = "DRONE_REPO_LINK", hide = true)]
    pub repo_link: Option<String>,

    /// Git remote url
    #[arg(long = "remote.url", env = "DRONE_REMOTE_URL", hide = true)]
    pub remote_url: Option<String>,

    /// Git commit sha
    #[arg(long = "commit.sha", env = "DRONE_COMMIT_SHA", hide = true)]
    pub commit_sha: Option<String>,

    /// Git commit ref
    #[arg(long = "commit.ref", env = "DRONE_COMMIT_REF", hide = true)]
    pub commit_ref: Option<String>,

    /// Git commit branch
    #[arg(long = "commit.branch", env = "DRONE_COMMIT_BRANCH", hide = true)]
    pub commit_branch: Option<String>,

    /// Git author name
    #[arg(long = "commit.author.name", env = "DRONE_COMMIT_AUTHOR", hide = true)]
    pub commit_author: Option<String>,

    /// Build event
    #[arg(long = "build.event", env = "DRONE_BUILD_EVENT", hide = true)]
    pub build_event: Option<String>,

    /// Build number
    #[arg(long = "build.number", env = "DRONE_BUILD_NUMBER", hide = true)]
    pub build_number: Option<u64>,

    /// Build link
    #[arg(long = "build.link", env = "DRONE_BUILD_LINK", hide = true)]
    pub build_link: Option<String>,

    /// Deployment target
    #[arg(long = "build.deploy", env = "DRONE_DEPLOY_TO", hide = true)]
    pub deploy_to: Option<String>,
}
