//! drone-portainer Library
//!
//! Configuration resolution and the deploy/update pipeline behind the
//! `drone-portainer` CI step.

pub mod cli;
pub mod plugin;

// Re-exports for convenience
pub use cli::args::Args;
pub use cli::config::Settings;
pub use plugin::deploy::{Action, Deployer, Outcome};
pub use plugin::exec;
