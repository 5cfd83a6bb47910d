//! Deployment pipeline
//!
//! Drives a `StackApi` through connect, login, endpoint resolution, stack
//! lookup and the final create or update.

pub mod deploy;
pub mod plan;
pub mod progress;
pub mod source;
pub mod state;

use portainer_api::{PortainerClient, Result};

use crate::cli::config::Settings;
use deploy::{Deployer, Outcome};

/// Run one deployment against the configured Portainer server
pub async fn exec(settings: &Settings) -> Result<Outcome> {
    let mut client = PortainerClient::new(
        &settings.portainer.address,
        settings.portainer.insecure,
    )?;

    Deployer::new(&mut client, settings).run().await
}
