//! Deploy Handler
//!
//! Runs one deployment: connect, authenticate, resolve the endpoint, look
//! up the stack, then create or update it. Any failure stops the run.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use portainer_api::{Endpoint, Error, Result, Stack, StackApi};

use crate::cli::config::Settings;
use crate::plugin::plan::{plan, Plan, StackLookup};
use crate::plugin::progress::Progress;
use crate::plugin::source::StackSource;
use crate::plugin::state::{DeployPhase, DeployStateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct Outcome {
    pub action: Action,
    pub stack: String,
    /// Time spent in the create/update call
    pub elapsed: Duration,
}

pub struct Deployer<'a, A: StackApi> {
    api: &'a mut A,
    settings: &'a Settings,
    state: DeployStateMachine,
    progress: Progress,
}

impl<'a, A: StackApi> Deployer<'a, A> {
    pub fn new(api: &'a mut A, settings: &'a Settings) -> Self {
        Self {
            api,
            settings,
            state: DeployStateMachine::new(),
            progress: Progress::stdout(),
        }
    }

    /// Send progress lines somewhere other than stdout
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &DeployStateMachine {
        &self.state
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        match self.execute().await {
            Ok(outcome) => {
                self.state.transition_to(DeployPhase::Done, None);
                Ok(outcome)
            }
            Err(e) => {
                warn!(phase = %self.state.current_phase(), error = %e, "Deployment failed");
                self.state.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<Outcome> {
        let settings = self.settings;

        self.progress
            .step("Connecting to portainer server", self.api.connect())
            .await?;
        self.state.transition_to(DeployPhase::Connected, None);

        self.progress
            .step(
                "Authentication",
                self.api.authenticate(&settings.portainer.username, &settings.portainer.password),
            )
            .await?;
        self.state.transition_to(DeployPhase::Authenticated, None);

        let endpoint = self
            .progress
            .step(
                format!("Selecting endpoint \"{}\"", settings.portainer.endpoint),
                self.api.find_endpoint_by_name(&settings.portainer.endpoint),
            )
            .await?;
        self.state.transition_to(
            DeployPhase::EndpointResolved,
            Some(format!("endpoint {}", endpoint.id)),
        );

        let lookup = self.lookup_stack(&settings.stack.name).await?;
        self.state.transition_to(DeployPhase::StackChecked, None);

        let decision = plan(lookup, &settings.stack.name, &endpoint, &settings.policy)?;
        debug!(plan = ?decision, "Deployment planned");

        let start = Instant::now();
        let action = match decision {
            Plan::Update(stack) => {
                self.update(&stack).await?;
                self.state.transition_to(DeployPhase::Updated, None);
                Action::Updated
            }
            Plan::Create => {
                self.create(&endpoint).await?;
                self.state.transition_to(DeployPhase::Deployed, None);
                Action::Created
            }
        };
        let elapsed = start.elapsed();

        let verb = match action {
            Action::Created => "Deploy",
            Action::Updated => "Update",
        };
        self.progress.line(format!(
            "{} stack \"{}\" finished in {:.2?}",
            verb, settings.stack.name, elapsed
        ));

        info!(
            stack = %settings.stack.name,
            action = ?action,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stack deployed"
        );

        Ok(Outcome {
            action,
            stack: settings.stack.name.clone(),
            elapsed,
        })
    }

    /// Look up the stack. Only configuration errors stop the run here, fetch
    /// failures are left to the lookup policy.
    async fn lookup_stack(&mut self, name: &str) -> Result<StackLookup> {
        self.progress.begin(format!("Search stack \"{}\"", name));

        match self.api.find_stack_by_name(name).await {
            Ok(Some(stack)) => {
                self.progress.ok();
                debug!(stack_id = stack.id, endpoint_id = stack.endpoint_id, "Stack found");
                Ok(StackLookup::Found(stack))
            }
            Ok(None) => {
                self.progress.ok_with("not found");
                Ok(StackLookup::NotFound)
            }
            Err(e) if e.is_configuration() => {
                self.progress.fail();
                Err(e)
            }
            Err(e) => {
                self.progress.fail();
                Ok(StackLookup::LookupFailed(e))
            }
        }
    }

    async fn create(&mut self, endpoint: &Endpoint) -> Result<()> {
        let settings = self.settings;
        let stack = &settings.stack;
        let source = stack.source();

        let result = match &source {
            Some(StackSource::Inline(content)) => {
                self.progress.begin(format!("Deploying stack \"{}\"", stack.name));
                self.api
                    .deploy_from_string(endpoint, &stack.name, content, &stack.environment)
                    .await
            }
            Some(StackSource::File(path)) => {
                self.progress.begin(format!(
                    "Deploying stack \"{}\" from {}",
                    stack.name,
                    path.display()
                ));
                self.api
                    .deploy_from_file(endpoint, &stack.name, path, &stack.environment)
                    .await
            }
            None => {
                self.progress.begin(format!("Deploying stack \"{}\"", stack.name));
                Err(source_not_defined())
            }
        };

        self.finish_step(result)
    }

    async fn update(&mut self, existing: &Stack) -> Result<()> {
        let settings = self.settings;
        let stack = &settings.stack;
        self.progress.begin(format!("Updating stack \"{}\"", existing.name));

        let result = match stack.source() {
            Some(StackSource::Inline(content)) => {
                self.api
                    .update_from_string(existing, &content, stack.prune, &stack.environment)
                    .await
            }
            Some(StackSource::File(path)) => {
                self.api
                    .update_from_file(existing, &path, stack.prune, &stack.environment)
                    .await
            }
            None => Err(source_not_defined()),
        };

        self.finish_step(result)
    }

    fn finish_step(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.progress.ok();
                Ok(())
            }
            Err(e) => {
                self.progress.fail();
                Err(e)
            }
        }
    }
}

fn source_not_defined() -> Error {
    Error::Configuration("stack source not defined".to_string())
}
