//! Create-or-update decision

use clap::ValueEnum;
use serde::Deserialize;
use tracing::{info, warn};

use portainer_api::{Endpoint, Error, Result, Stack};

/// Outcome of looking up the configured stack by name
#[derive(Debug)]
pub enum StackLookup {
    Found(Stack),
    NotFound,
    /// The stack list could not be fetched
    LookupFailed(Error),
}

impl From<Result<Option<Stack>>> for StackLookup {
    fn from(result: Result<Option<Stack>>) -> Self {
        match result {
            Ok(Some(stack)) => StackLookup::Found(stack),
            Ok(None) => StackLookup::NotFound,
            Err(e) => StackLookup::LookupFailed(e),
        }
    }
}

/// Behaviour when the stack list cannot be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupFailurePolicy {
    /// Log the failure and create the stack
    #[default]
    Deploy,
    /// Fail the run
    Abort,
}

/// Behaviour when a stack with the same name lives on another endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignStackPolicy {
    /// Ignore it and create a new stack on the selected endpoint
    #[default]
    Create,
    /// Fail the run with a conflict
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub on_lookup_failure: LookupFailurePolicy,
    pub on_foreign_stack: ForeignStackPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Create,
    Update(Stack),
}

/// Decide between creating a new stack and updating the existing one.
///
/// Only a stack registered on the selected endpoint is updated.
pub fn plan(lookup: StackLookup, stack_name: &str, endpoint: &Endpoint, policy: &Policy) -> Result<Plan> {
    match lookup {
        StackLookup::Found(stack) if stack.endpoint_id == endpoint.id => Ok(Plan::Update(stack)),
        StackLookup::Found(stack) => match policy.on_foreign_stack {
            ForeignStackPolicy::Create => {
                info!(
                    stack = %stack.name,
                    existing_endpoint = stack.endpoint_id,
                    endpoint = endpoint.id,
                    "Stack exists on another endpoint, creating a new one"
                );
                Ok(Plan::Create)
            }
            ForeignStackPolicy::Reject => Err(Error::Conflict {
                stack: stack.name,
                existing_endpoint: stack.endpoint_id,
                endpoint: endpoint.id,
            }),
        },
        StackLookup::NotFound => Ok(Plan::Create),
        StackLookup::LookupFailed(e) => match policy.on_lookup_failure {
            LookupFailurePolicy::Deploy => {
                warn!(stack = %stack_name, error = %e, "Stack lookup failed, treating stack as absent");
                Ok(Plan::Create)
            }
            LookupFailurePolicy::Abort => Err(e),
        },
    }
}
