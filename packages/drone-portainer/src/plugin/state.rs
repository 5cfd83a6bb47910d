//! Deployment State Management
//!
//! Tracks which phase a deployment run has reached. Phases only move
//! forward; any phase may fail, and a failed run stays failed.

use chrono::{DateTime, Utc};

/// Represents the phases of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    /// Nothing attempted yet
    Idle,
    /// Server answered the liveness check
    Connected,
    /// Token obtained
    Authenticated,
    /// Target endpoint and its cluster id are known
    EndpointResolved,
    /// Existing stack lookup finished (found, absent or failed)
    StackChecked,
    /// A new stack was created
    Deployed,
    /// The existing stack was updated
    Updated,
    Done,
    Failed,
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployPhase::Idle => write!(f, "Idle"),
            DeployPhase::Connected => write!(f, "Connected"),
            DeployPhase::Authenticated => write!(f, "Authenticated"),
            DeployPhase::EndpointResolved => write!(f, "EndpointResolved"),
            DeployPhase::StackChecked => write!(f, "StackChecked"),
            DeployPhase::Deployed => write!(f, "Deployed"),
            DeployPhase::Updated => write!(f, "Updated"),
            DeployPhase::Done => write!(f, "Done"),
            DeployPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// State transition information
#[derive(Debug, Clone)]
pub struct PhaseTransition {
    pub from: DeployPhase,
    pub to: DeployPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct DeployStateMachine {
    current: DeployPhase,
    transitions: Vec<PhaseTransition>,
}

impl DeployStateMachine {
    /// Create a new state machine starting in Idle
    pub fn new() -> Self {
        Self {
            current: DeployPhase::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn current_phase(&self) -> DeployPhase {
        self.current
    }

    /// Transition to a new phase. Returns false and leaves the phase
    /// unchanged when the transition is not allowed.
    pub fn transition_to(&mut self, new_phase: DeployPhase, reason: Option<String>) -> bool {
        if !Self::is_valid_transition(self.current, new_phase) {
            tracing::warn!(
                from = %self.current,
                to = %new_phase,
                "Rejected deployment phase transition"
            );
            return false;
        }

        let old_phase = self.current;
        self.current = new_phase;
        self.transitions.push(PhaseTransition {
            from: old_phase,
            to: new_phase,
            timestamp: Utc::now(),
            reason,
        });

        tracing::debug!(from = %old_phase, to = %new_phase, "Deployment phase transition");

        true
    }

    fn is_valid_transition(from: DeployPhase, to: DeployPhase) -> bool {
        use DeployPhase::*;

        if to == Failed {
            return !matches!(from, Done | Failed);
        }

        matches!(
            (from, to),
            (Idle, Connected)
                | (Connected, Authenticated)
                | (Authenticated, EndpointResolved)
                | (EndpointResolved, StackChecked)
                | (StackChecked, Deployed)
                | (StackChecked, Updated)
                | (Deployed, Done)
                | (Updated, Done)
        )
    }

    /// Mark the run as failed
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.transition_to(DeployPhase::Failed, Some(reason.into()));
    }

    /// Transitions in the order they happened
    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// Phase the run was in when it failed
    pub fn failed_in(&self) -> Option<DeployPhase> {
        self.transitions
            .iter()
            .find(|t| t.to == DeployPhase::Failed)
            .map(|t| t.from)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.current, DeployPhase::Done | DeployPhase::Failed)
    }
}

impl Default for DeployStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
