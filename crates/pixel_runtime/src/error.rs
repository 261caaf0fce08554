//! Errors raised by the process runner.

use pixel_core::{ActorError, ComponentKey, ManagerError};

/// Errors that end a run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    /// The manager cannot be run in its current state.
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// The run was started below a component outside the tree.
    #[error("unknown start component: {0}")]
    UnknownComponent(ComponentKey),

    /// A component faulted and the fault policy did not swallow it.
    #[error("component '{name}' ({component}) faulted: {source}")]
    Faulted {
        /// The component that raised the fault.
        component: ComponentKey,
        /// Its display name.
        name: String,
        /// The component's error.
        source: ActorError,
    },

    /// The run processed more steps than allowed.
    #[error("step limit exceeded: more than {max} steps processed")]
    StepLimitExceeded {
        /// The configured maximum.
        max: usize,
    },
}

impl RunError {
    /// Returns the faulting component, if the run ended on a fault.
    #[must_use]
    pub fn faulting_component(&self) -> Option<ComponentKey> {
        match self {
            RunError::Faulted { component, .. } => Some(*component),
            RunError::Manager(_)
            | RunError::UnknownComponent(_)
            | RunError::StepLimitExceeded { .. } => None,
        }
    }
}

/// Errors raised while registering observers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    /// An observer with this name is already registered.
    #[error("observer '{name}' is already registered")]
    DuplicateName {
        /// The duplicate observer name.
        name: String,
    },
}
