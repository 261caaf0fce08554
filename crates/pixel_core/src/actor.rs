//! Leaf components and their execution bookkeeping.
//!
//! An actor performs one automation action. It keeps an [`ActorStatus`]
//! (executing / faulted / error message) which [`execute_actor`] updates
//! around the action and [`Component::reset`] clears again.
//!
//! # Example
//!
//! ```
//! use pixel_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Click {
//!     status: ActorStatus,
//! }
//!
//! impl Component for Click {
//!     fn status(&self) -> Option<&ActorStatus> {
//!         Some(&self.status)
//!     }
//!
//!     fn as_actor(&self) -> Option<&dyn Actor> {
//!         Some(self)
//!     }
//! }
//!
//! impl Actor for Click {
//!     fn act(&self, _ctx: ComponentContext<'_>) -> Result<(), ActorError> {
//!         Ok(())
//!     }
//! }
//! ```

use parking_lot::Mutex;

use crate::component::{BoxFuture, Component, ComponentContext};
use crate::error::ActorError;

/// A leaf component with a synchronous action.
pub trait Actor: Send + Sync {
    /// Performs the action.
    ///
    /// # Errors
    ///
    /// Any error marks the component as faulted.
    fn act(&self, ctx: ComponentContext<'_>) -> Result<(), ActorError>;
}

/// A leaf component with an asynchronous action.
pub trait AsyncActor: Send + Sync {
    /// Performs the action.
    ///
    /// # Errors
    ///
    /// Any error marks the component as faulted.
    fn act_async<'a>(&'a self, ctx: ComponentContext<'a>) -> BoxFuture<'a, Result<(), ActorError>>;
}

#[derive(Debug, Default)]
struct StatusState {
    is_faulted: bool,
    is_executing: bool,
    error_message: Option<String>,
}

/// Execution-time state of an actor.
#[derive(Debug, Default)]
pub struct ActorStatus {
    state: Mutex<StatusState>,
}

impl ActorStatus {
    /// Creates a fresh status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the last execution failed.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.state.lock().is_faulted
    }

    /// Returns `true` while the action runs.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state.lock().is_executing
    }

    /// Returns the message of the last failure.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.state.lock().error_message.clone()
    }

    /// Marks the start of an execution.
    pub fn begin(&self) {
        let mut state = self.state.lock();
        state.is_executing = true;
        state.is_faulted = false;
        state.error_message = None;
    }

    /// Marks a successful end of execution.
    pub fn complete(&self) {
        self.state.lock().is_executing = false;
    }

    /// Marks a failed end of execution.
    pub fn fault(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        state.is_executing = false;
        state.is_faulted = true;
        state.error_message = Some(message.into());
    }

    /// Clears all execution-time state.
    pub fn reset(&self) {
        *self.state.lock() = StatusState::default();
    }
}

/// Runs the action of `component`, updating its status.
///
/// Synchronous actors take precedence over asynchronous ones when a
/// component implements both.
///
/// # Errors
///
/// Returns [`ActorError::NotAnActor`] if the component has no action, or the
/// action's own error.
pub async fn execute_actor(
    component: &dyn Component,
    ctx: ComponentContext<'_>,
) -> Result<(), ActorError> {
    let status = component.status();
    if let Some(status) = status {
        status.begin();
    }

    let result = if let Some(actor) = component.as_actor() {
        actor.act(ctx)
    } else if let Some(actor) = component.as_async_actor() {
        actor.act_async(ctx).await
    } else {
        Err(ActorError::NotAnActor(ctx.key()))
    };

    if let Some(status) = status {
        match &result {
            Ok(()) => status.complete(),
            Err(err) => status.fault(err.to_string()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_records_message() {
        let status = ActorStatus::new();
        status.begin();
        assert!(status.is_executing());

        status.fault("element not found");

        assert!(!status.is_executing());
        assert!(status.is_faulted());
        assert_eq!(status.error_message().as_deref(), Some("element not found"));
    }

    #[test]
    fn reset_clears_everything() {
        let status = ActorStatus::new();
        status.begin();
        status.fault("boom");

        status.reset();

        assert!(!status.is_faulted());
        assert!(!status.is_executing());
        assert!(status.error_message().is_none());
    }

    #[test]
    fn begin_clears_previous_fault() {
        let status = ActorStatus::new();
        status.fault("first run");

        status.begin();
        status.complete();

        assert!(!status.is_faulted());
    }
}
