//! Events emitted while a process runs, and the observers receiving them.
//!
//! Observers are invoked synchronously, in registration order, from the task
//! driving the run. Keep them short: anything slow delays the process.
//!
//! # Example
//!
//! ```
//! use pixel_runtime::{ProcessEvent, ProcessRunner};
//!
//! let runner = ProcessRunner::new();
//! runner
//!     .observers()
//!     .register("logger", |event: &ProcessEvent| {
//!         if let ProcessEvent::ComponentFaulted { name, error, .. } = event {
//!             tracing::warn!(component = %name, %error, "fault observed");
//!         }
//!     })
//!     .unwrap();
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use parking_lot::RwLock;
use pixel_core::ComponentKey;

use crate::error::{ObserverError, RunError};

// ─────────────────────────────────────────────────────────────────────────────
// ProcessEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Something that happened during a run.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Run-Level Events
    // ─────────────────────────────────────────────────────────────────────────
    /// The run is about to process its first step.
    ProcessStart {
        /// The component the run starts below.
        root: ComponentKey,
        /// Number of components in the tree.
        component_count: usize,
    },

    /// The run completed.
    ProcessComplete {
        /// Number of steps processed.
        steps: usize,
        /// Total duration.
        duration: Duration,
    },

    /// The run ended with an error.
    ProcessFailure {
        /// The error ending the run.
        error: RunError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Component Events
    // ─────────────────────────────────────────────────────────────────────────
    /// An entity's children are about to be processed.
    EntityEnter {
        /// The entity.
        component: ComponentKey,
        /// Its display name.
        name: String,
    },

    /// All children of an entity were processed.
    EntityExit {
        /// The entity.
        component: ComponentKey,
        /// Its display name.
        name: String,
    },

    /// An actor or entity processor is about to execute.
    ActorStart {
        /// The component.
        component: ComponentKey,
        /// Its display name.
        name: String,
    },

    /// An actor or entity processor finished without error.
    ActorComplete {
        /// The component.
        component: ComponentKey,
        /// Its display name.
        name: String,
        /// How long it ran.
        duration: Duration,
    },

    /// A component faulted.
    ComponentFaulted {
        /// The component whose step failed.
        component: ComponentKey,
        /// Its display name.
        name: String,
        /// The error message.
        error: String,
        /// Whether the fault policy swallowed the fault.
        swallowed: bool,
    },
}

impl ProcessEvent {
    /// Returns the variant name, for logs and filters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessEvent::ProcessStart { .. } => "ProcessStart",
            ProcessEvent::ProcessComplete { .. } => "ProcessComplete",
            ProcessEvent::ProcessFailure { .. } => "ProcessFailure",
            ProcessEvent::EntityEnter { .. } => "EntityEnter",
            ProcessEvent::EntityExit { .. } => "EntityExit",
            ProcessEvent::ActorStart { .. } => "ActorStart",
            ProcessEvent::ActorComplete { .. } => "ActorComplete",
            ProcessEvent::ComponentFaulted { .. } => "ComponentFaulted",
        }
    }

    /// Returns the component the event is about.
    ///
    /// Run-level events return `None`.
    #[must_use]
    pub fn component(&self) -> Option<ComponentKey> {
        match self {
            ProcessEvent::ProcessStart { .. }
            | ProcessEvent::ProcessComplete { .. }
            | ProcessEvent::ProcessFailure { .. } => None,
            ProcessEvent::EntityEnter { component, .. }
            | ProcessEvent::EntityExit { component, .. }
            | ProcessEvent::ActorStart { component, .. }
            | ProcessEvent::ActorComplete { component, .. }
            | ProcessEvent::ComponentFaulted { component, .. } => Some(*component),
        }
    }
}

impl fmt::Display for ProcessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessEvent::ProcessStart {
                root,
                component_count,
            } => write!(f, "ProcessStart({root}, components: {component_count})"),
            ProcessEvent::ProcessComplete { steps, duration } => {
                write!(f, "ProcessComplete(steps: {steps}, duration: {duration:?})")
            }
            ProcessEvent::ProcessFailure { error } => write!(f, "ProcessFailure({error})"),
            ProcessEvent::EntityEnter { name, .. } => write!(f, "EntityEnter({name})"),
            ProcessEvent::EntityExit { name, .. } => write!(f, "EntityExit({name})"),
            ProcessEvent::ActorStart { name, .. } => write!(f, "ActorStart({name})"),
            ProcessEvent::ActorComplete { name, duration, .. } => {
                write!(f, "ActorComplete({name}, duration: {duration:?})")
            }
            ProcessEvent::ComponentFaulted {
                name,
                error,
                swallowed,
                ..
            } => write!(f, "ComponentFaulted({name}: {error}, swallowed: {swallowed})"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProcessObservers
// ─────────────────────────────────────────────────────────────────────────────

type Observer = Arc<dyn Fn(&ProcessEvent) + Send + Sync>;

struct ObserverEntry {
    name: String,
    observer: Observer,
}

/// Registry of named event observers.
///
/// Registration and notification take `&self`, so observers can be added
/// while runs are in flight; a run sees the observers registered when each
/// event is emitted.
#[derive(Default)]
pub struct ProcessObservers {
    entries: RwLock<Vec<ObserverEntry>>,
}

impl ProcessObservers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverError::DuplicateName`] if `name` is taken.
    pub fn register<F>(&self, name: impl Into<String>, observer: F) -> Result<&Self, ObserverError>
    where
        F: Fn(&ProcessEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(ObserverError::DuplicateName { name });
        }
        entries.push(ObserverEntry {
            name,
            observer: Arc::new(observer),
        });
        Ok(self)
    }

    /// Removes the observer registered under `name`.
    ///
    /// Returns `true` if one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Sends `event` to every observer, in registration order.
    pub fn notify(&self, event: &ProcessEvent) {
        // Snapshot so observers may register or unregister others.
        let observers: Vec<Observer> = self
            .entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.observer))
            .collect();
        for observer in observers {
            observer(event);
        }
    }

    /// Returns `true` if an observer is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.name == name)
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for ProcessObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        f.debug_struct("ProcessObservers")
            .field("names", &names)
            .finish()
    }
}
