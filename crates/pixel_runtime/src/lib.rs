//! Process runner for Pixel (Layer 3).
//!
//! `pixel_runtime` drives the traversal of an [`EntityManager`]'s component
//! tree: entity hooks, actor execution, entity processors and fault handling.
//!
//! # Core Concepts
//!
//! - [`ProcessRunner`] - Runs a manager's tree and returns a [`RunSummary`]
//! - [`RunnerConfig`] - Fault policy, step cap and per-step timeout
//! - [`ProcessObservers`] - Named observers receiving [`ProcessEvent`]s
//! - [`TracingConfig`] - Optional `tracing-subscriber` setup for hosts
//!
//! # Example
//!
//! ```
//! use pixel_core::prelude::*;
//! use pixel_runtime::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let mut manager = EntityManager::default();
//! let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
//! manager
//!     .add_component(root, ComponentNode::new(RepeatEntity::new(3)).named("Retry"))
//!     .unwrap();
//! manager.set_arguments(());
//!
//! let runner = ProcessRunner::with_config(
//!     RunnerConfig::new().with_fault_policy(FaultPolicy::AbortAlways),
//! );
//! let summary = runner.run(&manager).await.unwrap();
//! assert_eq!(summary.steps, 1);
//! # });
//! ```
//!
//! [`EntityManager`]: pixel_core::EntityManager

/// Runner configuration.
pub mod config;

/// Error types.
pub mod error;

/// Process events and observers.
pub mod events;

/// The process runner.
pub mod runner;

/// Tracing subscriber setup.
pub mod tracing_setup;

pub use config::{FaultPolicy, RunnerConfig};
pub use error::{ObserverError, RunError};
pub use events::{ProcessEvent, ProcessObservers};
pub use runner::{ProcessRunner, RunSummary};
pub use tracing_setup::{TracingConfig, TracingFormat};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::{FaultPolicy, RunnerConfig};
    pub use crate::error::{ObserverError, RunError};
    pub use crate::events::{ProcessEvent, ProcessObservers};
    pub use crate::runner::{ProcessRunner, RunSummary};
    pub use crate::tracing_setup::{TracingConfig, TracingFormat};
}
