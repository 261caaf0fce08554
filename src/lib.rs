//! An entity-component runtime for UI automation processes.
//!
//! A process is a tree of components owned by an
//! [`EntityManager`](pixel_core::EntityManager), which also carries the
//! process arguments and a scope of services. The
//! [`ProcessRunner`](pixel_runtime::ProcessRunner) walks the tree and
//! executes it.
//!
//! ```
//! use pixel::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let mut manager = EntityManager::new(ServiceResolver::new());
//! let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
//! manager
//!     .add_component(root, ComponentNode::new(SequenceEntity::new()).named("Login"))
//!     .unwrap();
//! manager.set_arguments(());
//!
//! let summary = ProcessRunner::new().run(&manager).await.unwrap();
//! assert_eq!(summary.steps, 2);
//! # });
//! ```

pub use pixel_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use pixel_internal::prelude::*;
}
