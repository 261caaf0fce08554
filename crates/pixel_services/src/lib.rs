//! Hierarchical service scopes for Pixel (Layer 1).
//!
//! `pixel_services` provides the dependency-injection primitives the component
//! tree resolves its collaborators from:
//!
//! - [`storage`] - Type-keyed storage for shared service instances
//! - [`resolver`] - [`ServiceResolver`], a scope with an optional parent scope
//!
//! # Scoping
//!
//! ```text
//! Project scope (singletons: FileSystem, ApplicationDataManager)
//!    │
//!    ├── Process scope (scoped: ScriptEngine, ArgumentProcessor)
//!    │
//!    └── Prefab scope (scoped: ScriptEngine, ArgumentProcessor)
//! ```
//!
//! Singletons are built once and shared with every child scope. Scoped
//! services are registered once but every scope builds its own instance, so
//! two prefabs never observe each other's script globals.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pixel_services::ServiceResolver;
//!
//! struct Clock;
//!
//! let root = Arc::new(ServiceResolver::new());
//! root.register_instance(Arc::new(Clock));
//!
//! let child = root.child();
//! assert!(Arc::ptr_eq(
//!     &child.get::<Clock>().unwrap(),
//!     &root.get::<Clock>().unwrap(),
//! ));
//! ```

/// Hierarchical service resolution.
pub mod resolver;

/// Type-keyed service instance storage.
pub mod storage;

pub use resolver::{Lifetime, ResolveError, ServiceBinding, ServiceResolver};
pub use storage::{ErasedService, ServiceKey, Services};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::resolver::*;
    pub use crate::storage::*;
}
