//! # Pixel Internal Library
//!
//! Re-exports the core Pixel crates for convenience.

/// Layer 1: Hierarchical service scopes.
pub use pixel_services;

/// Layer 2: Component tree, queries and traversal.
pub use pixel_core;

/// Layer 3: Process runner.
pub use pixel_runtime;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use pixel_core::prelude::*;
    pub use pixel_runtime::prelude::*;
    pub use pixel_services::{Lifetime, ResolveError, ServiceBinding, ServiceResolver};
}
