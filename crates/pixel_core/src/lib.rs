//! Entity-component process model for Pixel (Layer 2).
//!
//! `pixel_core` provides the typed component tree an automation process is
//! built from, and the [`EntityManager`] scope that owns it.
//!
//! # Core Concepts
//!
//! - [`Component`] - Atomic node of a process with lifecycle hooks
//! - [`Actor`] / [`AsyncActor`] - Leaf components performing one action
//! - [`ComponentTree`] - Arena holding the components of one process
//! - [`ComponentRef`] - Hierarchical queries from any node of the tree
//! - [`Traversal`] - The "next components to process" sequence
//! - [`EntityManager`] - Scope owning the tree, the arguments and a service resolver
//!
//! # Example
//!
//! ```
//! use pixel_core::prelude::*;
//! use pixel_services::ServiceResolver;
//!
//! let mut manager = EntityManager::new(ServiceResolver::new());
//! let root = manager
//!     .set_root_entity(ComponentNode::new(Entity).named("Process"))
//!     .unwrap();
//! manager.set_arguments(());
//!
//! let sequence = manager
//!     .add_component(root, ComponentNode::new(SequenceEntity::new()).named("Login"))
//!     .unwrap();
//!
//! let steps: Vec<Step> = manager.next_components_to_process().unwrap().collect();
//! assert_eq!(steps, [Step::enter(sequence), Step::exit(sequence)]);
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of the Pixel architecture:
//!
//! - **Layer 1** (`pixel_services`): Hierarchical service scopes
//! - **Layer 2** (`pixel_core`): Component tree, queries and traversal (this crate)
//! - **Layer 3** (`pixel_runtime`): Process runner driving the traversal

/// Argument descriptors and bound data models.
pub mod arguments;

/// Attach-time context for dependency resolution.
pub mod attach;

/// Leaf components and their execution bookkeeping.
pub mod actor;

/// Built-in entities.
pub mod builtin;

/// Optional component capabilities.
pub mod capability;

/// The component trait and identity types.
pub mod component;

/// Error types.
pub mod error;

/// The per-process scope owning a component tree.
pub mod manager;

/// Hierarchical queries over the component tree.
pub mod query;

/// Collaborator service traits consumed by components.
pub mod services;

/// Serializable snapshots of a component tree.
pub mod summary;

/// Depth-ordered process traversal.
pub mod traversal;

/// Arena storage for component trees.
pub mod tree;

pub use actor::{Actor, ActorStatus, AsyncActor, execute_actor};
pub use arguments::{Argument, ArgumentMode, DataModel, PropertyInfo};
pub use attach::AttachContext;
pub use builtin::{
    APPLICATION_POOL_TAG, ApplicationDetails, ApplicationEntity, ApplicationPoolEntity, Entity,
    RepeatEntity, SequenceEntity,
};
pub use capability::{
    Application, ApplicationContext, ApplicationOwner, BoundingBox, ControlIdentity,
    ControlLocator, CoordinateProvider, Disposable, EntityProcessor, Loop, ScopedEntity,
    SubtreeExecutor, UiControl,
};
pub use component::{
    BoxFuture, Component, ComponentAttribute, ComponentContext, ComponentId, ComponentInfo,
    ManagerId,
};
pub use error::{
    ActorError, ConfigurationError, LocatorError, LookupError, ManagerError, QueryError,
};
pub use manager::{CapabilityRef, EntityManager, ManagerState};
pub use query::{ComponentRef, Located, SearchScope};
pub use services::{ArgumentProcessor, FileSystem, ScriptEngine, ScriptError};
pub use summary::ComponentSummary;
pub use traversal::{Step, StepKind, Traversal};
pub use tree::{ComponentKey, ComponentNode, ComponentTree, Node};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::actor::{Actor, ActorStatus, AsyncActor, execute_actor};
    pub use crate::arguments::{Argument, ArgumentMode, DataModel, PropertyInfo};
    pub use crate::attach::AttachContext;
    pub use crate::builtin::{
        APPLICATION_POOL_TAG, ApplicationDetails, ApplicationEntity, ApplicationPoolEntity,
        Entity, RepeatEntity, SequenceEntity,
    };
    pub use crate::capability::{
        Application, ApplicationContext, ApplicationOwner, BoundingBox,
        ControlIdentity, ControlLocator, CoordinateProvider, Disposable, EntityProcessor, Loop,
        ScopedEntity, SubtreeExecutor, UiControl,
    };
    pub use crate::component::{
        BoxFuture, Component, ComponentAttribute, ComponentContext, ComponentId, ComponentInfo,
        ManagerId,
    };
    pub use crate::error::{
        ActorError, ConfigurationError, LocatorError, LookupError, ManagerError, QueryError,
    };
    pub use crate::manager::{CapabilityRef, EntityManager, ManagerState};
    pub use crate::query::{ComponentRef, Located, SearchScope};
    pub use crate::services::{ArgumentProcessor, FileSystem, ScriptEngine, ScriptError};
    pub use crate::summary::ComponentSummary;
    pub use crate::traversal::{Step, StepKind, Traversal};
    pub use crate::tree::{ComponentKey, ComponentNode, ComponentTree, Node};
}
