//! Error types for the component model.
//!
//! Each concern has its own error enum so callers can match on what went
//! wrong without parsing messages:
//!
//! - [`QueryError`] - hierarchical queries
//! - [`ConfigurationError`] - attaching, resolving and restoring components
//! - [`ManagerError`] - state of the owning [`EntityManager`](crate::EntityManager)
//! - [`LookupError`] - service and ownership resolution
//! - [`LocatorError`] - control lookup by locator components
//! - [`ActorError`] - failures raised while processing a component

use pixel_services::ResolveError;

use crate::query::SearchScope;
use crate::services::ScriptError;
use crate::tree::ComponentKey;

/// Errors raised by hierarchical queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The query does not support the requested search scope.
    #[error("{operation} does not support the {scope} search scope")]
    UnsupportedScope {
        /// Name of the query operation.
        operation: &'static str,
        /// The rejected scope.
        scope: SearchScope,
    },

    /// A required component was not found.
    #[error("no component of type {type_name} found from {origin}")]
    MissingComponent {
        /// Type the query was looking for.
        type_name: &'static str,
        /// Component the query started from.
        origin: ComponentKey,
    },

    /// The key does not belong to the tree.
    #[error("unknown component: {0}")]
    UnknownComponent(ComponentKey),
}

/// Errors raised while attaching, resolving or restoring components.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    /// Children were added to a component that is not an entity.
    #[error("component '{name}' is not an entity and cannot own children")]
    NotAnEntity {
        /// Name of the offending component.
        name: String,
    },

    /// The parent key does not belong to the tree.
    #[error("unknown parent component: {0}")]
    UnknownParent(ComponentKey),

    /// A component of a subtree being duplicated cannot be copied.
    #[error("component '{name}' cannot be duplicated")]
    NotDuplicable {
        /// Name of the offending component.
        name: String,
    },

    /// The root entity cannot be detached.
    #[error("the root entity cannot be removed")]
    CannotRemoveRoot,

    /// A required argument is not configured.
    #[error("component '{component}' requires argument '{argument}'")]
    MissingArgument {
        /// Name of the component.
        component: String,
        /// Name of the missing argument.
        argument: String,
    },

    /// A query issued during dependency resolution failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A service required during dependency resolution is unavailable.
    #[error(transparent)]
    Service(#[from] ResolveError),

    /// The manager cannot be edited in its current state.
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// Any other configuration problem reported by a component.
    #[error("{0}")]
    Other(String),
}

/// Errors raised by an [`EntityManager`](crate::EntityManager) in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    /// The manager has been disposed.
    #[error("entity manager has been disposed")]
    Disposed,

    /// No root entity has been assigned yet.
    #[error("no root entity has been assigned")]
    NoRootEntity,

    /// A root entity is already assigned.
    #[error("a root entity is already assigned")]
    RootAlreadyAssigned,

    /// No arguments instance has been bound.
    #[error("no arguments have been bound")]
    NoArguments,

    /// The bound arguments are of a different type.
    #[error("arguments are not of type {expected}")]
    ArgumentsType {
        /// The requested type.
        expected: &'static str,
    },
}

/// Errors raised while resolving services, owner applications and locators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    /// No application context or application entity encloses the component.
    #[error("component {0} is not owned by any application")]
    NoOwnerApplication(ComponentKey),

    /// The root entity has no child tagged as the application pool.
    #[error("the root entity has no application pool")]
    ApplicationPoolMissing,

    /// No application entity with the requested id exists.
    #[error("no application with id '{0}'")]
    ApplicationNotFound(String),

    /// The owning application has no locator for the control.
    #[error("no control locator configured for {control_type} controls of application '{application_id}'")]
    ControlLocatorNotConfigured {
        /// Application the control belongs to.
        application_id: String,
        /// Control type of the identity.
        control_type: String,
    },

    /// The owning application has no coordinate provider for the control.
    #[error("no coordinate provider configured for {control_type} controls of application '{application_id}'")]
    CoordinateProviderNotConfigured {
        /// Application the control belongs to.
        application_id: String,
        /// Control type of the identity.
        control_type: String,
    },

    /// Service resolution failed.
    #[error(transparent)]
    Service(#[from] ResolveError),

    /// A query failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The manager is not in a state to answer.
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

/// Errors raised by control locators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocatorError {
    /// No control matched the identity.
    #[error("control '{0}' could not be located")]
    ControlNotFound(String),

    /// The locator cannot compute the requested geometry.
    #[error("no bounding box available for control '{0}'")]
    NoBoundingBox(String),

    /// Any other locator failure.
    #[error("{0}")]
    Other(String),
}

/// Errors raised while processing a component.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActorError {
    /// The action failed.
    #[error("{0}")]
    Failed(String),

    /// The component was executed but is neither an actor nor an async actor.
    #[error("component {0} is not an actor")]
    NotAnActor(ComponentKey),

    /// A component inside a subtree driven by an entity processor faulted.
    #[error("child component {component} faulted: {source}")]
    ChildFaulted {
        /// The faulting descendant.
        component: ComponentKey,
        /// The descendant's error.
        source: Box<ActorError>,
    },

    /// A required service is unavailable.
    #[error(transparent)]
    Service(#[from] ResolveError),

    /// Owner or locator resolution failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A query failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The component is misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A control could not be located.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// A script failed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The bound arguments are unavailable.
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl ActorError {
    /// Creates a [`ActorError::Failed`] from any message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        ActorError::Failed(message.into())
    }
}
