//! The component trait and identity types.
//!
//! A component is split in two halves:
//!
//! - its **behavior**, a `dyn Component` trait object shared behind an `Arc`,
//! - its **identity**, a [`ComponentInfo`] record kept by the owning tree
//!   (id, name, tag, enable flag, process order, owning manager).
//!
//! Lifecycle hooks take `&self`. Execution-time state such as the faulted
//! flag of an actor lives behind interior mutability, so a host can run hooks
//! while the tree stays borrowed for queries.
//!
//! Capabilities (actor, loop, entity processor, application context, ...)
//! are discovered through the `as_*` accessors rather than by concrete type.

use core::any::TypeId;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};

use crate::actor::{Actor, ActorStatus, AsyncActor};
use crate::attach::AttachContext;
use crate::capability::{
    ApplicationContext, ApplicationOwner, ControlIdentity, ControlLocator, CoordinateProvider,
    Disposable, EntityProcessor, Loop, ScopedEntity,
};
use crate::error::{ActorError, ConfigurationError, LookupError};
use crate::manager::EntityManager;
use crate::query::ComponentRef;
use crate::tree::ComponentKey;

/// A boxed future that is `Send` and has a lifetime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier of a component.
///
/// Generated once when the component is built and kept across detach and
/// re-attach. Only [`restore_parent_child_relation`] with `reset_id` assigns
/// a new one, for cloned subtrees.
///
/// [`restore_parent_child_relation`]: crate::EntityManager::restore_parent_child_relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentId(Arc<str>);

impl ComponentId {
    /// Generates a new unique component ID.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Wraps an existing identifier, as read back from storage.
    #[must_use]
    pub fn from_string(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an [`EntityManager`] scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagerId(Arc<str>);

impl ManagerId {
    /// Generates a new unique manager ID.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ManagerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentInfo
// ─────────────────────────────────────────────────────────────────────────────

/// Identity and configuration of a component, owned by the tree.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) tag: String,
    pub(crate) is_enabled: bool,
    pub(crate) process_order: i32,
    pub(crate) continue_on_error: bool,
    pub(crate) entity_manager: Option<ManagerId>,
    pub(crate) is_valid: bool,
}

impl ComponentInfo {
    pub(crate) fn new(name: String) -> Self {
        Self {
            id: ComponentId::new(),
            name,
            tag: String::new(),
            is_enabled: true,
            process_order: 0,
            continue_on_error: false,
            entity_manager: None,
            is_valid: true,
        }
    }

    /// Returns the component's stable ID.
    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tag, empty if none.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns `false` if the component and its subtree are skipped.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// Returns the position among siblings; lower runs first.
    #[must_use]
    pub fn process_order(&self) -> i32 {
        self.process_order
    }

    /// Returns `true` if a fault of this component is swallowed by the host.
    #[must_use]
    pub fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }

    /// Returns the manager the component is attached to, `None` when detached.
    #[must_use]
    pub fn entity_manager(&self) -> Option<&ManagerId> {
        self.entity_manager.as_ref()
    }

    /// Returns the result of the last validation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Renames the component.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replaces the tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Enables or disables the component and its subtree.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }

    /// Overrides the process order.
    pub fn set_process_order(&mut self, order: i32) {
        self.process_order = order;
    }

    /// Sets whether faults of this component are swallowed.
    pub fn set_continue_on_error(&mut self, continue_on_error: bool) {
        self.continue_on_error = continue_on_error;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentAttribute
// ─────────────────────────────────────────────────────────────────────────────

/// Marker type a component can declare through [`Component::has_attribute`].
///
/// Queried by [`ComponentRef::components_with_attribute`].
pub trait ComponentAttribute: 'static {}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentContext
// ─────────────────────────────────────────────────────────────────────────────

/// Handle passed to lifecycle hooks: the owning manager plus the component's key.
#[derive(Clone, Copy)]
pub struct ComponentContext<'a> {
    manager: &'a EntityManager,
    key: ComponentKey,
}

impl<'a> ComponentContext<'a> {
    /// Creates a context for the component at `key`.
    #[must_use]
    pub fn new(manager: &'a EntityManager, key: ComponentKey) -> Self {
        Self { manager, key }
    }

    /// Returns the key of the component being processed.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Returns the owning manager.
    #[must_use]
    pub fn manager(&self) -> &'a EntityManager {
        self.manager
    }

    /// Returns a context for another component of the same tree.
    #[must_use]
    pub fn with_key(&self, key: ComponentKey) -> Self {
        Self {
            manager: self.manager,
            key,
        }
    }

    /// Returns a query handle positioned on this component.
    ///
    /// # Errors
    ///
    /// Fails if the manager has no tree or the component was removed.
    pub fn component(&self) -> Result<ComponentRef<'a>, LookupError> {
        self.manager.component(self.key)
    }

    /// Returns this component's identity record.
    ///
    /// # Errors
    ///
    /// Same as [`component`](Self::component).
    pub fn info(&self) -> Result<&'a ComponentInfo, LookupError> {
        Ok(self.component()?.info())
    }

    /// Resolves the default provider of `T` from the manager's scope.
    ///
    /// # Errors
    ///
    /// Fails when `T` cannot be resolved or the manager was disposed.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, LookupError> {
        self.manager.service::<T>(None)
    }
}

impl fmt::Debug for ComponentContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("manager", self.manager.id())
            .field("key", &self.key)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// The atomic unit of an automation process.
///
/// Every method has a default, so a plain entity is just:
///
/// ```
/// use pixel_core::Component;
///
/// struct Group;
///
/// impl Component for Group {
///     fn is_entity(&self) -> bool {
///         true
///     }
/// }
/// ```
///
/// Hooks act on the component itself only; fanning out to children is the
/// job of the host driving the traversal.
pub trait Component: DowncastSync {
    /// Returns the component's type name for diagnostics.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Returns `true` for composite components that own children.
    fn is_entity(&self) -> bool {
        false
    }

    /// Runs before the component (or, for entities, its children) is processed.
    fn before_process<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs after the component (or, for entities, all its children) completed.
    fn on_completion<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs when `faulting` (this component or one of its descendants) faulted.
    fn on_fault<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
        _faulting: ComponentKey,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async { Ok(()) })
    }

    /// Returns whether the configuration is structurally sound.
    fn validate(&self, _component: ComponentRef<'_>) -> bool {
        true
    }

    /// Reverts execution-time state so the component can run again.
    ///
    /// Must not touch configuration and must not fail.
    fn reset(&self) {
        if let Some(status) = self.status() {
            status.reset();
        }
    }

    /// Called once when the component is attached to a parent.
    ///
    /// May insert helper components through `ctx`. Implementations must be
    /// idempotent: check for an existing helper before adding one.
    fn resolve_dependencies(&self, _ctx: &mut AttachContext<'_>) -> Result<(), ConfigurationError> {
        Ok(())
    }

    /// Returns a new instance with the same configuration and fresh
    /// execution state, or `None` if the component cannot be copied.
    ///
    /// Used by [`ComponentNode::duplicate`](crate::ComponentNode::duplicate).
    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        None
    }

    /// Returns `true` if the component carries the attribute `attribute`.
    fn has_attribute(&self, _attribute: TypeId) -> bool {
        false
    }

    /// Returns the execution status of actors.
    fn status(&self) -> Option<&ActorStatus> {
        None
    }

    /// Returns the synchronous actor capability.
    fn as_actor(&self) -> Option<&dyn Actor> {
        None
    }

    /// Returns the asynchronous actor capability.
    fn as_async_actor(&self) -> Option<&dyn AsyncActor> {
        None
    }

    /// Returns the capability of driving its own children.
    fn as_entity_processor(&self) -> Option<&dyn EntityProcessor> {
        None
    }

    /// Returns the loop capability.
    fn as_loop(&self) -> Option<&dyn Loop> {
        None
    }

    /// Returns the capability of owning an application.
    fn as_application_owner(&self) -> Option<&dyn ApplicationOwner> {
        None
    }

    /// Returns the capability of targeting an application by id.
    fn as_application_context(&self) -> Option<&dyn ApplicationContext> {
        None
    }

    /// Returns the control identity capability.
    fn as_control_identity(&self) -> Option<&dyn ControlIdentity> {
        None
    }

    /// Returns the control locator capability.
    fn as_control_locator(&self) -> Option<&dyn ControlLocator> {
        None
    }

    /// Returns the coordinate provider capability.
    fn as_coordinate_provider(&self) -> Option<&dyn CoordinateProvider> {
        None
    }

    /// Returns the capability of exposing scoped properties to descendants.
    fn as_scoped_entity(&self) -> Option<&dyn ScopedEntity> {
        None
    }

    /// Returns the capability of releasing resources on disposal.
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }
}

impl_downcast!(sync Component);

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type_name", &self.type_name())
            .field("is_entity", &self.is_entity())
            .finish()
    }
}
