//! The per-process scope owning a component tree.
//!
//! An [`EntityManager`] owns three things exclusively:
//!
//! - the root entity and its tree,
//! - the bound arguments (a [`DataModel`]),
//! - a [`ServiceResolver`] scope.
//!
//! Components reach all three through the [`ComponentContext`] handed to
//! their hooks, at the moment they execute.
//!
//! # States
//!
//! ```text
//! Uninitialized ──(root + arguments)──► Bound ──(first resolution)──► Active
//!        │                                │                             │
//!        └────────────────────────────────┴────────── dispose() ────────┴──► Disposed
//! ```
//!
//! Nothing leaves `Disposed`: every operation on a disposed manager fails
//! with [`ManagerError::Disposed`].
//!
//! # Owner applications
//!
//! The application a component acts on is found by walking from the
//! component up to the root. The first of these decides:
//!
//! 1. a control identity naming an application id,
//! 2. an application context naming an application id,
//! 3. an application owner (the component sits inside an application entity).
//!
//! The id is then looked up among the application entities below the root's
//! child tagged [`APPLICATION_POOL_TAG`], then among application entities
//! elsewhere in the tree. Control locators and coordinate providers are
//! looked up the same way.

use core::any::type_name;
use core::fmt;
use core::ops::Deref;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use pixel_services::ServiceResolver;

use crate::arguments::{DataModel, PropertyInfo};
use crate::attach::{attach, resolve_one};
use crate::builtin::APPLICATION_POOL_TAG;
use crate::capability::{Application, ControlIdentity, ControlLocator, CoordinateProvider};
use crate::component::{Component, ComponentContext, ComponentInfo, ManagerId};
use crate::error::{ConfigurationError, LookupError, ManagerError, QueryError};
use crate::query::{ComponentRef, SearchScope};
use crate::services::{ArgumentProcessor, FileSystem, ScriptEngine};
use crate::summary::ComponentSummary;
use crate::traversal::Traversal;
use crate::tree::{ComponentKey, ComponentNode, ComponentTree};

/// Lifecycle state of an [`EntityManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerState {
    /// Root entity or arguments are still missing.
    Uninitialized,
    /// Root entity and arguments are bound.
    Bound,
    /// The manager has serviced traversal or resolution calls.
    Active,
    /// The manager has been disposed.
    Disposed,
}

/// A capability found in the tree, with the component exposing it.
pub struct CapabilityRef<'a, C: ?Sized + 'a> {
    key: ComponentKey,
    component: &'a Arc<dyn Component>,
    capability: &'a C,
}

impl<'a, C: ?Sized + 'a> CapabilityRef<'a, C> {
    /// Returns the key of the component exposing the capability.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Returns the component exposing the capability.
    #[must_use]
    pub fn component(&self) -> &'a Arc<dyn Component> {
        self.component
    }

    /// Returns the capability itself.
    #[must_use]
    pub fn capability(&self) -> &'a C {
        self.capability
    }
}

impl<C: ?Sized> Deref for CapabilityRef<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.capability
    }
}

impl<C: ?Sized> fmt::Debug for CapabilityRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRef")
            .field("key", &self.key)
            .finish()
    }
}

/// Scope bound to one component tree.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pixel_core::prelude::*;
/// use pixel_services::ServiceResolver;
///
/// let mut manager = EntityManager::new(ServiceResolver::new());
/// let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
/// let pool = manager.add_component(root, ApplicationPoolEntity::node()).unwrap();
/// let app: Arc<dyn Application> = Arc::new(ApplicationDetails::new("App1", "Notepad"));
/// let app_entity = manager
///     .add_component(pool, ComponentNode::new(ApplicationEntity::new(Arc::clone(&app))))
///     .unwrap();
/// let step = manager
///     .add_component(app_entity, ComponentNode::new(SequenceEntity::new()))
///     .unwrap();
///
/// let owner = manager.owner_application(step).unwrap();
/// assert!(Arc::ptr_eq(&owner, &app));
/// ```
pub struct EntityManager {
    id: ManagerId,
    tree: Option<ComponentTree>,
    arguments: RwLock<Option<Box<dyn DataModel>>>,
    resolver: Arc<ServiceResolver>,
    file_system: RwLock<Option<Arc<dyn FileSystem>>>,
    active: AtomicBool,
    disposed: bool,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(ServiceResolver::new())
    }
}

impl EntityManager {
    /// Creates a manager owning `resolver`.
    #[must_use]
    pub fn new(resolver: ServiceResolver) -> Self {
        Self::with_scope(Arc::new(resolver))
    }

    fn with_scope(resolver: Arc<ServiceResolver>) -> Self {
        Self {
            id: ManagerId::new(),
            tree: None,
            arguments: RwLock::new(None),
            resolver,
            file_system: RwLock::new(None),
            active: AtomicBool::new(false),
            disposed: false,
        }
    }

    /// Creates a manager for a prefab instance nested in this one.
    ///
    /// The prefab gets a child scope of this manager's resolver, so it shares
    /// singletons but builds its own scoped services, and starts with this
    /// manager's file system.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Disposed`] if this manager was disposed.
    pub fn prefab(&self) -> Result<EntityManager, ManagerError> {
        self.ensure_live()?;
        let prefab = Self::with_scope(Arc::new(self.resolver.child()));
        *prefab.file_system.write() = self.file_system.read().clone();
        tracing::debug!(parent = %self.id, manager = %prefab.id, "prefab scope created");
        Ok(prefab)
    }

    /// Returns the manager's id.
    #[must_use]
    pub fn id(&self) -> &ManagerId {
        &self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        if self.disposed {
            ManagerState::Disposed
        } else if self.tree.is_none() || self.arguments.read().is_none() {
            ManagerState::Uninitialized
        } else if self.active.load(Ordering::Acquire) {
            ManagerState::Active
        } else {
            ManagerState::Bound
        }
    }

    /// Returns the manager's service scope.
    #[must_use]
    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.resolver
    }

    fn ensure_live(&self) -> Result<(), ManagerError> {
        if self.disposed {
            Err(ManagerError::Disposed)
        } else {
            Ok(())
        }
    }

    fn mark_active(&self) {
        self.active.store(true, Ordering::Release);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tree
    // ─────────────────────────────────────────────────────────────────────

    /// Assigns the root entity, restoring parent links of the whole tree.
    ///
    /// Components of a restored tree are neither resolved nor validated
    /// again; they were when first attached.
    ///
    /// # Errors
    ///
    /// Fails if a root is already assigned, the manager was disposed, or the
    /// node is not a well-formed entity tree.
    pub fn set_root_entity(&mut self, root: ComponentNode) -> Result<ComponentKey, ConfigurationError> {
        self.ensure_live()?;
        if self.tree.is_some() {
            return Err(ManagerError::RootAlreadyAssigned.into());
        }
        let mut tree = ComponentTree::new(root)?;
        let key = tree.root();
        tree.restore_parent_child_relation(key, Some(&self.id), false);
        tracing::debug!(manager = %self.id, components = tree.len(), "root entity assigned");
        self.tree = Some(tree);
        Ok(key)
    }

    /// Returns the tree.
    ///
    /// # Errors
    ///
    /// Fails before a root is assigned or after disposal.
    pub fn tree(&self) -> Result<&ComponentTree, ManagerError> {
        self.ensure_live()?;
        self.tree.as_ref().ok_or(ManagerError::NoRootEntity)
    }

    fn tree_mut(&mut self) -> Result<&mut ComponentTree, ManagerError> {
        self.ensure_live()?;
        self.tree.as_mut().ok_or(ManagerError::NoRootEntity)
    }

    /// Returns a query handle on the root entity.
    ///
    /// # Errors
    ///
    /// Same as [`tree`](Self::tree).
    pub fn root_entity(&self) -> Result<ComponentRef<'_>, ManagerError> {
        let tree = self.tree()?;
        ComponentRef::new(tree, tree.root()).map_err(|_| ManagerError::NoRootEntity)
    }

    /// Returns a query handle on `key`.
    ///
    /// # Errors
    ///
    /// Fails without a tree or for a key outside it.
    pub fn component(&self, key: ComponentKey) -> Result<ComponentRef<'_>, LookupError> {
        Ok(ComponentRef::new(self.tree()?, key)?)
    }

    /// Returns the identity record of `key` for editing.
    ///
    /// # Errors
    ///
    /// Same as [`component`](Self::component).
    pub fn info_mut(&mut self, key: ComponentKey) -> Result<&mut ComponentInfo, LookupError> {
        self.tree_mut()?
            .info_mut(key)
            .ok_or(LookupError::Query(QueryError::UnknownComponent(key)))
    }

    /// Returns the hook context for `key`.
    #[must_use]
    pub fn context(&self, key: ComponentKey) -> ComponentContext<'_> {
        ComponentContext::new(self, key)
    }

    /// Appends `node` to the children of `parent`.
    ///
    /// The new component gets the next process order and this manager; then
    /// each component of the added subtree has its dependencies resolved and
    /// is validated, once.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is unknown or not an entity, or if dependency
    /// resolution fails; the subtree is not attached in that case.
    pub fn add_component(
        &mut self,
        parent: ComponentKey,
        node: ComponentNode,
    ) -> Result<ComponentKey, ConfigurationError> {
        self.ensure_live()?;
        let tree = self.tree.as_mut().ok_or(ManagerError::NoRootEntity)?;
        attach(tree, &self.resolver, &self.id, parent, None, node)
    }

    /// Inserts `node` at `index` among the children of `parent`.
    ///
    /// `index` is a position among the siblings in process order. The new
    /// component takes the process order of the sibling it displaces; that
    /// sibling and the ones after it are bumped only as far as needed, so
    /// their relative order is kept. An index past the end appends.
    ///
    /// # Errors
    ///
    /// Same as [`add_component`](Self::add_component).
    pub fn insert_component(
        &mut self,
        parent: ComponentKey,
        index: usize,
        node: ComponentNode,
    ) -> Result<ComponentKey, ConfigurationError> {
        self.ensure_live()?;
        let tree = self.tree.as_mut().ok_or(ManagerError::NoRootEntity)?;
        attach(tree, &self.resolver, &self.id, parent, Some(index), node)
    }

    /// Detaches `key` and its subtree.
    ///
    /// The returned node has no parent and no manager, and keeps its ids.
    ///
    /// # Errors
    ///
    /// Fails for the root entity or an unknown key.
    pub fn remove_component(&mut self, key: ComponentKey) -> Result<ComponentNode, ConfigurationError> {
        let tree = self.tree_mut()?;
        if key == tree.root() {
            return Err(ConfigurationError::CannotRemoveRoot);
        }
        let node = tree
            .detach(key)
            .ok_or(QueryError::UnknownComponent(key))?;
        tracing::debug!(component = %key, removed = node.len(), "component removed");
        Ok(node)
    }

    /// Runs dependency resolution and validation of `key` again.
    ///
    /// # Errors
    ///
    /// Returns the component's configuration error.
    pub fn resolve_dependencies(&mut self, key: ComponentKey) -> Result<(), ConfigurationError> {
        self.ensure_live()?;
        let tree = self.tree.as_mut().ok_or(ManagerError::NoRootEntity)?;
        if !tree.contains(key) {
            return Err(QueryError::UnknownComponent(key).into());
        }
        resolve_one(tree, &self.resolver, &self.id, key)
    }

    /// Sets parent links and the manager on the subtree of `key` from its
    /// forward links, optionally regenerating every id.
    ///
    /// # Errors
    ///
    /// Fails for an unknown key.
    pub fn restore_parent_child_relation(
        &mut self,
        key: ComponentKey,
        reset_id: bool,
    ) -> Result<(), ConfigurationError> {
        self.ensure_live()?;
        let tree = self.tree.as_mut().ok_or(ManagerError::NoRootEntity)?;
        if !tree.contains(key) {
            return Err(QueryError::UnknownComponent(key).into());
        }
        tree.restore_parent_child_relation(key, Some(&self.id), reset_id);
        Ok(())
    }

    /// Resets every component of the tree, pre-order.
    ///
    /// # Errors
    ///
    /// Same as [`tree`](Self::tree).
    pub fn reset_hierarchy(&self) -> Result<(), ManagerError> {
        self.root_entity()?.reset_hierarchy();
        Ok(())
    }

    /// Returns the components to process, starting below the root.
    ///
    /// # Errors
    ///
    /// Same as [`tree`](Self::tree).
    pub fn next_components_to_process(&self) -> Result<Traversal<'_>, ManagerError> {
        let root = self.root_entity()?;
        self.mark_active();
        Ok(root.next_components_to_process())
    }

    /// Captures a serializable snapshot of the tree.
    ///
    /// # Errors
    ///
    /// Same as [`tree`](Self::tree).
    pub fn describe(&self) -> Result<ComponentSummary, ManagerError> {
        Ok(ComponentSummary::capture(self.root_entity()?))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Arguments
    // ─────────────────────────────────────────────────────────────────────

    /// Binds the arguments instance, replacing any previous one.
    pub fn set_arguments<M: DataModel>(&self, arguments: M) {
        if self.disposed {
            return;
        }
        *self.arguments.write() = Some(Box::new(arguments));
    }

    /// Returns `true` if arguments are bound.
    #[must_use]
    pub fn has_arguments(&self) -> bool {
        self.arguments.read().is_some()
    }

    /// Borrows the arguments as `M`.
    ///
    /// # Errors
    ///
    /// Fails if nothing is bound or the bound model is not an `M`.
    pub fn arguments<M: DataModel>(&self) -> Result<MappedRwLockReadGuard<'_, M>, ManagerError> {
        self.ensure_live()?;
        let guard = self.arguments.read();
        if guard.is_none() {
            return Err(ManagerError::NoArguments);
        }
        RwLockReadGuard::try_map(guard, |arguments| {
            arguments.as_deref().and_then(|model| model.downcast_ref::<M>())
        })
        .map_err(|_| ManagerError::ArgumentsType {
            expected: type_name::<M>(),
        })
    }

    /// Mutably borrows the arguments as `M`.
    ///
    /// # Errors
    ///
    /// Same as [`arguments`](Self::arguments).
    pub fn arguments_mut<M: DataModel>(&self) -> Result<MappedRwLockWriteGuard<'_, M>, ManagerError> {
        self.ensure_live()?;
        let guard = self.arguments.write();
        if guard.is_none() {
            return Err(ManagerError::NoArguments);
        }
        RwLockWriteGuard::try_map(guard, |arguments| {
            arguments.as_deref_mut().and_then(|model| model.downcast_mut::<M>())
        })
        .map_err(|_| ManagerError::ArgumentsType {
            expected: type_name::<M>(),
        })
    }

    /// Returns the names of properties of type `T` visible from `scope`.
    ///
    /// Collects, in order and without duplicates:
    ///
    /// 1. properties of the bound arguments,
    /// 2. scoped properties of `scope` and its ancestors (closest first),
    /// 3. variables declared in the script engine, if one is registered.
    ///
    /// # Errors
    ///
    /// Fails for an unknown scope key or a failing script engine factory.
    pub fn properties_of_type<T: 'static>(
        &self,
        scope: Option<ComponentKey>,
    ) -> Result<Vec<String>, LookupError> {
        self.ensure_live()?;
        let mut properties: Vec<PropertyInfo> = self
            .arguments
            .read()
            .as_deref()
            .map(|model| model.properties())
            .unwrap_or_default();

        if let Some(key) = scope {
            let mut current = Some(self.component(key)?);
            while let Some(component) = current {
                if let Some(scoped) = component.component().as_scoped_entity() {
                    properties.extend(scoped.scoped_properties());
                }
                current = component.parent();
            }
        }

        if self.resolver.is_registered::<dyn ScriptEngine>() {
            properties.extend(self.script_engine()?.declared_variables());
        }

        let mut names: Vec<String> = Vec::new();
        for property in properties.into_iter().filter(PropertyInfo::is::<T>) {
            if !names.contains(&property.name) {
                names.push(property.name);
            }
        }
        Ok(names)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves `T` from the manager's scope, by optional binding name.
    ///
    /// # Errors
    ///
    /// Fails when the scope cannot resolve `T`; never returns a silent `None`.
    pub fn service<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<T>, LookupError> {
        self.ensure_live()?;
        self.mark_active();
        Ok(self.resolver.get_keyed::<T>(name)?)
    }

    /// Resolves every provider of `T` visible from the manager's scope.
    ///
    /// # Errors
    ///
    /// Fails when a provider cannot be built.
    pub fn all_services<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, LookupError> {
        self.ensure_live()?;
        self.mark_active();
        Ok(self.resolver.get_all::<T>()?)
    }

    /// Resolves the scope's argument processor.
    ///
    /// # Errors
    ///
    /// Same as [`service`](Self::service).
    pub fn argument_processor(&self) -> Result<Arc<dyn ArgumentProcessor>, LookupError> {
        self.service::<dyn ArgumentProcessor>(None)
    }

    /// Resolves the scope's script engine.
    ///
    /// # Errors
    ///
    /// Same as [`service`](Self::service).
    pub fn script_engine(&self) -> Result<Arc<dyn ScriptEngine>, LookupError> {
        self.service::<dyn ScriptEngine>(None)
    }

    /// Returns the current file system: the one set on the manager, or the
    /// scope's binding.
    ///
    /// # Errors
    ///
    /// Fails when neither is available.
    pub fn file_system(&self) -> Result<Arc<dyn FileSystem>, LookupError> {
        self.ensure_live()?;
        if let Some(file_system) = self.file_system.read().clone() {
            return Ok(file_system);
        }
        self.service::<dyn FileSystem>(None)
    }

    /// Swaps the current file system.
    pub fn set_file_system(&self, file_system: Arc<dyn FileSystem>) {
        if self.disposed {
            return;
        }
        *self.file_system.write() = Some(file_system);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ownership
    // ─────────────────────────────────────────────────────────────────────

    /// Finds the application entity with `application_id` in the pool.
    ///
    /// # Errors
    ///
    /// Fails without a pool or without a matching application entity.
    pub fn application_entity(&self, application_id: &str) -> Result<ComponentKey, LookupError> {
        let root = self.root_entity()?;
        let pool = root
            .components_by_tag(APPLICATION_POOL_TAG, SearchScope::Children)?
            .into_iter()
            .next()
            .ok_or(LookupError::ApplicationPoolMissing)?;

        pool.all_components()
            .into_iter()
            .find(|candidate| {
                candidate
                    .component()
                    .as_application_owner()
                    .is_some_and(|owner| owner.application_id() == application_id)
            })
            .map(|found| found.key())
            .ok_or_else(|| LookupError::ApplicationNotFound(application_id.to_string()))
    }

    /// Finds the application entity for `application_id`: the one in the
    /// pool, or else an application entity anywhere in the tree.
    fn find_application_entity(&self, application_id: &str) -> Result<ComponentKey, LookupError> {
        let err = match self.application_entity(application_id) {
            Err(err @ (LookupError::ApplicationPoolMissing | LookupError::ApplicationNotFound(_))) => err,
            found => return found,
        };
        self.root_entity()?
            .all_components()
            .into_iter()
            .find(|candidate| {
                candidate
                    .component()
                    .as_application_owner()
                    .is_some_and(|owner| owner.application_id() == application_id)
            })
            .map(|found| found.key())
            .ok_or(err)
    }

    /// Finds the application entity that owns `key`.
    ///
    /// # Errors
    ///
    /// Fails if nothing on the way to the root names an application, or no
    /// application entity has the named id.
    pub fn owner_application_entity(&self, key: ComponentKey) -> Result<ComponentKey, LookupError> {
        self.mark_active();
        let mut current = Some(self.component(key)?);
        while let Some(component) = current {
            let behavior = component.component();
            if let Some(identity) = behavior.as_control_identity()
                && !identity.application_id().is_empty()
            {
                return self.find_application_entity(identity.application_id());
            }
            if let Some(context) = behavior.as_application_context()
                && let Some(application_id) = context.target_application_id()
            {
                return self.find_application_entity(application_id);
            }
            if let Some(owner) = behavior.as_application_owner() {
                return match self.application_entity(owner.application_id()) {
                    Err(LookupError::ApplicationPoolMissing | LookupError::ApplicationNotFound(_)) => {
                        Ok(component.key())
                    }
                    found => found,
                };
            }
            current = component.parent();
        }
        Err(LookupError::NoOwnerApplication(key))
    }

    /// Returns the application `key` acts on.
    ///
    /// Repeated calls on an unchanged tree return the same `Arc`.
    ///
    /// # Errors
    ///
    /// Same as [`owner_application_entity`](Self::owner_application_entity).
    pub fn owner_application(&self, key: ComponentKey) -> Result<Arc<dyn Application>, LookupError> {
        let entity = self.owner_application_entity(key)?;
        self.component(entity)?
            .component()
            .as_application_owner()
            .map(|owner| Arc::clone(owner.application()))
            .ok_or(LookupError::NoOwnerApplication(key))
    }

    /// Like [`owner_application`](Self::owner_application), `None` on failure.
    #[must_use]
    pub fn try_owner_application(&self, key: ComponentKey) -> Option<Arc<dyn Application>> {
        self.owner_application(key).ok()
    }

    /// Enabled components of the application entity owning `identity`.
    fn application_components(
        &self,
        identity: &dyn ControlIdentity,
    ) -> Result<Vec<ComponentRef<'_>>, LookupError> {
        self.mark_active();
        let application =
            self.component(self.find_application_entity(identity.application_id())?)?;
        let mut found = Vec::new();
        let mut stack = vec![application];
        while let Some(component) = stack.pop() {
            if !component.info().is_enabled() {
                continue;
            }
            stack.extend(component.children().into_iter().rev());
            found.push(component);
        }
        Ok(found)
    }

    /// Finds the control locator able to handle `identity`.
    ///
    /// # Errors
    ///
    /// Fails if the owning application cannot be found or has no matching
    /// locator.
    pub fn control_locator(
        &self,
        identity: &dyn ControlIdentity,
    ) -> Result<CapabilityRef<'_, dyn ControlLocator>, LookupError> {
        for candidate in self.application_components(identity)? {
            let component = candidate.component();
            if let Some(locator) = component.as_control_locator()
                && locator.can_process_control_of_type(identity)
            {
                return Ok(CapabilityRef {
                    key: candidate.key(),
                    component,
                    capability: locator,
                });
            }
        }
        Err(LookupError::ControlLocatorNotConfigured {
            application_id: identity.application_id().to_string(),
            control_type: identity.control_type().to_string(),
        })
    }

    /// Finds the coordinate provider able to handle `identity`.
    ///
    /// # Errors
    ///
    /// Fails if the owning application cannot be found or has no matching
    /// provider.
    pub fn coordinate_provider(
        &self,
        identity: &dyn ControlIdentity,
    ) -> Result<CapabilityRef<'_, dyn CoordinateProvider>, LookupError> {
        for candidate in self.application_components(identity)? {
            let component = candidate.component();
            if let Some(provider) = component.as_coordinate_provider()
                && provider.can_process_control_of_type(identity)
            {
                return Ok(CapabilityRef {
                    key: candidate.key(),
                    component,
                    capability: provider,
                });
            }
        }
        Err(LookupError::CoordinateProviderNotConfigured {
            application_id: identity.application_id().to_string(),
            control_type: identity.control_type().to_string(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Disposal
    // ─────────────────────────────────────────────────────────────────────

    /// Tears the scope down.
    ///
    /// Disposes every disposable component (pre-order), then the service
    /// scope, then drops the tree, the arguments and the file system.
    /// Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(tree) = self.tree.take() {
            for key in tree.subtree(tree.root()) {
                if let Some(disposable) = tree.component(key).and_then(|c| c.as_disposable()) {
                    disposable.dispose();
                }
            }
        }
        self.resolver.dispose();
        *self.arguments.get_mut() = None;
        *self.file_system.get_mut() = None;
        tracing::debug!(manager = %self.id, "entity manager disposed");
    }
}

impl Drop for EntityManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("components", &self.tree.as_ref().map_or(0, ComponentTree::len))
            .finish()
    }
}
