//! Attach-time context for dependency resolution.
//!
//! When a subtree is added to a managed tree, every component in it gets one
//! call to [`Component::resolve_dependencies`] followed by one call to
//! [`Component::validate`]. The context handed to `resolve_dependencies`
//! can inspect the tree and insert helper components, which are attached the
//! same way before the call returns.

use std::sync::Arc;

use pixel_services::{ResolveError, ServiceResolver};

use crate::component::ManagerId;
use crate::error::{ConfigurationError, QueryError};
use crate::query::ComponentRef;
use crate::tree::{ComponentKey, ComponentNode, ComponentTree};

/// Mutable view of a tree while a component is being attached.
pub struct AttachContext<'a> {
    tree: &'a mut ComponentTree,
    resolver: &'a Arc<ServiceResolver>,
    manager: &'a ManagerId,
    key: ComponentKey,
}

impl<'a> AttachContext<'a> {
    /// Returns the key of the component being attached.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Returns a query handle positioned on the component being attached.
    ///
    /// # Errors
    ///
    /// Fails only if the component was removed during resolution.
    pub fn component(&self) -> Result<ComponentRef<'_>, QueryError> {
        ComponentRef::new(self.tree, self.key)
    }

    /// Returns the parent of the component being attached.
    #[must_use]
    pub fn parent(&self) -> Option<ComponentKey> {
        self.tree.parent(self.key)
    }

    /// Returns the tree being edited.
    #[must_use]
    pub fn tree(&self) -> &ComponentTree {
        self.tree
    }

    /// Resolves a service from the manager's scope.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolver.get::<T>()
    }

    /// Attaches `node` under `parent`, resolving and validating it in turn.
    ///
    /// # Errors
    ///
    /// Same as [`EntityManager::add_component`](crate::EntityManager::add_component).
    pub fn add_component(
        &mut self,
        parent: ComponentKey,
        node: ComponentNode,
    ) -> Result<ComponentKey, ConfigurationError> {
        attach(self.tree, self.resolver, self.manager, parent, None, node)
    }
}

/// Imports `node` under `parent` and runs its attach lifecycle.
///
/// On failure the imported subtree is removed again and the process orders
/// of its would-be siblings are put back, so the tree is left as it was.
pub(crate) fn attach(
    tree: &mut ComponentTree,
    resolver: &Arc<ServiceResolver>,
    manager: &ManagerId,
    parent: ComponentKey,
    index: Option<usize>,
    node: ComponentNode,
) -> Result<ComponentKey, ConfigurationError> {
    let parent_component = tree
        .component(parent)
        .ok_or(ConfigurationError::UnknownParent(parent))?;
    if !parent_component.is_entity() {
        let name = tree
            .info(parent)
            .map(|info| info.name().to_string())
            .unwrap_or_default();
        return Err(ConfigurationError::NotAnEntity { name });
    }
    node.check_shape()?;

    let sibling_orders = tree.child_orders(parent);
    let key = tree.import(node);
    if let Err(err) = tree.link(parent, key, index) {
        tree.detach(key);
        return Err(err);
    }
    tree.restore_parent_child_relation(key, Some(manager), false);

    for current in tree.subtree(key) {
        if let Err(err) = resolve_one(tree, resolver, manager, current) {
            tracing::debug!(
                component = %current,
                error = %err,
                "dependency resolution failed, detaching"
            );
            tree.detach(key);
            tree.restore_orders(&sibling_orders);
            return Err(err);
        }
    }

    tracing::debug!(
        component = %key,
        parent = %parent,
        "component attached"
    );
    Ok(key)
}

pub(crate) fn resolve_one(
    tree: &mut ComponentTree,
    resolver: &Arc<ServiceResolver>,
    manager: &ManagerId,
    key: ComponentKey,
) -> Result<(), ConfigurationError> {
    let Some(component) = tree.component(key).cloned() else {
        return Ok(());
    };
    let mut ctx = AttachContext {
        tree: &mut *tree,
        resolver,
        manager,
        key,
    };
    component.resolve_dependencies(&mut ctx)?;

    let is_valid = ComponentRef::new(tree, key).is_ok_and(|view| component.validate(view));
    if let Some(info) = tree.info_mut(key) {
        info.is_valid = is_valid;
    }
    if !is_valid {
        tracing::debug!(component = %key, "component failed validation");
    }
    Ok(())
}
