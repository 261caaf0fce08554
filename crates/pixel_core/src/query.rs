//! Hierarchical queries over the component tree.
//!
//! [`ComponentRef`] is a cheap `Copy` handle pairing a tree with one of its
//! keys. All queries start from that component and look at a
//! [`SearchScope`] relative to it.
//!
//! | Query | Supported scopes |
//! |-------|------------------|
//! | [`components_of_type`](ComponentRef::components_of_type) | all |
//! | [`first_component_of_type`](ComponentRef::first_component_of_type) | all |
//! | [`components_by_tag`](ComponentRef::components_by_tag) | `Children`, `Descendants` |
//! | [`components_by_name`](ComponentRef::components_by_name) | `Children`, `Descendants` |
//! | [`component_by_id`](ComponentRef::component_by_id) | `Children`, `Descendants` |
//! | [`components_with_attribute`](ComponentRef::components_with_attribute) | `Children`, `Descendants` |
//!
//! Plural queries return an empty `Vec` when nothing matches; only the
//! explicitly single-result lookups report a missing component.

use core::any::TypeId;
use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentAttribute, ComponentId, ComponentInfo};
use crate::error::QueryError;
use crate::traversal::Traversal;
use crate::tree::{ComponentKey, ComponentTree};

/// Where a query looks, relative to the component it starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchScope {
    /// Direct children, in process order.
    Children,
    /// All descendants, pre-order in process order.
    Descendants,
    /// Parent chain, closest first.
    Ancestor,
    /// Other children of the parent, in process order.
    Sibling,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchScope::Children => "children",
            SearchScope::Descendants => "descendants",
            SearchScope::Ancestor => "ancestor",
            SearchScope::Sibling => "sibling",
        };
        f.write_str(name)
    }
}

/// A typed query result: the component's key and its concrete behavior.
pub struct Located<'a, T: ?Sized> {
    /// Key of the matching component.
    pub key: ComponentKey,
    /// The matching component, downcast to `T`.
    pub component: &'a T,
}

impl<T: ?Sized> Clone for Located<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Located<'_, T> {}

impl<T: ?Sized> Deref for Located<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.component
    }
}

impl<T: ?Sized> fmt::Debug for Located<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Located").field("key", &self.key).finish()
    }
}

/// A component positioned in its tree.
///
/// # Example
///
/// ```
/// use pixel_core::{ComponentNode, ComponentTree, Entity, SearchScope};
///
/// let tree = ComponentTree::new(
///     ComponentNode::new(Entity)
///         .with_child(ComponentNode::new(Entity).tagged("Login"))
///         .with_child(ComponentNode::new(Entity).tagged("Logout")),
/// )
/// .unwrap();
///
/// let root = pixel_core::ComponentRef::new(&tree, tree.root()).unwrap();
/// let login = root.components_by_tag("Login", SearchScope::Children).unwrap();
/// assert_eq!(login.len(), 1);
/// assert!(root.components_by_tag("Login", SearchScope::Ancestor).is_err());
/// ```
#[derive(Clone, Copy)]
pub struct ComponentRef<'a> {
    tree: &'a ComponentTree,
    key: ComponentKey,
    info: &'a ComponentInfo,
    component: &'a Arc<dyn Component>,
}

impl<'a> ComponentRef<'a> {
    /// Positions a handle on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownComponent`] if `key` is not in `tree`.
    pub fn new(tree: &'a ComponentTree, key: ComponentKey) -> Result<Self, QueryError> {
        let node = tree.get(key).ok_or(QueryError::UnknownComponent(key))?;
        Ok(Self {
            tree,
            key,
            info: node.info(),
            component: node.component(),
        })
    }

    /// Keys handed out by the tree itself always resolve.
    fn at(&self, key: ComponentKey) -> Option<Self> {
        Self::new(self.tree, key).ok()
    }

    /// Returns the component's key.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Returns the tree this handle points into.
    #[must_use]
    pub fn tree(&self) -> &'a ComponentTree {
        self.tree
    }

    /// Returns the identity record.
    #[must_use]
    pub fn info(&self) -> &'a ComponentInfo {
        self.info
    }

    /// Returns the component behavior.
    #[must_use]
    pub fn component(&self) -> &'a Arc<dyn Component> {
        self.component
    }

    /// Returns `true` if the component is an entity.
    #[must_use]
    pub fn is_entity(&self) -> bool {
        self.component.is_entity()
    }

    /// Returns the parent, `None` for the root or a component whose relations
    /// have not been restored.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tree.parent(self.key).and_then(|parent| self.at(parent))
    }

    /// Returns the direct children in process order.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.refs(self.tree.ordered_children(self.key))
    }

    /// Downcasts the component to its concrete type.
    #[must_use]
    pub fn downcast<T: Component>(&self) -> Option<&'a T> {
        self.component.downcast_ref::<T>()
    }

    fn refs(&self, keys: Vec<ComponentKey>) -> Vec<Self> {
        keys.into_iter().filter_map(|key| self.at(key)).collect()
    }

    fn in_scope(&self, scope: SearchScope) -> Vec<Self> {
        match scope {
            SearchScope::Children => self.children(),
            SearchScope::Descendants => self.refs(self.tree.subtree(self.key)).split_off(1),
            SearchScope::Ancestor => {
                let mut ancestors = Vec::new();
                let mut current = self.parent();
                while let Some(ancestor) = current {
                    current = ancestor.parent();
                    ancestors.push(ancestor);
                }
                ancestors
            }
            SearchScope::Sibling => match self.parent() {
                Some(parent) => parent
                    .children()
                    .into_iter()
                    .filter(|sibling| sibling.key != self.key)
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    fn in_restricted_scope(
        &self,
        operation: &'static str,
        scope: SearchScope,
    ) -> Result<Vec<Self>, QueryError> {
        match scope {
            SearchScope::Children | SearchScope::Descendants => Ok(self.in_scope(scope)),
            SearchScope::Ancestor | SearchScope::Sibling => {
                Err(QueryError::UnsupportedScope { operation, scope })
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Returns this component and every descendant, pre-order.
    #[must_use]
    pub fn all_components(&self) -> Vec<Self> {
        self.refs(self.tree.subtree(self.key))
    }

    /// Returns every component of type `T` within `scope`.
    #[must_use]
    pub fn components_of_type<T: Component>(&self, scope: SearchScope) -> Vec<Located<'a, T>> {
        self.in_scope(scope)
            .into_iter()
            .filter_map(|candidate| {
                candidate.downcast::<T>().map(|component| Located {
                    key: candidate.key,
                    component,
                })
            })
            .collect()
    }

    /// Returns the first component of type `T` within `scope`.
    ///
    /// # Errors
    ///
    /// With `throw_if_missing`, returns [`QueryError::MissingComponent`] when
    /// there is no match. Otherwise a missing match is `Ok(None)`.
    pub fn first_component_of_type<T: Component>(
        &self,
        scope: SearchScope,
        throw_if_missing: bool,
    ) -> Result<Option<Located<'a, T>>, QueryError> {
        let found = self.components_of_type::<T>(scope).into_iter().next();
        if found.is_none() && throw_if_missing {
            return Err(QueryError::MissingComponent {
                type_name: core::any::type_name::<T>(),
                origin: self.key,
            });
        }
        Ok(found)
    }

    /// Returns the components whose tag equals `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedScope`] for `Ancestor` and `Sibling`.
    pub fn components_by_tag(
        &self,
        tag: &str,
        scope: SearchScope,
    ) -> Result<Vec<Self>, QueryError> {
        Ok(self
            .in_restricted_scope("components_by_tag", scope)?
            .into_iter()
            .filter(|candidate| candidate.info.tag() == tag)
            .collect())
    }

    /// Returns the components whose name equals `name`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedScope`] for `Ancestor` and `Sibling`.
    pub fn components_by_name(
        &self,
        name: &str,
        scope: SearchScope,
    ) -> Result<Vec<Self>, QueryError> {
        Ok(self
            .in_restricted_scope("components_by_name", scope)?
            .into_iter()
            .filter(|candidate| candidate.info.name() == name)
            .collect())
    }

    /// Returns the component with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedScope`] for `Ancestor` and `Sibling`.
    pub fn component_by_id(
        &self,
        id: &ComponentId,
        scope: SearchScope,
    ) -> Result<Option<Self>, QueryError> {
        Ok(self
            .in_restricted_scope("component_by_id", scope)?
            .into_iter()
            .find(|candidate| candidate.info.id() == id))
    }

    /// Returns the components carrying the attribute `A`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedScope`] for `Ancestor` and `Sibling`.
    pub fn components_with_attribute<A: ComponentAttribute>(
        &self,
        scope: SearchScope,
    ) -> Result<Vec<Self>, QueryError> {
        let attribute = TypeId::of::<A>();
        Ok(self
            .in_restricted_scope("components_with_attribute", scope)?
            .into_iter()
            .filter(|candidate| candidate.component.has_attribute(attribute))
            .collect())
    }

    /// Returns the loops directly nested in this subtree.
    ///
    /// The search descends through plain entities and stops at each loop it
    /// finds, so loops nested inside another loop are not returned.
    #[must_use]
    pub fn inner_loops(&self) -> Vec<Self> {
        let mut loops = Vec::new();
        let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
        while let Some(candidate) = stack.pop() {
            if candidate.component.as_loop().is_some() {
                loops.push(candidate);
            } else if candidate.is_entity() {
                stack.extend(candidate.children().into_iter().rev());
            }
        }
        loops
    }

    /// Returns the closest ancestor of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingComponent`] if the root is reached first.
    pub fn ancestor_of_type<T: Component>(&self) -> Result<Located<'a, T>, QueryError> {
        self.components_of_type::<T>(SearchScope::Ancestor)
            .into_iter()
            .next()
            .ok_or(QueryError::MissingComponent {
                type_name: core::any::type_name::<T>(),
                origin: self.key,
            })
    }

    /// Returns the topmost entity above this component.
    #[must_use]
    pub fn root_entity(&self) -> Self {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Resets this component, then every descendant, pre-order.
    pub fn reset_hierarchy(&self) {
        for component in self.all_components() {
            component.component.reset();
        }
    }

    /// Returns the components to process below this one.
    #[must_use]
    pub fn next_components_to_process(&self) -> Traversal<'a> {
        Traversal::new(self.tree, self.key)
    }
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("key", &self.key)
            .field("name", &self.info.name())
            .finish()
    }
}
