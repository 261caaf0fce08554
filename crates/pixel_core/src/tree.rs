//! Arena storage for component trees.
//!
//! Components live in a [`ComponentTree`] keyed by [`ComponentKey`]. Each
//! [`Node`] owns its list of child keys (the "down" direction) and records
//! its parent key (the "up" direction). Parent keys are plain indices into
//! the arena and never keep anything alive.
//!
//! Trees arrive either as a nested [`ComponentNode`], the shape a serializer
//! produces with forward links only, or one component at a time through the
//! owning [`EntityManager`](crate::EntityManager).

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::component::{Component, ComponentId, ComponentInfo, ManagerId};
use crate::error::ConfigurationError;

/// Handle of a component inside a [`ComponentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(usize);

impl ComponentKey {
    /// Returns the raw arena index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component_{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentNode
// ─────────────────────────────────────────────────────────────────────────────

/// A detached component subtree.
///
/// This is the shape components have before they are attached to a tree, and
/// after they are removed from one: identity, behavior and owned children,
/// but no parent and no manager.
///
/// # Example
///
/// ```
/// use pixel_core::{ComponentNode, Entity};
///
/// let node = ComponentNode::new(Entity)
///     .named("Checkout")
///     .tagged("Flow")
///     .with_child(ComponentNode::new(Entity).named("Payment").disabled());
///
/// assert_eq!(node.children().len(), 1);
/// assert!(!node.children()[0].info().is_enabled());
/// ```
///
/// A node is the only owner of its component instance. Copies are made with
/// [`duplicate`](Self::duplicate), never by sharing the instance.
#[derive(Debug)]
pub struct ComponentNode {
    info: ComponentInfo,
    component: Arc<dyn Component>,
    children: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Creates a node for `component`, named after its type.
    #[must_use]
    pub fn new(component: impl Component) -> Self {
        Self::from_arc(Arc::new(component))
    }

    fn from_arc(component: Arc<dyn Component>) -> Self {
        let name = short_type_name(component.type_name()).to_string();
        Self {
            info: ComponentInfo::new(name),
            component,
            children: Vec::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    /// Sets the tag.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.info.tag = tag.into();
        self
    }

    /// Disables the component and its subtree.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.info.is_enabled = false;
        self
    }

    /// Sets an explicit process order.
    #[must_use]
    pub fn with_process_order(mut self, order: i32) -> Self {
        self.info.process_order = order;
        self
    }

    /// Reuses a stored identifier instead of the generated one.
    #[must_use]
    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.info.id = id;
        self
    }

    /// Marks faults of this component as swallowed by the host.
    #[must_use]
    pub fn continue_on_error(mut self) -> Self {
        self.info.continue_on_error = true;
        self
    }

    /// Appends a child.
    ///
    /// The child keeps its process order; siblings with equal order run in
    /// insertion order.
    #[must_use]
    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child.
    pub fn push_child(&mut self, child: ComponentNode) {
        self.children.push(child);
    }

    /// Returns the identity record.
    #[must_use]
    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    /// Returns the identity record for editing.
    pub fn info_mut(&mut self) -> &mut ComponentInfo {
        &mut self.info
    }

    /// Returns the component behavior.
    #[must_use]
    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Returns the owned children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ComponentNode] {
        &self.children
    }

    /// Returns the number of components in this subtree, itself included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ComponentNode::len).sum::<usize>()
    }

    /// Always `false`: a node contains at least itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Copies the subtree with new component instances and fresh ids.
    ///
    /// Names, tags, enabled flags, process orders and `continue_on_error`
    /// are kept. The copy has no manager.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NotDuplicable`] if a component of the
    /// subtree does not implement [`Component::duplicate`].
    pub fn duplicate(&self) -> Result<ComponentNode, ConfigurationError> {
        let component = self
            .component
            .duplicate()
            .ok_or_else(|| ConfigurationError::NotDuplicable {
                name: self.info.name.clone(),
            })?;
        let mut info = self.info.clone();
        info.id = ComponentId::new();
        info.entity_manager = None;
        info.is_valid = true;
        let children = self
            .children
            .iter()
            .map(ComponentNode::duplicate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ComponentNode {
            info,
            component,
            children,
        })
    }

    /// Checks that only entities own children.
    pub(crate) fn check_shape(&self) -> Result<(), ConfigurationError> {
        if !self.children.is_empty() && !self.component.is_entity() {
            return Err(ConfigurationError::NotAnEntity {
                name: self.info.name.clone(),
            });
        }
        self.children.iter().try_for_each(ComponentNode::check_shape)
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// A component stored in a [`ComponentTree`].
#[derive(Debug)]
pub struct Node {
    info: ComponentInfo,
    component: Arc<dyn Component>,
    parent: Option<ComponentKey>,
    children: Vec<ComponentKey>,
}

impl Node {
    /// Returns the identity record.
    #[must_use]
    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    /// Returns the component behavior.
    #[must_use]
    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Returns the parent key; `None` for the root or before relations are restored.
    #[must_use]
    pub fn parent(&self) -> Option<ComponentKey> {
        self.parent
    }

    /// Returns the child keys in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ComponentKey] {
        &self.children
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentTree
// ─────────────────────────────────────────────────────────────────────────────

/// Arena holding every component of one process.
///
/// The tree always has a root entity. Children are only ever appended or
/// inserted under an existing entity, so cycles cannot be built.
#[derive(Debug)]
pub struct ComponentTree {
    nodes: HashMap<ComponentKey, Node>,
    root: ComponentKey,
    next_key: usize,
}

impl ComponentTree {
    /// Builds a tree from a detached root entity.
    ///
    /// Only forward links are imported; call
    /// [`restore_parent_child_relation`](Self::restore_parent_child_relation)
    /// on the root to fill in parent links.
    ///
    /// # Errors
    ///
    /// Fails if the root, or any component owning children, is not an entity.
    pub fn new(root: ComponentNode) -> Result<Self, ConfigurationError> {
        if !root.component.is_entity() {
            return Err(ConfigurationError::NotAnEntity {
                name: root.info.name.clone(),
            });
        }
        root.check_shape()?;
        let mut tree = Self {
            nodes: HashMap::new(),
            root: ComponentKey(0),
            next_key: 0,
        };
        tree.root = tree.import(root);
        Ok(tree)
    }

    /// Returns the root entity's key.
    #[must_use]
    pub fn root(&self) -> ComponentKey {
        self.root
    }

    /// Returns the node stored under `key`.
    #[must_use]
    pub fn get(&self, key: ComponentKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    /// Returns `true` if `key` belongs to this tree.
    #[must_use]
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Returns the number of components in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the tree contains at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the identity record of `key`.
    #[must_use]
    pub fn info(&self, key: ComponentKey) -> Option<&ComponentInfo> {
        self.nodes.get(&key).map(|node| &node.info)
    }

    /// Returns the identity record of `key` for editing.
    pub fn info_mut(&mut self, key: ComponentKey) -> Option<&mut ComponentInfo> {
        self.nodes.get_mut(&key).map(|node| &mut node.info)
    }

    /// Returns the component behavior stored under `key`.
    #[must_use]
    pub fn component(&self, key: ComponentKey) -> Option<&Arc<dyn Component>> {
        self.nodes.get(&key).map(|node| &node.component)
    }

    /// Returns the parent of `key`.
    #[must_use]
    pub fn parent(&self, key: ComponentKey) -> Option<ComponentKey> {
        self.nodes.get(&key).and_then(|node| node.parent)
    }

    /// Returns the children of `key` in insertion order.
    #[must_use]
    pub fn children(&self, key: ComponentKey) -> &[ComponentKey] {
        self.nodes.get(&key).map_or(&[], |node| &node.children)
    }

    /// Returns the children of `key` in process order.
    ///
    /// Sorted by `process_order` ascending; the sort is stable, so ties keep
    /// insertion order.
    #[must_use]
    pub fn ordered_children(&self, key: ComponentKey) -> Vec<ComponentKey> {
        let mut children = self.children(key).to_vec();
        children.sort_by_key(|child| {
            self.nodes
                .get(child)
                .map_or(i32::MAX, |node| node.info.process_order)
        });
        children
    }

    /// Returns `key` and all its descendants, pre-order in process order.
    #[must_use]
    pub fn subtree(&self, key: ComponentKey) -> Vec<ComponentKey> {
        let mut keys = Vec::new();
        if !self.contains(key) {
            return keys;
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            keys.push(current);
            stack.extend(self.ordered_children(current).into_iter().rev());
        }
        keys
    }

    /// Iterates over every key in the tree, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.nodes.keys().copied()
    }

    /// Stores a detached subtree, returning the key of its top component.
    ///
    /// Only forward (child) links are recorded. Parent links and manager ids
    /// are left empty until relations are restored.
    pub(crate) fn import(&mut self, node: ComponentNode) -> ComponentKey {
        let key = ComponentKey(self.next_key);
        self.next_key += 1;
        let ComponentNode {
            info,
            component,
            children,
        } = node;
        let children = children
            .into_iter()
            .map(|child| self.import(child))
            .collect();
        self.nodes.insert(
            key,
            Node {
                info,
                component,
                parent: None,
                children,
            },
        );
        key
    }

    /// Links an imported component under `parent`.
    ///
    /// With `index == None`, or an index past the last sibling, the child is
    /// appended and gets the next process order after its siblings. With an
    /// index it takes the place of the sibling at that position in process
    /// order: it gets that sibling's order, and the siblings from there on are
    /// bumped just enough to stay strictly after it. Their relative order is
    /// kept.
    pub(crate) fn link(
        &mut self,
        parent: ComponentKey,
        child: ComponentKey,
        index: Option<usize>,
    ) -> Result<(), ConfigurationError> {
        if !self.contains(parent) {
            return Err(ConfigurationError::UnknownParent(parent));
        }
        let ordered = self.ordered_children(parent);
        let order_of = |tree: &Self, key: ComponentKey| {
            tree.info(key).map_or(0, ComponentInfo::process_order)
        };

        match index.filter(|index| *index < ordered.len()) {
            Some(index) => {
                let displaced = ordered[index];
                let mut floor = order_of(self, displaced);
                if let Some(node) = self.nodes.get_mut(&parent) {
                    let position = node
                        .children
                        .iter()
                        .position(|sibling| *sibling == displaced)
                        .unwrap_or(node.children.len());
                    node.children.insert(position, child);
                }
                if let Some(info) = self.info_mut(child) {
                    info.process_order = floor;
                }
                for sibling in &ordered[index..] {
                    if let Some(info) = self.info_mut(*sibling) {
                        if info.process_order <= floor {
                            info.process_order = floor.saturating_add(1);
                        }
                        floor = info.process_order;
                    }
                }
            }
            None => {
                let next_order = ordered
                    .last()
                    .map_or(0, |last| order_of(self, *last).saturating_add(1));
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.push(child);
                }
                if let Some(info) = self.info_mut(child) {
                    info.process_order = next_order;
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Returns the process orders of the children of `key`.
    pub(crate) fn child_orders(&self, key: ComponentKey) -> Vec<(ComponentKey, i32)> {
        self.children(key)
            .iter()
            .filter_map(|child| self.info(*child).map(|info| (*child, info.process_order)))
            .collect()
    }

    /// Puts back process orders taken with [`child_orders`](Self::child_orders).
    pub(crate) fn restore_orders(&mut self, orders: &[(ComponentKey, i32)]) {
        for (key, order) in orders {
            if let Some(info) = self.info_mut(*key) {
                info.process_order = *order;
            }
        }
    }

    /// Removes `key` and its subtree, returning them detached.
    ///
    /// The detached nodes keep their ids but lose their manager.
    pub(crate) fn detach(&mut self, key: ComponentKey) -> Option<ComponentNode> {
        let parent = self.parent(key);
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|child| *child != key);
        }
        self.take_subtree(key)
    }

    fn take_subtree(&mut self, key: ComponentKey) -> Option<ComponentNode> {
        let Node {
            mut info,
            component,
            children,
            ..
        } = self.nodes.remove(&key)?;
        info.entity_manager = None;
        let children = children
            .into_iter()
            .filter_map(|child| self.take_subtree(child))
            .collect();
        Some(ComponentNode {
            info,
            component,
            children,
        })
    }

    /// Walks the subtree of `key` and sets every child's parent link from
    /// the forward links, and every component's manager to `manager`.
    ///
    /// With `reset_id`, every component of the subtree (`key` included) gets
    /// a freshly generated id.
    pub fn restore_parent_child_relation(
        &mut self,
        key: ComponentKey,
        manager: Option<&ManagerId>,
        reset_id: bool,
    ) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            node.info.entity_manager = manager.cloned();
            if reset_id {
                node.info.id = ComponentId::new();
            }
            let children = node.children.clone();
            for child in &children {
                if let Some(child_node) = self.nodes.get_mut(child) {
                    child_node.parent = Some(current);
                }
            }
            stack.extend(children);
        }
    }
}
