//! Depth-ordered process traversal.
//!
//! [`Traversal`] is the lazy "next components to process" sequence a host
//! walks to drive a process:
//!
//! ```text
//! Root                      yields
//! ├── Child (entity)        Enter(Child)
//! │   ├── Actor             Leaf(Actor)
//! │   └── Processor         Leaf(Processor)
//! │                         Exit(Child)
//! └── AsyncActor            Leaf(AsyncActor)
//! ```
//!
//! - Disabled components and their subtrees produce nothing.
//! - Nested entities are yielded twice, bracketing their children.
//! - Actors, async actors and entity processors are atomic leaves.
//! - Siblings follow process order.
//! - Components with none of these capabilities are skipped.
//!
//! The traversal borrows the tree immutably, so the tree cannot change while
//! it runs, and every call starts from scratch.

use core::fmt;

use crate::tree::{ComponentKey, ComponentTree};

/// How a [`Step`] relates to the component it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// An entity is about to have its children processed.
    Enter,
    /// All children of an entity have been yielded.
    Exit,
    /// An actor, async actor or entity processor to execute.
    Leaf,
}

/// One item of the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    /// The component to process.
    pub key: ComponentKey,
    /// What to do with it.
    pub kind: StepKind,
}

impl Step {
    /// An [`StepKind::Enter`] step.
    #[must_use]
    pub fn enter(key: ComponentKey) -> Self {
        Self {
            key,
            kind: StepKind::Enter,
        }
    }

    /// An [`StepKind::Exit`] step.
    #[must_use]
    pub fn exit(key: ComponentKey) -> Self {
        Self {
            key,
            kind: StepKind::Exit,
        }
    }

    /// A [`StepKind::Leaf`] step.
    #[must_use]
    pub fn leaf(key: ComponentKey) -> Self {
        Self {
            key,
            kind: StepKind::Leaf,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StepKind::Enter => write!(f, "enter {}", self.key),
            StepKind::Exit => write!(f, "exit {}", self.key),
            StepKind::Leaf => write!(f, "process {}", self.key),
        }
    }
}

enum Frame {
    Visit(ComponentKey),
    Exit(ComponentKey),
}

/// Lazy pre/post-order walk below a start component.
///
/// The start component itself is never yielded.
pub struct Traversal<'a> {
    tree: &'a ComponentTree,
    stack: Vec<Frame>,
}

impl<'a> Traversal<'a> {
    /// Starts a traversal of the children of `start`.
    ///
    /// Yields nothing if `start` is unknown or disabled.
    #[must_use]
    pub fn new(tree: &'a ComponentTree, start: ComponentKey) -> Self {
        let stack = match tree.info(start) {
            Some(info) if info.is_enabled() => tree
                .ordered_children(start)
                .into_iter()
                .rev()
                .map(Frame::Visit)
                .collect(),
            _ => Vec::new(),
        };
        Self { tree, stack }
    }
}

impl Iterator for Traversal<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        while let Some(frame) = self.stack.pop() {
            let key = match frame {
                Frame::Exit(key) => return Some(Step::exit(key)),
                Frame::Visit(key) => key,
            };
            let Some(node) = self.tree.get(key) else {
                continue;
            };
            if !node.info().is_enabled() {
                continue;
            }
            let component = node.component();
            if component.as_actor().is_some()
                || component.as_async_actor().is_some()
                || component.as_entity_processor().is_some()
            {
                return Some(Step::leaf(key));
            }
            if component.is_entity() {
                self.stack.push(Frame::Exit(key));
                self.stack.extend(
                    self.tree
                        .ordered_children(key)
                        .into_iter()
                        .rev()
                        .map(Frame::Visit),
                );
                return Some(Step::enter(key));
            }
        }
        None
    }
}

impl fmt::Debug for Traversal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("pending", &self.stack.len())
            .finish()
    }
}
