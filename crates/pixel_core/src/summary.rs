//! Serializable snapshots of a component tree.

use serde::{Deserialize, Serialize};

use crate::query::ComponentRef;

/// Identity and structure of a component subtree, for tooling and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSummary {
    /// Stable component id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Tag, omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Rust type implementing the component.
    pub type_name: String,
    /// Enable flag.
    pub is_enabled: bool,
    /// Position among siblings.
    pub process_order: i32,
    /// Result of the last validation.
    pub is_valid: bool,
    /// Children in process order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentSummary>,
}

impl ComponentSummary {
    /// Captures `component` and its subtree.
    #[must_use]
    pub fn capture(component: ComponentRef<'_>) -> Self {
        let info = component.info();
        Self {
            id: info.id().to_string(),
            name: info.name().to_string(),
            tag: info.tag().to_string(),
            type_name: component.component().type_name().to_string(),
            is_enabled: info.is_enabled(),
            process_order: info.process_order(),
            is_valid: info.is_valid(),
            children: component
                .children()
                .into_iter()
                .map(ComponentSummary::capture)
                .collect(),
        }
    }

    /// Returns the number of components in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ComponentSummary::len).sum::<usize>()
    }

    /// Always `false`: a snapshot contains at least one component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
