//! Optional component capabilities.
//!
//! A component opts into a capability by implementing the trait and
//! returning `Some(self)` from the matching `as_*` accessor on
//! [`Component`](crate::Component). Traversal and ownership resolution only
//! ever ask for capabilities, never for concrete types.

use core::fmt;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use serde::{Deserialize, Serialize};

use crate::arguments::PropertyInfo;
use crate::component::{BoxFuture, ComponentContext};
use crate::error::{ActorError, LocatorError};

// ─────────────────────────────────────────────────────────────────────────────
// Processing
// ─────────────────────────────────────────────────────────────────────────────

/// A component that iterates over its children.
pub trait Loop: Send + Sync {
    /// Returns the zero-based index of the current iteration.
    fn iteration(&self) -> usize;
}

/// Runs the children of an entity processor.
///
/// Implemented by hosts; handed to [`EntityProcessor::process_entity`].
pub trait SubtreeExecutor: Send + Sync {
    /// Processes every child of the component in `ctx` once, in process order.
    fn execute_children<'a>(
        &'a self,
        ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>>;
}

/// A component that drives the execution of its own children.
///
/// The traversal yields it as a leaf and never expands it.
pub trait EntityProcessor: Send + Sync {
    /// Processes the component's children through `executor`.
    fn process_entity<'a>(
        &'a self,
        ctx: ComponentContext<'a>,
        executor: &'a dyn SubtreeExecutor,
    ) -> BoxFuture<'a, Result<(), ActorError>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Applications
// ─────────────────────────────────────────────────────────────────────────────

/// Details of an application under automation.
pub trait Application: DowncastSync {
    /// Returns the application's id.
    fn application_id(&self) -> &str;

    /// Returns the display name.
    fn application_name(&self) -> &str;
}

impl_downcast!(sync Application);

impl fmt::Debug for dyn Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.application_id())
            .field("name", &self.application_name())
            .finish()
    }
}

/// An entity owning an application; its descendants act on that application.
pub trait ApplicationOwner: Send + Sync {
    /// Returns the owned application.
    fn application(&self) -> &Arc<dyn Application>;

    /// Returns the id of the owned application.
    fn application_id(&self) -> &str {
        self.application().application_id()
    }
}

/// A component naming the application its descendants act on.
pub trait ApplicationContext: Send + Sync {
    /// Returns the targeted application id, if one is configured.
    fn target_application_id(&self) -> Option<&str>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Controls
// ─────────────────────────────────────────────────────────────────────────────

/// Describes a UI control to look up.
pub trait ControlIdentity: Send + Sync {
    /// Returns the id of the application the control belongs to.
    fn application_id(&self) -> &str;

    /// Returns the technology-specific control type, e.g. `"Button"`.
    fn control_type(&self) -> &str;

    /// Returns the control's display name.
    fn name(&self) -> &str;
}

/// Screen rectangle of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> (i32, i32) {
        let half_width = i32::try_from(self.width / 2).unwrap_or(i32::MAX);
        let half_height = i32::try_from(self.height / 2).unwrap_or(i32::MAX);
        (
            self.x.saturating_add(half_width),
            self.y.saturating_add(half_height),
        )
    }
}

/// A control found by a [`ControlLocator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiControl {
    /// Technology-specific control type.
    pub control_type: String,
    /// Display name.
    pub name: String,
    /// Screen geometry, if known.
    pub bounding_box: Option<BoundingBox>,
}

/// Finds UI controls of an application.
pub trait ControlLocator: Send + Sync {
    /// Returns `true` if this locator handles controls like `identity`.
    fn can_process_control_of_type(&self, identity: &dyn ControlIdentity) -> bool;

    /// Locates the control described by `identity`.
    fn find_control<'a>(
        &'a self,
        identity: &'a dyn ControlIdentity,
    ) -> BoxFuture<'a, Result<UiControl, LocatorError>>;
}

/// Computes screen geometry of UI controls.
pub trait CoordinateProvider: Send + Sync {
    /// Returns `true` if this provider handles controls like `identity`.
    fn can_process_control_of_type(&self, identity: &dyn ControlIdentity) -> bool;

    /// Returns the screen rectangle of `control`.
    ///
    /// # Errors
    ///
    /// Fails if the geometry cannot be determined.
    fn bounding_box(&self, control: &UiControl) -> Result<BoundingBox, LocatorError> {
        control
            .bounding_box
            .ok_or_else(|| LocatorError::NoBoundingBox(control.name.clone()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoping and cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// An entity exposing extra properties to its descendants, e.g. a loop's
/// current item.
pub trait ScopedEntity: Send + Sync {
    /// Returns the properties visible inside this entity.
    fn scoped_properties(&self) -> Vec<PropertyInfo>;
}

/// A component owning resources released when its manager is disposed.
pub trait Disposable: Send + Sync {
    /// Releases the resources. Must not fail.
    fn dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_center() {
        assert_eq!(BoundingBox::new(10, 20, 100, 40).center(), (60, 40));
    }
}
