//! Argument descriptors and bound data models.
//!
//! The arguments of a process are a plain data model bound to its
//! [`EntityManager`](crate::EntityManager). The model describes its own
//! properties through [`DataModel::properties`], which decides what
//! data-bound [`Argument`]s and scripts can refer to.

use core::any::TypeId;

use downcast_rs::{DowncastSync, impl_downcast};
use serde::{Deserialize, Serialize};

/// A named, typed property of a data model or script scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    /// Property name.
    pub name: String,
    /// Type of the property value.
    pub type_id: TypeId,
    /// Type name for diagnostics.
    pub type_name: &'static str,
}

impl PropertyInfo {
    /// Describes a property `name` of type `T`.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns `true` if the property holds a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// The arguments instance bound to a process.
///
/// # Example
///
/// ```
/// use pixel_core::{DataModel, PropertyInfo};
///
/// struct LoginArguments {
///     user: String,
///     attempts: u32,
/// }
///
/// impl DataModel for LoginArguments {
///     fn properties(&self) -> Vec<PropertyInfo> {
///         vec![
///             PropertyInfo::of::<String>("user"),
///             PropertyInfo::of::<u32>("attempts"),
///         ]
///     }
/// }
/// ```
pub trait DataModel: DowncastSync {
    /// Returns the properties of the model.
    fn properties(&self) -> Vec<PropertyInfo>;
}

impl_downcast!(sync DataModel);

impl DataModel for () {
    fn properties(&self) -> Vec<PropertyInfo> {
        Vec::new()
    }
}

/// How an [`Argument`] obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentMode {
    /// A literal default value.
    #[default]
    Default,
    /// A property path into the bound data model.
    DataBound,
    /// A script evaluated by the script engine.
    Scripted,
}

/// Input or output of a component, resolved through the argument processor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Argument {
    /// How the value is obtained.
    pub mode: ArgumentMode,
    /// Property path for data-bound arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
    /// Script for scripted arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Literal value for default arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Whether a component cannot work without this argument.
    #[serde(default)]
    pub is_required: bool,
}

impl Argument {
    /// An argument with a literal value.
    #[must_use]
    pub fn with_default(value: impl Into<serde_json::Value>) -> Self {
        Self {
            default_value: Some(value.into()),
            ..Self::default()
        }
    }

    /// An argument bound to a data-model property.
    #[must_use]
    pub fn data_bound(property_path: impl Into<String>) -> Self {
        Self {
            mode: ArgumentMode::DataBound,
            property_path: Some(property_path.into()),
            ..Self::default()
        }
    }

    /// An argument computed by a script.
    #[must_use]
    pub fn scripted(script: impl Into<String>) -> Self {
        Self {
            mode: ArgumentMode::Scripted,
            script: Some(script.into()),
            ..Self::default()
        }
    }

    /// Marks the argument as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Returns `true` if the argument can produce a value, or doesn't need to.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let non_empty = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        match self.mode {
            ArgumentMode::Default => !self.is_required || self.default_value.is_some(),
            ArgumentMode::DataBound => non_empty(&self.property_path),
            ArgumentMode::Scripted => non_empty(&self.script),
        }
    }
}
