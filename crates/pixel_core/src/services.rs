//! Collaborator service traits consumed by components.
//!
//! Implementations live outside this crate and are registered on the
//! manager's [`ServiceResolver`](pixel_services::ServiceResolver), usually
//! as scoped bindings so every process gets its own instance.

use std::path::{Path, PathBuf};

use crate::arguments::{Argument, PropertyInfo};
use crate::component::BoxFuture;

/// Errors raised by a script engine or argument processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The script did not compile.
    #[error("script failed to compile: {0}")]
    Compilation(String),

    /// The script raised an error.
    #[error("script failed: {0}")]
    Execution(String),

    /// A data-bound argument names an unknown property.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// The argument has no way to produce a value.
    #[error("argument is not configured")]
    NotConfigured,
}

/// Evaluates scripts and holds script globals of one scope.
pub trait ScriptEngine: Send + Sync {
    /// Evaluates `script` and returns its value.
    fn execute_script<'a>(
        &'a self,
        script: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, ScriptError>>;

    /// Sets a script global.
    fn set_variable(&self, name: &str, value: serde_json::Value);

    /// Reads a script global.
    fn get_variable(&self, name: &str) -> Option<serde_json::Value>;

    /// Returns the globals declared in this engine.
    fn declared_variables(&self) -> Vec<PropertyInfo>;
}

/// Reads and writes [`Argument`] values.
pub trait ArgumentProcessor: Send + Sync {
    /// Produces the value of `argument`.
    fn get_value<'a>(
        &'a self,
        argument: &'a Argument,
    ) -> BoxFuture<'a, Result<serde_json::Value, ScriptError>>;

    /// Stores `value` into the target of `argument`.
    fn set_value<'a>(
        &'a self,
        argument: &'a Argument,
        value: serde_json::Value,
    ) -> BoxFuture<'a, Result<(), ScriptError>>;
}

/// File system view of the current project.
pub trait FileSystem: Send + Sync {
    /// Returns the project's working directory.
    fn working_directory(&self) -> &Path;

    /// Resolves `relative` against the working directory.
    fn resolve_path(&self, relative: &str) -> PathBuf {
        self.working_directory().join(relative)
    }
}
