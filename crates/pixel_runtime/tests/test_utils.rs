//! Shared test utilities for `pixel_runtime` integration tests.
//!
//! Components here record what the runner does to them in a shared [`Log`].
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use core::time::Duration;
use std::sync::Arc;

use parking_lot::Mutex;
use pixel_core::prelude::*;
use pixel_services::ServiceResolver;

// ═══════════════════════════════════════════════════════════════════════════════
// LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered record of hook calls and actions.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Entity recording its enter/exit/fault hooks.
pub struct Recorder {
    pub label: &'static str,
    pub log: Log,
}

impl Recorder {
    pub fn node(label: &'static str, log: &Log) -> ComponentNode {
        ComponentNode::new(Self {
            label,
            log: log.clone(),
        })
        .named(label)
    }
}

impl Component for Recorder {
    fn is_entity(&self) -> bool {
        true
    }

    fn before_process<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            self.log.push(format!("enter {}", self.label));
            Ok(())
        })
    }

    fn on_completion<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            self.log.push(format!("exit {}", self.label));
            Ok(())
        })
    }

    fn on_fault<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
        _faulting: ComponentKey,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            self.log.push(format!("fault {}", self.label));
            Ok(())
        })
    }
}

/// Entity whose `before_process` fails.
pub struct BrokenEntry {
    pub log: Log,
}

impl Component for BrokenEntry {
    fn is_entity(&self) -> bool {
        true
    }

    fn before_process<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async { Err(ActorError::failed("entry refused")) })
    }

    fn on_fault<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
        _faulting: ComponentKey,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            self.log.push("fault entry");
            Ok(())
        })
    }
}

/// Synchronous actor logging `act {label}`; fails when `fails` is set.
pub struct Action {
    pub label: &'static str,
    pub log: Log,
    pub fails: bool,
    pub status: ActorStatus,
}

impl Action {
    pub fn node(label: &'static str, log: &Log) -> ComponentNode {
        ComponentNode::new(Self {
            label,
            log: log.clone(),
            fails: false,
            status: ActorStatus::new(),
        })
        .named(label)
    }

    pub fn failing(label: &'static str, log: &Log) -> ComponentNode {
        ComponentNode::new(Self {
            label,
            log: log.clone(),
            fails: true,
            status: ActorStatus::new(),
        })
        .named(label)
    }
}

impl Component for Action {
    fn on_fault<'a>(
        &'a self,
        _ctx: ComponentContext<'a>,
        _faulting: ComponentKey,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            self.log.push(format!("fault {}", self.label));
            Ok(())
        })
    }

    fn status(&self) -> Option<&ActorStatus> {
        Some(&self.status)
    }

    fn as_actor(&self) -> Option<&dyn Actor> {
        Some(self)
    }
}

impl Actor for Action {
    fn act(&self, _ctx: ComponentContext<'_>) -> Result<(), ActorError> {
        self.log.push(format!("act {}", self.label));
        if self.fails {
            return Err(ActorError::failed(format!("{} failed", self.label)));
        }
        Ok(())
    }
}

/// Actor logging its resets.
pub struct Resettable {
    pub log: Log,
    pub status: ActorStatus,
}

impl Component for Resettable {
    fn reset(&self) {
        self.log.push("reset");
        self.status.reset();
    }

    fn status(&self) -> Option<&ActorStatus> {
        Some(&self.status)
    }

    fn as_actor(&self) -> Option<&dyn Actor> {
        Some(self)
    }
}

impl Actor for Resettable {
    fn act(&self, _ctx: ComponentContext<'_>) -> Result<(), ActorError> {
        self.log.push("act");
        Ok(())
    }
}

/// Async actor sleeping for `delay`.
pub struct Sleeper {
    pub delay: Duration,
    pub status: ActorStatus,
}

impl Sleeper {
    pub fn node(delay: Duration) -> ComponentNode {
        ComponentNode::new(Self {
            delay,
            status: ActorStatus::new(),
        })
        .named("Sleep")
    }
}

impl Component for Sleeper {
    fn status(&self) -> Option<&ActorStatus> {
        Some(&self.status)
    }

    fn as_async_actor(&self) -> Option<&dyn AsyncActor> {
        Some(self)
    }
}

impl AsyncActor for Sleeper {
    fn act_async<'a>(&'a self, _ctx: ComponentContext<'a>) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
    }
}

/// Async actor writing `value` into the script global `run`, yielding, and
/// checking that nobody else overwrote it.
pub struct ScriptGlobalCheck {
    pub value: String,
    pub status: ActorStatus,
}

impl ScriptGlobalCheck {
    pub fn node(value: impl Into<String>) -> ComponentNode {
        ComponentNode::new(Self {
            value: value.into(),
            status: ActorStatus::new(),
        })
    }
}

impl Component for ScriptGlobalCheck {
    fn status(&self) -> Option<&ActorStatus> {
        Some(&self.status)
    }

    fn as_async_actor(&self) -> Option<&dyn AsyncActor> {
        Some(self)
    }
}

impl AsyncActor for ScriptGlobalCheck {
    fn act_async<'a>(&'a self, ctx: ComponentContext<'a>) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            let engine = ctx.manager().script_engine()?;
            let expected = serde_json::Value::String(self.value.clone());
            engine.set_variable("run", expected.clone());
            tokio::time::sleep(Duration::from_millis(5)).await;
            match engine.get_variable("run") {
                Some(seen) if seen == expected => Ok(()),
                other => Err(ActorError::failed(format!(
                    "script global overwritten: {other:?}"
                ))),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICES
// ═══════════════════════════════════════════════════════════════════════════════

/// Script engine keeping its globals in memory.
#[derive(Default)]
pub struct MemoryScriptEngine {
    variables: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptEngine for MemoryScriptEngine {
    fn execute_script<'a>(
        &'a self,
        script: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, ScriptError>> {
        Box::pin(async move {
            self.get_variable(script)
                .ok_or_else(|| ScriptError::Execution(format!("unknown variable {script}")))
        })
    }

    fn set_variable(&self, name: &str, value: serde_json::Value) {
        let mut variables = self.variables.lock();
        variables.retain(|(existing, _)| existing != name);
        variables.push((name.to_string(), value));
    }

    fn get_variable(&self, name: &str) -> Option<serde_json::Value> {
        self.variables
            .lock()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.clone())
    }

    fn declared_variables(&self) -> Vec<PropertyInfo> {
        Vec::new()
    }
}

/// A project-level manager whose prefabs each get their own script engine.
pub fn project_manager() -> EntityManager {
    let resolver = ServiceResolver::new();
    resolver.register_scoped::<dyn ScriptEngine>(|_| {
        let engine: Arc<dyn ScriptEngine> = Arc::new(MemoryScriptEngine::default());
        Ok(engine)
    });
    EntityManager::new(resolver)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns a manager with an empty root entity.
pub fn manager() -> (EntityManager, ComponentKey) {
    let mut manager = EntityManager::default();
    let root = manager
        .set_root_entity(ComponentNode::new(Entity).named("Root"))
        .unwrap();
    manager.set_arguments(());
    (manager, root)
}

/// Returns the status of the actor at `key`.
pub fn status(manager: &EntityManager, key: ComponentKey) -> &ActorStatus {
    manager
        .tree()
        .unwrap()
        .component(key)
        .and_then(|component| component.status())
        .unwrap()
}
