//! Process execution engine.
//!
//! The [`ProcessRunner`] drives the traversal of an [`EntityManager`]'s tree:
//!
//! | Step | Runner action |
//! |------|---------------|
//! | `Enter` | `before_process` of the entity |
//! | `Leaf` (actor) | [`execute_actor`] |
//! | `Leaf` (entity processor) | `process_entity`, with the runner as [`SubtreeExecutor`] |
//! | `Exit` | `on_completion` of the entity |
//!
//! # Faults
//!
//! When a step fails, the [`FaultPolicy`](crate::FaultPolicy) decides. A swallowed fault is
//! logged and the traversal moves on to the next step. Otherwise
//! `on_fault` is called on the failed component and then on every entity
//! still open around it, innermost first, and the run ends with
//! [`RunError::Faulted`]. Errors raised by `on_fault` itself are logged and
//! do not replace the original fault.
//!
//! # Example
//!
//! ```
//! use pixel_core::prelude::*;
//! use pixel_runtime::ProcessRunner;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut manager = EntityManager::default();
//! let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
//! manager.add_component(root, ComponentNode::new(SequenceEntity::new())).unwrap();
//! manager.set_arguments(());
//!
//! let summary = ProcessRunner::new().run(&manager).await.unwrap();
//! assert_eq!(summary.steps, 2);
//! # });
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use pixel_core::{
    ActorError, BoxFuture, Component, ComponentContext, ComponentKey, ComponentRef,
    EntityManager, StepKind, SubtreeExecutor, Traversal, execute_actor,
};
use tracing::Instrument;

use crate::config::RunnerConfig;
use crate::error::RunError;
use crate::events::{ProcessEvent, ProcessObservers};

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps processed, including those run by entity processors.
    pub steps: usize,
    /// Actors executed, successfully or not.
    pub actors_executed: usize,
    /// Faults swallowed by the fault policy.
    pub faults_swallowed: usize,
    /// Total duration.
    pub duration: Duration,
}

/// Runs the component tree of an [`EntityManager`].
///
/// A runner holds no per-run state and can drive any number of managers,
/// concurrently.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
    observers: ProcessObservers,
}

impl ProcessRunner {
    /// Creates a runner with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner with `config`.
    #[must_use]
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            observers: ProcessObservers::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the observer registry.
    #[must_use]
    pub fn observers(&self) -> &ProcessObservers {
        &self.observers
    }

    /// Runs every component below the root entity.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Manager`] if the manager has no tree or was
    /// disposed, [`RunError::UnknownComponent`] for a start outside the tree,
    /// [`RunError::Faulted`] on an unswallowed fault, and
    /// [`RunError::StepLimitExceeded`] past the configured step cap.
    pub async fn run(&self, manager: &EntityManager) -> Result<RunSummary, RunError> {
        let root = manager.root_entity()?.key();
        self.run_from(manager, root).await
    }

    /// Runs every component below `start`.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_from(
        &self,
        manager: &EntityManager,
        start: ComponentKey,
    ) -> Result<RunSummary, RunError> {
        let span = tracing::info_span!("process", manager = %manager.id(), start = %start);
        self.run_inner(manager, start).instrument(span).await
    }

    async fn run_inner(
        &self,
        manager: &EntityManager,
        start: ComponentKey,
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let tree = manager.tree()?;
        let start_component =
            ComponentRef::new(tree, start).map_err(|_| RunError::UnknownComponent(start))?;
        let component_count = tree.len();
        if self.config.reset_before_run() {
            start_component.reset_hierarchy();
        }

        tracing::info!(components = component_count, "process started");
        self.observers.notify(&ProcessEvent::ProcessStart {
            root: start,
            component_count,
        });

        let session = Session {
            runner: self,
            manager,
            steps: AtomicUsize::new(0),
            actors_executed: AtomicUsize::new(0),
            faults_swallowed: AtomicUsize::new(0),
            halted: Mutex::new(None),
        };

        match session.walk(start).await {
            Ok(()) => {
                let summary = RunSummary {
                    steps: session.steps.load(Ordering::SeqCst),
                    actors_executed: session.actors_executed.load(Ordering::SeqCst),
                    faults_swallowed: session.faults_swallowed.load(Ordering::SeqCst),
                    duration: started.elapsed(),
                };
                tracing::info!(
                    steps = summary.steps,
                    actors = summary.actors_executed,
                    swallowed = summary.faults_swallowed,
                    duration = ?summary.duration,
                    "process completed"
                );
                self.observers.notify(&ProcessEvent::ProcessComplete {
                    steps: summary.steps,
                    duration: summary.duration,
                });
                Ok(summary)
            }
            Err(error) => {
                tracing::error!(%error, "process failed");
                self.observers.notify(&ProcessEvent::ProcessFailure {
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// State of one run.
struct Session<'r> {
    runner: &'r ProcessRunner,
    manager: &'r EntityManager,
    steps: AtomicUsize,
    actors_executed: AtomicUsize,
    faults_swallowed: AtomicUsize,
    /// The error that ended the run, recorded when it surfaced inside an
    /// entity processor and had to cross it as an [`ActorError`].
    halted: Mutex<Option<RunError>>,
}

impl Session<'_> {
    /// Processes every step below `start`.
    async fn walk(&self, start: ComponentKey) -> Result<(), RunError> {
        let tree = self.manager.tree()?;
        let mut open: Vec<ComponentKey> = Vec::new();

        for step in Traversal::new(tree, start) {
            self.count_step()?;
            let Some(component) = tree.component(step.key).cloned() else {
                continue;
            };
            let name = tree
                .info(step.key)
                .map(|info| info.name().to_string())
                .unwrap_or_default();
            let ctx = self.manager.context(step.key);

            let outcome = match step.kind {
                StepKind::Enter => {
                    tracing::debug!(component = %step.key, name = %name, "entering entity");
                    self.runner.observers.notify(&ProcessEvent::EntityEnter {
                        component: step.key,
                        name: name.clone(),
                    });
                    open.push(step.key);
                    self.timed(component.before_process(ctx)).await
                }
                StepKind::Exit => {
                    open.pop();
                    let outcome = self.timed(component.on_completion(ctx)).await;
                    self.runner.observers.notify(&ProcessEvent::EntityExit {
                        component: step.key,
                        name: name.clone(),
                    });
                    outcome
                }
                StepKind::Leaf => self.execute_leaf(&component, ctx, &name).await,
            };

            if let Some(halted) = self.halted.lock().take() {
                return Err(halted);
            }
            if let Err(error) = outcome {
                self.handle_fault(step.key, &name, error, &open).await?;
            }
        }
        Ok(())
    }

    async fn execute_leaf(
        &self,
        component: &Arc<dyn Component>,
        ctx: ComponentContext<'_>,
        name: &str,
    ) -> Result<(), ActorError> {
        let key = ctx.key();
        tracing::debug!(component = %key, name = %name, "executing");
        self.runner.observers.notify(&ProcessEvent::ActorStart {
            component: key,
            name: name.to_string(),
        });
        let started = Instant::now();

        let outcome = match component.as_entity_processor() {
            Some(processor) => self.timed(processor.process_entity(ctx, self)).await,
            None => {
                self.actors_executed.fetch_add(1, Ordering::SeqCst);
                let action = execute_actor(&**component, ctx);
                match self.runner.config.step_timeout() {
                    Some(timeout) => match tokio::time::timeout(timeout, action).await {
                        Ok(outcome) => outcome,
                        Err(_elapsed) => {
                            let error = timeout_error(timeout);
                            if let Some(status) = component.status() {
                                status.fault(error.to_string());
                            }
                            Err(error)
                        }
                    },
                    None => action.await,
                }
            }
        };

        if outcome.is_ok() {
            self.runner.observers.notify(&ProcessEvent::ActorComplete {
                component: key,
                name: name.to_string(),
                duration: started.elapsed(),
            });
        }
        outcome
    }

    /// Applies the fault policy to a failed step.
    ///
    /// Returns `Ok` if the fault was swallowed.
    async fn handle_fault(
        &self,
        key: ComponentKey,
        name: &str,
        error: ActorError,
        open: &[ComponentKey],
    ) -> Result<(), RunError> {
        let tree = self.manager.tree()?;
        let continue_on_error = tree
            .info(key)
            .is_some_and(|info| info.continue_on_error());
        let component_id = tree
            .info(key)
            .map(|info| info.id().to_string())
            .unwrap_or_default();
        let swallowed = self.runner.config.fault_policy().swallows(continue_on_error);

        self.runner.observers.notify(&ProcessEvent::ComponentFaulted {
            component: key,
            name: name.to_string(),
            error: error.to_string(),
            swallowed,
        });

        if swallowed {
            self.faults_swallowed.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(
                component = %key,
                component_id = %component_id,
                name = %name,
                error = %error,
                "fault swallowed"
            );
            return Ok(());
        }

        tracing::error!(
            component = %key,
            component_id = %component_id,
            name = %name,
            error = %error,
            "component faulted"
        );
        let (faulting, source) = match error {
            ActorError::ChildFaulted { component, source } => (component, *source),
            other => (key, other),
        };

        let targets = core::iter::once(key).chain(
            open.iter()
                .rev()
                .copied()
                .filter(|entity| *entity != key),
        );
        for target in targets {
            let Some(component) = tree.component(target) else {
                continue;
            };
            if let Err(hook_error) = self
                .timed(component.on_fault(self.manager.context(target), faulting))
                .await
            {
                tracing::warn!(
                    component = %target,
                    error = %hook_error,
                    "on_fault hook failed"
                );
            }
        }

        let name = tree
            .info(faulting)
            .map_or_else(|| name.to_string(), |info| info.name().to_string());
        Err(RunError::Faulted {
            component: faulting,
            name,
            source,
        })
    }

    fn count_step(&self) -> Result<(), RunError> {
        let steps = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        match self.runner.config.max_steps() {
            Some(max) if steps > max => Err(RunError::StepLimitExceeded { max }),
            _ => Ok(()),
        }
    }

    /// Applies the step timeout to a hook.
    async fn timed(
        &self,
        hook: BoxFuture<'_, Result<(), ActorError>>,
    ) -> Result<(), ActorError> {
        match self.runner.config.step_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, hook)
                .await
                .unwrap_or_else(|_elapsed| Err(timeout_error(timeout))),
            None => hook.await,
        }
    }
}

impl SubtreeExecutor for Session<'_> {
    fn execute_children<'a>(
        &'a self,
        ctx: ComponentContext<'a>,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            match self.walk(ctx.key()).await {
                Ok(()) => Ok(()),
                Err(RunError::Faulted {
                    component, source, ..
                }) => Err(ActorError::ChildFaulted {
                    component,
                    source: Box::new(source),
                }),
                Err(error) => {
                    let message = error.to_string();
                    *self.halted.lock() = Some(error);
                    Err(ActorError::Failed(message))
                }
            }
        })
    }
}

fn timeout_error(timeout: Duration) -> ActorError {
    ActorError::failed(format!("timed out after {timeout:?}"))
}
