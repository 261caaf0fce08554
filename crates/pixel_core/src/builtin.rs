//! Built-in entities.
//!
//! | Type | Capabilities |
//! |------|--------------|
//! | [`Entity`] | plain container |
//! | [`SequenceEntity`] | container, application context |
//! | [`ApplicationPoolEntity`] | container for application entities |
//! | [`ApplicationEntity`] | container, application owner |
//! | [`RepeatEntity`] | container, loop, entity processor, scoped entity |

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::arguments::PropertyInfo;
use crate::capability::{
    Application, ApplicationContext, ApplicationOwner, EntityProcessor, Loop, ScopedEntity,
    SubtreeExecutor,
};
use crate::component::{BoxFuture, Component, ComponentContext};
use crate::error::ActorError;
use crate::tree::ComponentNode;

/// Tag of the root child holding the application entities.
pub const APPLICATION_POOL_TAG: &str = "ApplicationPoolEntity";

/// A plain container of components.
#[derive(Debug, Default, Clone, Copy)]
pub struct Entity;

impl Component for Entity {
    fn is_entity(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        Some(Arc::new(Entity))
    }
}

/// A group of steps acting on one application.
#[derive(Debug, Default, Clone)]
pub struct SequenceEntity {
    application_id: Option<String>,
}

impl SequenceEntity {
    /// Creates a sequence without a target application.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence targeting `application_id`.
    #[must_use]
    pub fn for_application(application_id: impl Into<String>) -> Self {
        Self {
            application_id: Some(application_id.into()),
        }
    }
}

impl Component for SequenceEntity {
    fn is_entity(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        Some(Arc::new(self.clone()))
    }

    fn as_application_context(&self) -> Option<&dyn ApplicationContext> {
        Some(self)
    }
}

impl ApplicationContext for SequenceEntity {
    fn target_application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }
}

/// Container of the application entities of a process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationPoolEntity;

impl ApplicationPoolEntity {
    /// Returns a node tagged as the application pool.
    #[must_use]
    pub fn node() -> ComponentNode {
        ComponentNode::new(Self)
            .named("Application Pool")
            .tagged(APPLICATION_POOL_TAG)
    }
}

impl Component for ApplicationPoolEntity {
    fn is_entity(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        Some(Arc::new(ApplicationPoolEntity))
    }
}

/// Details of an application: id and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDetails {
    id: String,
    name: String,
}

impl ApplicationDetails {
    /// Creates application details.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Application for ApplicationDetails {
    fn application_id(&self) -> &str {
        &self.id
    }

    fn application_name(&self) -> &str {
        &self.name
    }
}

/// Entity owning one application and the locators for its controls.
#[derive(Debug, Clone)]
pub struct ApplicationEntity {
    application: Arc<dyn Application>,
}

impl ApplicationEntity {
    /// Creates an entity owning `application`.
    #[must_use]
    pub fn new(application: Arc<dyn Application>) -> Self {
        Self { application }
    }
}

impl Component for ApplicationEntity {
    fn is_entity(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        Some(Arc::new(self.clone()))
    }

    fn as_application_owner(&self) -> Option<&dyn ApplicationOwner> {
        Some(self)
    }
}

impl ApplicationOwner for ApplicationEntity {
    fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }
}

/// Runs its children a fixed number of times.
///
/// Exposes the current iteration to descendants as the scoped property
/// `iteration`.
#[derive(Debug, Default)]
pub struct RepeatEntity {
    count: usize,
    iteration: AtomicUsize,
}

impl RepeatEntity {
    /// Creates a loop running its children `count` times.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count,
            iteration: AtomicUsize::new(0),
        }
    }

    /// Returns the configured number of iterations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Component for RepeatEntity {
    fn is_entity(&self) -> bool {
        true
    }

    fn reset(&self) {
        self.iteration.store(0, Ordering::SeqCst);
    }

    fn duplicate(&self) -> Option<Arc<dyn Component>> {
        Some(Arc::new(RepeatEntity::new(self.count)))
    }

    fn as_entity_processor(&self) -> Option<&dyn EntityProcessor> {
        Some(self)
    }

    fn as_loop(&self) -> Option<&dyn Loop> {
        Some(self)
    }

    fn as_scoped_entity(&self) -> Option<&dyn ScopedEntity> {
        Some(self)
    }
}

impl Loop for RepeatEntity {
    fn iteration(&self) -> usize {
        self.iteration.load(Ordering::SeqCst)
    }
}

impl EntityProcessor for RepeatEntity {
    fn process_entity<'a>(
        &'a self,
        ctx: ComponentContext<'a>,
        executor: &'a dyn SubtreeExecutor,
    ) -> BoxFuture<'a, Result<(), ActorError>> {
        Box::pin(async move {
            for iteration in 0..self.count {
                self.iteration.store(iteration, Ordering::SeqCst);
                executor.execute_children(ctx).await?;
            }
            Ok(())
        })
    }
}

impl ScopedEntity for RepeatEntity {
    fn scoped_properties(&self) -> Vec<PropertyInfo> {
        vec![PropertyInfo::of::<usize>("iteration")]
    }
}
