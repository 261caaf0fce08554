//! Tests for the entity manager: tree edits, lifecycle, arguments, services
//! and ownership resolution.


use std::path::{Path, PathBuf};
use std::sync::Arc;

use pixel_core::prelude::*;
use pixel_services::{ResolveError, ServiceBinding, ServiceResolver};
use test_utils::{
    Broken, Click, ControlStep, Counters, FakeLocator, HELPER_TAG, LoginArguments, NeedsHelper,
    Counted, CountedEntity, application_process, register_script_engine, sample_process, step_names,
};

struct ProjectFolder {
    root: PathBuf,
}

impl ProjectFolder {
    fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
        }
    }
}

impl FileSystem for ProjectFolder {
    fn working_directory(&self) -> &Path {
        &self.root
    }
}

fn notepad() -> Arc<dyn Application> {
    Arc::new(ApplicationDetails::new("App1", "Notepad"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Adding Components
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn add_component_links_orders_and_resolves_once() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();

    let added = manager
        .add_component(keys.child, ComponentNode::new(Counted::new(&counters)))
        .unwrap();

    let tree = manager.tree().unwrap();
    let info = tree.info(added).unwrap();
    let sibling_orders: Vec<i32> = [keys.actor, keys.processor]
        .iter()
        .map(|key| tree.info(*key).unwrap().process_order())
        .collect();

    assert_eq!(tree.parent(added), Some(keys.child));
    assert!(sibling_orders.iter().all(|order| *order < info.process_order()));
    assert_eq!(info.entity_manager(), Some(manager.id()));
    assert!(info.is_valid());
    assert_eq!(counters.resolved(), 1);
    assert_eq!(counters.validated(), 1);
}

#[test]
fn every_component_of_an_added_subtree_is_resolved_once() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();

    let subtree = ComponentNode::new(CountedEntity::new(&counters))
        .with_child(ComponentNode::new(Counted::new(&counters)))
        .with_child(
            ComponentNode::new(Entity).with_child(ComponentNode::new(Counted::new(&counters))),
        );
    let added = manager.add_component(keys.root, subtree).unwrap();

    let tree = manager.tree().unwrap();
    assert_eq!(counters.resolved(), 2);
    assert_eq!(counters.validated(), 2);
    for key in tree.subtree(added) {
        assert_eq!(tree.info(key).unwrap().entity_manager(), Some(manager.id()));
    }
}

#[test]
fn failed_validation_keeps_component_but_marks_it_invalid() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();

    let added = manager
        .add_component(keys.root, ComponentNode::new(Counted::invalid(&counters)))
        .unwrap();

    assert!(!manager.component(added).unwrap().info().is_valid());
}

#[test]
fn failed_resolution_leaves_tree_unchanged() {
    let (mut manager, keys) = sample_process();
    let before = manager.tree().unwrap().len();

    let result = manager.add_component(keys.root, ComponentNode::new(Broken));

    assert!(matches!(result, Err(ConfigurationError::MissingArgument { .. })));
    assert_eq!(manager.tree().unwrap().len(), before);
}

#[test]
fn failed_insert_puts_sibling_orders_back() {
    let (mut manager, keys) = sample_process();
    let first = manager
        .add_component(keys.root, ComponentNode::new(Entity))
        .unwrap();
    let second = manager
        .add_component(keys.root, ComponentNode::new(Entity))
        .unwrap();
    manager.info_mut(first).unwrap().set_process_order(10);
    manager.info_mut(second).unwrap().set_process_order(20);
    let orders = |manager: &EntityManager| -> Vec<(ComponentKey, i32)> {
        let tree = manager.tree().unwrap();
        tree.children(keys.root)
            .iter()
            .map(|key| (*key, tree.info(*key).unwrap().process_order()))
            .collect()
    };
    let before = orders(&manager);

    let result = manager.insert_component(keys.root, 0, ComponentNode::new(Broken));

    assert!(matches!(result, Err(ConfigurationError::MissingArgument { .. })));
    assert_eq!(orders(&manager), before);
    assert_eq!(manager.tree().unwrap().info(first).unwrap().process_order(), 10);
}

#[test]
fn insert_keeps_the_relative_order_of_configured_siblings() {
    let mut manager = EntityManager::default();
    let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
    let late = manager
        .add_component(root, ComponentNode::new(Click::default()).named("late"))
        .unwrap();
    let early = manager
        .add_component(root, ComponentNode::new(Click::default()).named("early"))
        .unwrap();
    manager.info_mut(late).unwrap().set_process_order(10);
    manager.info_mut(early).unwrap().set_process_order(1);

    manager
        .insert_component(root, 0, ComponentNode::new(Click::default()).named("inserted"))
        .unwrap();

    assert_eq!(step_names(&manager), ["inserted", "early", "late"]);
    assert_eq!(manager.component(late).unwrap().info().process_order(), 10);
}

#[test]
fn children_require_an_entity_parent() {
    let (mut manager, keys) = sample_process();

    let result = manager.add_component(keys.actor, ComponentNode::new(Click::default()));

    assert!(matches!(result, Err(ConfigurationError::NotAnEntity { name }) if name == "Actor"));
}

#[test]
fn unknown_parent_is_rejected() {
    let (mut manager, keys) = sample_process();
    let gone = manager
        .add_component(keys.root, ComponentNode::new(Entity))
        .unwrap();
    manager.remove_component(gone).unwrap();

    let result = manager.add_component(gone, ComponentNode::new(Click::default()));

    assert!(matches!(result, Err(ConfigurationError::UnknownParent(key)) if key == gone));
}

#[test]
fn helper_insertion_is_idempotent() {
    let (mut manager, keys) = sample_process();
    let key = manager
        .add_component(keys.root, ComponentNode::new(NeedsHelper::default()))
        .unwrap();

    manager.resolve_dependencies(key).unwrap();
    manager.resolve_dependencies(key).unwrap();

    let component = manager.component(key).unwrap();
    let helpers = component
        .components_by_tag(HELPER_TAG, SearchScope::Children)
        .unwrap();
    let calls = component
        .downcast::<NeedsHelper>()
        .unwrap()
        .resolved
        .load(core::sync::atomic::Ordering::SeqCst);

    assert_eq!(helpers.len(), 1);
    assert_eq!(calls, 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// Removing And Root Handling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn removed_subtree_is_detached_from_manager() {
    let (mut manager, keys) = sample_process();
    let child_id = manager.component(keys.child).unwrap().info().id().clone();

    let removed = manager.remove_component(keys.child).unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(removed.info().id(), &child_id);
    assert!(removed.info().entity_manager().is_none());
    assert!(
        removed
            .children()
            .iter()
            .all(|child| child.info().entity_manager().is_none())
    );
    assert!(!manager.tree().unwrap().contains(keys.child));
    assert!(!manager.tree().unwrap().contains(keys.actor));
    assert_eq!(step_names(&manager), ["AsyncActor"]);
}

#[test]
fn removed_subtree_can_be_added_again() {
    let (mut manager, keys) = sample_process();
    let removed = manager.remove_component(keys.child).unwrap();

    manager.add_component(keys.root, removed).unwrap();

    assert_eq!(
        step_names(&manager),
        ["AsyncActor", "Child(pre)", "Actor", "Processor", "Child(post)"]
    );
}

#[test]
fn duplicated_subtrees_own_their_components() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();
    let template = ComponentNode::new(CountedEntity::new(&counters))
        .named("Template")
        .with_child(ComponentNode::new(Counted::new(&counters)).named("Leaf"));
    let copy = template.duplicate().unwrap();

    let original = manager.add_component(keys.root, template).unwrap();
    let duplicated = manager.add_component(keys.root, copy).unwrap();

    let tree = manager.tree().unwrap();
    let pairs = tree.subtree(original).into_iter().zip(tree.subtree(duplicated));
    for (left, right) in pairs {
        assert!(!Arc::ptr_eq(
            tree.component(left).unwrap(),
            tree.component(right).unwrap()
        ));
        assert_ne!(tree.info(left).unwrap().id(), tree.info(right).unwrap().id());
        assert_eq!(tree.info(left).unwrap().name(), tree.info(right).unwrap().name());
    }

    manager.dispose();

    assert_eq!(counters.disposed(), 4);
}

#[test]
fn components_without_a_copy_cannot_be_duplicated() {
    let node = ComponentNode::new(Entity)
        .with_child(ComponentNode::new(Click::default()).named("Click"));

    assert!(matches!(
        node.duplicate(),
        Err(ConfigurationError::NotDuplicable { name }) if name == "Click"
    ));
}

#[test]
fn root_cannot_be_removed() {
    let (mut manager, keys) = sample_process();

    assert!(matches!(
        manager.remove_component(keys.root),
        Err(ConfigurationError::CannotRemoveRoot)
    ));
}

#[test]
fn root_is_assigned_once() {
    let (mut manager, _) = sample_process();

    let result = manager.set_root_entity(ComponentNode::new(Entity));

    assert!(matches!(
        result,
        Err(ConfigurationError::Manager(ManagerError::RootAlreadyAssigned))
    ));
}

#[test]
fn root_must_be_an_entity() {
    let mut manager = EntityManager::default();

    let result = manager.set_root_entity(ComponentNode::new(Click::default()));

    assert!(matches!(result, Err(ConfigurationError::NotAnEntity { .. })));
    assert!(matches!(manager.tree(), Err(ManagerError::NoRootEntity)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn manager_moves_through_its_states() {
    let mut manager = EntityManager::default();
    assert_eq!(manager.state(), ManagerState::Uninitialized);

    manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
    assert_eq!(manager.state(), ManagerState::Uninitialized);

    manager.set_arguments(LoginArguments::default());
    assert_eq!(manager.state(), ManagerState::Bound);

    let _ = manager.next_components_to_process().unwrap().count();
    assert_eq!(manager.state(), ManagerState::Active);

    manager.dispose();
    assert_eq!(manager.state(), ManagerState::Disposed);
}

#[test]
fn disposed_manager_rejects_operations() {
    let (mut manager, keys) = sample_process();
    manager.dispose();

    assert!(matches!(manager.tree(), Err(ManagerError::Disposed)));
    assert!(matches!(
        manager.add_component(keys.root, ComponentNode::new(Entity)),
        Err(ConfigurationError::Manager(ManagerError::Disposed))
    ));
    assert!(matches!(
        manager.service::<dyn FileSystem>(None),
        Err(LookupError::Manager(ManagerError::Disposed))
    ));
    assert!(matches!(manager.prefab(), Err(ManagerError::Disposed)));
    assert!(matches!(
        manager.arguments::<LoginArguments>(),
        Err(ManagerError::Disposed)
    ));
}

#[test]
fn dispose_runs_once_per_component() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();
    let entity = manager
        .add_component(keys.root, ComponentNode::new(CountedEntity::new(&counters)))
        .unwrap();
    manager
        .add_component(entity, ComponentNode::new(Counted::new(&counters)))
        .unwrap();
    manager
        .add_component(keys.child, ComponentNode::new(Counted::new(&counters)).disabled())
        .unwrap();

    manager.dispose();
    manager.dispose();
    drop(manager);

    assert_eq!(counters.disposed(), 3);
}

#[test]
fn dropping_a_manager_disposes_it() {
    let counters = Counters::new();
    let (mut manager, keys) = sample_process();
    manager
        .add_component(keys.root, ComponentNode::new(Counted::new(&counters)))
        .unwrap();

    drop(manager);

    assert_eq!(counters.disposed(), 1);
}

#[test]
fn dispose_releases_scoped_services() {
    let resolver = ServiceResolver::new();
    register_script_engine(&resolver);
    let mut manager = EntityManager::new(resolver);
    let resolver = Arc::clone(manager.resolver());

    manager.dispose();

    assert!(resolver.is_disposed());
    assert!(matches!(
        resolver.get::<dyn ScriptEngine>(),
        Err(ResolveError::Disposed)
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn arguments_are_typed() {
    let manager = EntityManager::default();
    assert!(matches!(
        manager.arguments::<LoginArguments>(),
        Err(ManagerError::NoArguments)
    ));

    manager.set_arguments(LoginArguments {
        user: "admin".to_string(),
        password: "secret".to_string(),
        attempts: 0,
    });
    manager.arguments_mut::<LoginArguments>().unwrap().attempts += 1;

    let arguments = manager.arguments::<LoginArguments>().unwrap();
    assert_eq!(arguments.user, "admin");
    assert_eq!(arguments.attempts, 1);
    drop(arguments);

    assert!(matches!(
        manager.arguments::<()>(),
        Err(ManagerError::ArgumentsType { .. })
    ));
}

#[test]
fn properties_are_collected_from_arguments_scopes_and_scripts() {
    let resolver = ServiceResolver::new();
    register_script_engine(&resolver);
    let mut manager = EntityManager::new(resolver);
    let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
    let repeat = manager
        .add_component(root, ComponentNode::new(RepeatEntity::new(3)))
        .unwrap();
    let step = manager
        .add_component(repeat, ComponentNode::new(Click::default()))
        .unwrap();
    manager.set_arguments(LoginArguments::default());
    manager
        .script_engine()
        .unwrap()
        .set_variable("greeting", serde_json::json!("hello"));
    manager
        .script_engine()
        .unwrap()
        .set_variable("user", serde_json::json!("shadowed"));

    let strings = manager.properties_of_type::<String>(Some(step)).unwrap();
    let counts = manager.properties_of_type::<usize>(Some(step)).unwrap();
    let counts_outside = manager.properties_of_type::<usize>(Some(root)).unwrap();
    let unscoped = manager.properties_of_type::<usize>(None).unwrap();

    assert_eq!(strings, ["user", "password", "greeting"]);
    assert_eq!(counts, ["iteration"]);
    assert!(counts_outside.is_empty());
    assert!(unscoped.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Services
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_service_is_an_error() {
    let manager = EntityManager::default();

    let result = manager.service::<dyn ScriptEngine>(None);

    assert!(matches!(
        result,
        Err(LookupError::Service(ResolveError::NotRegistered(_)))
    ));
}

#[test]
fn named_services_resolve_by_name() {
    let resolver = ServiceResolver::new();
    let main: Arc<dyn FileSystem> = Arc::new(ProjectFolder::new("/projects/main"));
    let backup: Arc<dyn FileSystem> = Arc::new(ProjectFolder::new("/projects/backup"));
    resolver.register_instance(Arc::clone(&main));
    resolver.register(ServiceBinding::instance(Arc::clone(&backup)).named("backup"));
    let manager = EntityManager::new(resolver);

    let default = manager.service::<dyn FileSystem>(None).unwrap();
    let named = manager.service::<dyn FileSystem>(Some("backup")).unwrap();
    let all = manager.all_services::<dyn FileSystem>().unwrap();

    assert!(Arc::ptr_eq(&default, &main));
    assert!(Arc::ptr_eq(&named, &backup));
    assert_eq!(all.len(), 2);
}

#[test]
fn file_system_prefers_the_manager_override() {
    let resolver = ServiceResolver::new();
    resolver.register_instance::<dyn FileSystem>(Arc::new(ProjectFolder::new("/registered")));
    let manager = EntityManager::new(resolver);
    assert_eq!(
        manager.file_system().unwrap().working_directory(),
        Path::new("/registered")
    );

    manager.set_file_system(Arc::new(ProjectFolder::new("/override")));

    let file_system = manager.file_system().unwrap();
    assert_eq!(file_system.working_directory(), Path::new("/override"));
    assert_eq!(
        file_system.resolve_path("flows/login.json"),
        PathBuf::from("/override/flows/login.json")
    );
}

#[test]
fn prefab_gets_its_own_scoped_services() {
    let resolver = ServiceResolver::new();
    register_script_engine(&resolver);
    resolver.register_singleton::<dyn FileSystem>(|_| {
        let shared: Arc<dyn FileSystem> = Arc::new(ProjectFolder::new("/shared"));
        Ok(shared)
    });
    let manager = EntityManager::new(resolver);
    manager.set_file_system(Arc::new(ProjectFolder::new("/override")));

    let prefab = manager.prefab().unwrap();
    prefab
        .script_engine()
        .unwrap()
        .set_variable("local", serde_json::json!(1));

    assert!(!Arc::ptr_eq(
        &manager.script_engine().unwrap(),
        &prefab.script_engine().unwrap()
    ));
    assert!(manager.script_engine().unwrap().get_variable("local").is_none());
    assert!(Arc::ptr_eq(
        &manager.service::<dyn FileSystem>(None).unwrap(),
        &prefab.service::<dyn FileSystem>(None).unwrap()
    ));
    assert_eq!(
        prefab.file_system().unwrap().working_directory(),
        Path::new("/override")
    );
    assert_eq!(prefab.resolver().depth(), manager.resolver().depth() + 1);
}

#[test]
fn component_context_resolves_services_of_its_manager() {
    let resolver = ServiceResolver::new();
    register_script_engine(&resolver);
    let mut manager = EntityManager::new(resolver);
    let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();

    let ctx = manager.context(root);
    let from_ctx = ctx.service::<dyn ScriptEngine>().unwrap();

    assert!(Arc::ptr_eq(&from_ctx, &manager.script_engine().unwrap()));
    assert_eq!(ctx.info().unwrap().entity_manager(), Some(manager.id()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner Applications And Locators
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn owner_application_is_found_through_identity_context_and_owner() {
    let application = notepad();
    let (manager, keys) = application_process(&application);

    for key in [keys.identity, keys.sequence, keys.locator, keys.application] {
        let owner = manager.owner_application(key).unwrap();
        assert!(Arc::ptr_eq(&owner, &application));
    }
    assert_eq!(
        manager.owner_application_entity(keys.identity).unwrap(),
        keys.application
    );
}

#[test]
fn owner_application_is_stable() {
    let application = notepad();
    let (manager, keys) = application_process(&application);

    let first = manager.owner_application(keys.identity).unwrap();
    let second = manager.owner_application(keys.identity).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn components_outside_applications_have_no_owner() {
    let application = notepad();
    let (manager, keys) = application_process(&application);

    assert!(manager.try_owner_application(keys.root).is_none());
    assert!(matches!(
        manager.owner_application(keys.pool),
        Err(LookupError::NoOwnerApplication(key)) if key == keys.pool
    ));
}

#[test]
fn application_entity_without_pool_owns_its_subtree() {
    let application = notepad();
    let mut manager = EntityManager::default();
    let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
    let owner = manager
        .add_component(
            root,
            ComponentNode::new(ApplicationEntity::new(Arc::clone(&application))),
        )
        .unwrap();
    let step = manager
        .add_component(owner, ComponentNode::new(Click::default()))
        .unwrap();

    assert_eq!(manager.owner_application_entity(step).unwrap(), owner);
    assert!(Arc::ptr_eq(
        &manager.owner_application(step).unwrap(),
        &application
    ));
}

#[test]
fn steps_inside_an_application_outside_the_pool_find_its_locator() {
    let application = notepad();
    let mut manager = EntityManager::default();
    let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
    let owner = manager
        .add_component(
            root,
            ComponentNode::new(ApplicationEntity::new(Arc::clone(&application))),
        )
        .unwrap();
    let locator = manager
        .add_component(owner, ComponentNode::new(FakeLocator::new("Button")))
        .unwrap();
    let step = manager
        .add_component(owner, ComponentNode::new(ControlStep::new("App1", "Button")))
        .unwrap();
    let identity = ControlStep::new("App1", "Button");

    assert_eq!(manager.owner_application_entity(step).unwrap(), owner);
    assert_eq!(manager.control_locator(&identity).unwrap().key(), locator);
    assert_eq!(manager.coordinate_provider(&identity).unwrap().key(), locator);
}

#[test]
fn unknown_application_id_is_reported() {
    let application = notepad();
    let (mut manager, keys) = application_process(&application);
    let stray = manager
        .add_component(keys.root, ComponentNode::new(ControlStep::new("App2", "Button")))
        .unwrap();

    assert!(matches!(
        manager.owner_application(stray),
        Err(LookupError::ApplicationNotFound(id)) if id == "App2"
    ));
}

#[test]
fn control_locator_is_found_in_the_owning_application() {
    let application = notepad();
    let (manager, keys) = application_process(&application);
    let identity = ControlStep::new("App1", "Button");

    let locator = manager.control_locator(&identity).unwrap();
    let provider = manager.coordinate_provider(&identity).unwrap();

    assert_eq!(locator.key(), keys.locator);
    assert_eq!(provider.key(), keys.locator);
}

#[test]
fn control_locator_for_unsupported_type_is_reported() {
    let application = notepad();
    let (manager, _) = application_process(&application);
    let identity = ControlStep::new("App1", "Slider");

    assert!(matches!(
        manager.control_locator(&identity),
        Err(LookupError::ControlLocatorNotConfigured { control_type, .. }) if control_type == "Slider"
    ));
    assert!(matches!(
        manager.coordinate_provider(&identity),
        Err(LookupError::CoordinateProviderNotConfigured { .. })
    ));
}

#[test]
fn disabled_locator_is_ignored() {
    let application = notepad();
    let (mut manager, keys) = application_process(&application);
    manager.info_mut(keys.locator).unwrap().set_enabled(false);
    let identity = ControlStep::new("App1", "Button");

    assert!(matches!(
        manager.control_locator(&identity),
        Err(LookupError::ControlLocatorNotConfigured { .. })
    ));
}

#[tokio::test]
async fn located_control_carries_geometry() {
    let application = notepad();
    let (manager, _) = application_process(&application);
    let identity = ControlStep::new("App1", "Button");

    let locator = manager.control_locator(&identity).unwrap();
    let control = locator.find_control(&identity).await.unwrap();
    let bounds = control.bounding_box.unwrap();

    assert_eq!(control.name, "Button control");
    assert_eq!(bounds.center(), (40, 12));
}

#[tokio::test]
async fn identity_actor_resolves_its_locator_while_executing() {
    let application = notepad();
    let (manager, keys) = application_process(&application);
    let component = manager.component(keys.identity).unwrap().component();

    execute_actor(&**component, manager.context(keys.identity))
        .await
        .unwrap();

    assert!(!component.status().unwrap().is_faulted());
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn describe_captures_the_tree() {
    let application = notepad();
    let (manager, _) = application_process(&application);

    let summary = manager.describe().unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(summary.len(), 7);
    assert_eq!(summary.children[0].name, "Application Pool");
    assert_eq!(json["children"][0]["tag"], APPLICATION_POOL_TAG);
    assert!(json.get("tag").is_none());
    let restored: ComponentSummary = serde_json::from_value(json).unwrap();
    assert_eq!(restored, summary);
}
