//! Tests for the order in which a tree is visited.


use pixel_core::prelude::*;
use pixel_services::ServiceResolver;
use proptest::prelude::*;
use test_utils::{Batch, Click, Note, Wait, sample_process, step_names};

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn entity_children_are_bracketed_by_pre_and_post_steps() {
    let (manager, keys) = sample_process();
    manager.set_arguments(());

    let steps: Vec<Step> = manager.next_components_to_process().unwrap().collect();

    assert_eq!(
        steps,
        vec![
            Step::enter(keys.child),
            Step::leaf(keys.actor),
            Step::leaf(keys.processor),
            Step::exit(keys.child),
            Step::leaf(keys.async_actor),
        ]
    );
    assert_eq!(
        step_names(&manager),
        ["Child(pre)", "Actor", "Processor", "Child(post)", "AsyncActor"]
    );
}

#[test]
fn traversal_can_start_at_any_entity() {
    let (manager, keys) = sample_process();

    let steps: Vec<Step> = manager
        .component(keys.child)
        .unwrap()
        .next_components_to_process()
        .collect();

    assert_eq!(steps, vec![Step::leaf(keys.actor), Step::leaf(keys.processor)]);
}

#[test]
fn restarting_a_traversal_yields_the_same_steps() {
    let (manager, _) = sample_process();

    let first: Vec<Step> = manager.next_components_to_process().unwrap().collect();
    let second: Vec<Step> = manager.next_components_to_process().unwrap().collect();

    assert_eq!(first, second);
}

#[test]
fn process_order_wins_over_insertion_order() {
    let mut manager = EntityManager::default();
    let root = manager
        .set_root_entity(
            ComponentNode::new(Entity)
                .with_child(ComponentNode::new(Click::default()).named("Late").with_process_order(5))
                .with_child(ComponentNode::new(Click::default()).named("Early").with_process_order(1))
                .with_child(ComponentNode::new(Click::default()).named("Tied").with_process_order(1)),
        )
        .unwrap();
    assert!(manager.tree().unwrap().contains(root));

    assert_eq!(step_names(&manager), ["Early", "Tied", "Late"]);
}

#[test]
fn inserted_component_runs_at_its_position() {
    let (mut manager, keys) = sample_process();

    manager
        .insert_component(keys.child, 1, ComponentNode::new(Click::default()).named("Inserted"))
        .unwrap();

    assert_eq!(
        step_names(&manager),
        ["Child(pre)", "Actor", "Inserted", "Processor", "Child(post)", "AsyncActor"]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Skipping
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn disabled_components_are_skipped() {
    let (mut manager, keys) = sample_process();
    manager.info_mut(keys.actor).unwrap().set_enabled(false);

    assert_eq!(
        step_names(&manager),
        ["Child(pre)", "Processor", "Child(post)", "AsyncActor"]
    );
}

#[test]
fn disabled_entity_hides_its_subtree() {
    let (mut manager, keys) = sample_process();
    manager.info_mut(keys.child).unwrap().set_enabled(false);

    assert_eq!(step_names(&manager), ["AsyncActor"]);
}

#[test]
fn disabled_start_yields_nothing() {
    let (mut manager, keys) = sample_process();
    manager.info_mut(keys.child).unwrap().set_enabled(false);

    let steps = manager
        .component(keys.child)
        .unwrap()
        .next_components_to_process()
        .count();

    assert_eq!(steps, 0);
}

#[test]
fn processor_children_are_left_to_the_processor() {
    let (mut manager, keys) = sample_process();
    manager
        .add_component(keys.processor, ComponentNode::new(Click::default()).named("Inner"))
        .unwrap();

    let names = step_names(&manager);

    assert!(names.contains(&"Processor".to_string()));
    assert!(!names.contains(&"Inner".to_string()));
}

#[test]
fn components_without_capabilities_are_not_yielded() {
    let (mut manager, keys) = sample_process();
    manager
        .add_component(keys.root, ComponentNode::new(Note).named("Note"))
        .unwrap();

    assert_eq!(
        step_names(&manager),
        ["Child(pre)", "Actor", "Processor", "Child(post)", "AsyncActor"]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Property Tests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Kind {
    Entity,
    Actor,
    AsyncActor,
    Processor,
    Inert,
}

fn kind_strategy() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Entity),
        Just(Kind::Actor),
        Just(Kind::AsyncActor),
        Just(Kind::Processor),
        Just(Kind::Inert),
    ]
}

fn node_for(kind: Kind) -> ComponentNode {
    match kind {
        Kind::Entity => ComponentNode::new(Entity),
        Kind::Actor => ComponentNode::new(Click::default()),
        Kind::AsyncActor => ComponentNode::new(Wait::default()),
        Kind::Processor => ComponentNode::new(Batch),
        Kind::Inert => ComponentNode::new(Note),
    }
}

/// Counts the steps a traversal below `component` should yield.
fn expected_steps(component: ComponentRef<'_>) -> usize {
    component
        .children()
        .into_iter()
        .filter(|child| child.info().is_enabled())
        .map(|child| {
            let behavior = child.component();
            if behavior.as_actor().is_some()
                || behavior.as_async_actor().is_some()
                || behavior.as_entity_processor().is_some()
            {
                1
            } else if behavior.is_entity() {
                2 + expected_steps(child)
            } else {
                0
            }
        })
        .sum()
}

proptest! {
    #[test]
    fn traversal_yields_every_enabled_reachable_step(
        layout in prop::collection::vec((any::<usize>(), kind_strategy(), any::<bool>()), 0..40),
    ) {
        let mut manager = EntityManager::new(ServiceResolver::new());
        let root = manager.set_root_entity(ComponentNode::new(Entity)).unwrap();
        let mut containers = vec![root];

        for (parent, kind, enabled) in layout {
            let parent = containers[parent % containers.len()];
            let mut node = node_for(kind);
            if !enabled {
                node = node.disabled();
            }
            let key = manager.add_component(parent, node).unwrap();
            if matches!(kind, Kind::Entity | Kind::Processor) {
                containers.push(key);
            }
        }

        let steps: Vec<Step> = manager.next_components_to_process().unwrap().collect();
        let enters = steps.iter().filter(|step| step.kind == StepKind::Enter).count();
        let exits = steps.iter().filter(|step| step.kind == StepKind::Exit).count();

        prop_assert_eq!(steps.len(), expected_steps(manager.root_entity().unwrap()));
        prop_assert_eq!(enters, exits);
    }
}
