use std::cell::RefCell;
use std::rc::Rc;

use arbor_bt::{
    ActionNode, BtStatus, CallStackId, DecoratorKind, NodeContext, NodeDefinition, NodeHandle,
    ParallelPolicy, RuntimeTree, SetProperty, TickContext, TreeTemplate, Wait,
};
use arbor_core::{BbValue, Condition};
use arbor_tools::{tags, SharedTraceLog};

/// Root → Outer(all) → [Inner(all) → [W1, W2], W3]
fn nested_parallels() -> RuntimeTree {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let outer = template
        .add_child(
            root,
            NodeDefinition::parallel("Outer", ParallelPolicy::RequireAllSuccess),
        )
        .unwrap();
    let inner = template
        .add_child(
            outer,
            NodeDefinition::parallel("Inner", ParallelPolicy::RequireAllSuccess),
        )
        .unwrap();
    template
        .add_child(outer, NodeDefinition::action("W3", Wait::new(100.0)))
        .unwrap();
    template
        .add_child(inner, NodeDefinition::action("W1", Wait::new(100.0)))
        .unwrap();
    template
        .add_child(inner, NodeDefinition::action("W2", Wait::new(100.0)))
        .unwrap();
    template.instantiate().unwrap()
}

fn handle(tree: &RuntimeTree, path: &str) -> NodeHandle {
    tree.find_node_by_path(path).unwrap()
}

#[test]
fn abort_unwinds_parallel_branches_before_their_parent() {
    let mut tree = nested_parallels();
    let log = SharedTraceLog::new();
    tree.set_trace_sink(Box::new(log.clone()));

    assert_eq!(tree.tick(TickContext::new(1, 0.1)), BtStatus::Running);
    assert_eq!(tree.call_stacks().depth(CallStackId::ROOT), 2);

    tree.abort();

    let order: Vec<NodeHandle> = log
        .snapshot()
        .with_tag(tags::NODE_ABORT)
        .map(|e| NodeHandle(e.a as u32))
        .collect();
    let expected = [
        "Root/Outer/Inner/W1",
        "Root/Outer/Inner/W2",
        "Root/Outer/Inner",
        "Root/Outer/W3",
        "Root/Outer",
        "Root",
    ]
    .map(|path| handle(&tree, path));
    assert_eq!(order, expected);
    assert!(tree.call_stacks().is_idle());
    assert!(tree.nodes().all(|(_, node)| !node.is_active()));
}

/// Root → Gate(go) → Par(all) → [Patrol → Step, Watch(all) → [W1, W2]]
fn gated_parallels() -> RuntimeTree {
    let mut template = TreeTemplate::new();
    template.declare("go", true).unwrap();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let gate = template
        .add_child(
            root,
            NodeDefinition::decorator(
                "Gate",
                DecoratorKind::ConditionGate {
                    conditions: vec![Condition::equal("go", BbValue::Bool(true))],
                },
            ),
        )
        .unwrap();
    let par = template
        .add_child(
            gate,
            NodeDefinition::parallel("Par", ParallelPolicy::RequireAllSuccess),
        )
        .unwrap();
    let patrol = template
        .add_child(par, NodeDefinition::sequence("Patrol"))
        .unwrap();
    let watch = template
        .add_child(
            par,
            NodeDefinition::parallel("Watch", ParallelPolicy::RequireAllSuccess),
        )
        .unwrap();
    template
        .add_child(patrol, NodeDefinition::action("Step", Wait::new(100.0)))
        .unwrap();
    template
        .add_child(watch, NodeDefinition::action("W1", Wait::new(100.0)))
        .unwrap();
    template
        .add_child(watch, NodeDefinition::action("W2", Wait::new(100.0)))
        .unwrap();
    template.instantiate().unwrap()
}

#[test]
fn closing_a_gate_unwinds_the_parallel_branches_below_it() {
    let mut tree = gated_parallels();
    let log = SharedTraceLog::new();
    tree.set_trace_sink(Box::new(log.clone()));

    assert_eq!(tree.tick(TickContext::new(1, 0.1)), BtStatus::Running);
    assert_eq!(tree.call_stacks().depth(CallStackId::ROOT), 3);

    tree.set_property("go", false).unwrap();
    assert_eq!(tree.tick(TickContext::new(2, 0.1)), BtStatus::Failure);
    assert!(tree.call_stacks().is_idle());
    assert!(tree.nodes().all(|(_, node)| !node.is_active()));

    let aborted: Vec<NodeHandle> = log
        .snapshot()
        .with_tag(tags::NODE_ABORT)
        .map(|e| NodeHandle(e.a as u32))
        .collect();
    let expected = [
        "Root/Gate/Par/Patrol/Step",
        "Root/Gate/Par/Patrol",
        "Root/Gate/Par/Watch/W1",
        "Root/Gate/Par/Watch/W2",
        "Root/Gate/Par/Watch",
        "Root/Gate/Par",
    ]
    .map(|path| handle(&tree, path));
    assert_eq!(aborted, expected);

    // The gate itself completes normally.
    let gate = handle(&tree, "Root/Gate");
    let gate_exits = log
        .snapshot()
        .with_tag(tags::NODE_EXIT)
        .filter(|e| e.a == u64::from(gate.0))
        .count();
    assert_eq!(gate_exits, 1);

    tree.set_property("go", true).unwrap();
    assert_eq!(tree.tick(TickContext::new(3, 0.1)), BtStatus::Running);
    for path in ["Root/Gate", "Root/Gate/Par/Patrol/Step", "Root/Gate/Par/Watch/W2"] {
        assert!(tree.node(handle(&tree, path)).unwrap().is_active(), "{path}");
    }
}

#[test]
fn abort_is_idempotent() {
    let mut tree = nested_parallels();
    tree.tick(TickContext::new(1, 0.1));
    tree.abort();

    let log = SharedTraceLog::new();
    tree.set_trace_sink(Box::new(log.clone()));
    tree.abort();
    tree.abort();
    assert!(log.is_empty());
}

#[test]
fn aborted_nodes_report_failure_and_keep_their_call_counts() {
    let mut tree = nested_parallels();
    tree.tick(TickContext::new(1, 0.1));
    tree.tick(TickContext::new(2, 0.1));
    tree.abort();

    let w1 = tree.node(handle(&tree, "Root/Outer/Inner/W1")).unwrap();
    assert_eq!(w1.last_result(), BtStatus::Failure);
    assert_eq!(w1.call_count(), 2);
}

#[test]
fn abort_from_keeps_the_target_on_its_stack() {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let seq = template
        .add_child(root, NodeDefinition::sequence("Seq"))
        .unwrap();
    template
        .add_child(seq, NodeDefinition::action("Wait", Wait::new(100.0)))
        .unwrap();
    let mut tree = template.instantiate().unwrap();
    tree.tick(TickContext::new(1, 0.1));

    let seq = handle(&tree, "Root/Seq");
    tree.abort_from(CallStackId::ROOT, seq);

    assert_eq!(tree.current(CallStackId::ROOT), Some(seq));
    assert!(!tree.node(handle(&tree, "Root/Seq/Wait")).unwrap().is_active());

    // Unknown stacks are ignored.
    tree.abort_all(CallStackId(9));
    assert_eq!(tree.call_stacks().depth(CallStackId::ROOT), 2);
}

#[test]
fn restart_restores_the_initial_state() {
    let mut template = TreeTemplate::new();
    template.declare("score", 0i64).unwrap();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let seq = template
        .add_child(root, NodeDefinition::sequence("Seq"))
        .unwrap();
    template
        .add_child(
            seq,
            NodeDefinition::action("Score", SetProperty::new(5i64)).bind("target", "score"),
        )
        .unwrap();
    template
        .add_child(seq, NodeDefinition::action("Wait", Wait::new(100.0)))
        .unwrap();
    let mut tree = template.instantiate().unwrap();

    tree.tick(TickContext::new(1, 0.1));
    tree.tick(TickContext::new(2, 0.1));
    assert_eq!(tree.get_property::<i64>("score").unwrap(), 5);

    tree.restart();

    assert_eq!(tree.get_property::<i64>("score").unwrap(), 0);
    assert_eq!(tree.last_result(), BtStatus::Running);
    assert!(tree.call_stacks().is_idle());
    assert!(tree.nodes().all(|(_, node)| node.call_count() == 0));
}

#[derive(Clone)]
struct Hooks {
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl ActionNode for Hooks {
    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) -> BtStatus {
        self.calls.borrow_mut().push("update");
        BtStatus::Running
    }

    fn on_fixed_update(&mut self, _ctx: &mut NodeContext<'_>) {
        self.calls.borrow_mut().push("fixed");
    }

    fn on_gizmo(&mut self, _ctx: &mut NodeContext<'_>) {
        self.calls.borrow_mut().push("gizmo");
    }
}

#[test]
fn secondary_hooks_reach_only_active_actions() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    template
        .add_child(
            root,
            NodeDefinition::action(
                "Hooks",
                Hooks {
                    calls: Rc::clone(&calls),
                },
            ),
        )
        .unwrap();
    let mut tree = template.instantiate().unwrap();

    tree.fixed_tick(TickContext::new(0, 0.02));
    assert!(calls.borrow().is_empty());

    tree.tick(TickContext::new(1, 0.1));
    tree.fixed_tick(TickContext::new(1, 0.02));
    tree.gizmo_tick(TickContext::new(1, 0.0));
    assert_eq!(*calls.borrow(), vec!["update", "fixed", "gizmo"]);
}
