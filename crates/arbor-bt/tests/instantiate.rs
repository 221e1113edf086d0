use std::cell::RefCell;
use std::rc::Rc;

use arbor_bt::{
    BtStatus, BuildError, DecoratorKind, NodeDefinition, NodeId, NodePhase, SetProperty,
    StructuralError, Succeed, TickContext, TreeTemplate, Wait,
};
use arbor_core::{BbValue, BlackboardError, Comparison, Condition};

fn patrol() -> TreeTemplate {
    let mut template = TreeTemplate::new();
    template.declare("target", [1.0f32, 2.0, 3.0]).unwrap();
    template.declare("alert", false).unwrap();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let sel = template
        .add_child(root, NodeDefinition::selector("Brain"))
        .unwrap();
    let chase = template
        .add_child(sel, NodeDefinition::sequence("Chase").with_tag("combat"))
        .unwrap();
    template
        .add_child(
            chase,
            NodeDefinition::action("Raise", SetProperty::new(true)).bind("target", "alert"),
        )
        .unwrap();
    template
        .add_child(chase, NodeDefinition::action("Hold", Wait::new(1.0)).with_tag("combat"))
        .unwrap();
    template
        .add_child(sel, NodeDefinition::action("Idle", Succeed))
        .unwrap();
    template
}

#[test]
fn instances_have_independent_blackboards() {
    let template = patrol();
    let mut a = template.instantiate().unwrap();
    let b = template.instantiate().unwrap();

    a.tick(TickContext::new(1, 0.1));
    a.tick(TickContext::new(2, 0.1));
    assert!(a.get_property::<bool>("alert").unwrap());
    assert!(!b.get_property::<bool>("alert").unwrap());
    assert!(!template.blackboard().get_by_name::<bool>("alert").unwrap());

    a.set_property("target", [0.0f32; 3]).unwrap();
    assert_eq!(b.get_property::<[f32; 3]>("target").unwrap(), [1.0, 2.0, 3.0]);
}

#[test]
fn property_access_is_type_checked() {
    let mut tree = patrol().instantiate().unwrap();
    assert!(matches!(
        tree.get_property::<i64>("alert"),
        Err(BlackboardError::PropertyTypeMismatch { .. })
    ));
    assert!(matches!(
        tree.set_property("missing", 1i64),
        Err(BlackboardError::PropertyNotFound { .. })
    ));
}

#[test]
fn paths_round_trip_for_every_node() {
    let tree = patrol().instantiate().unwrap();
    for (handle, _) in tree.nodes() {
        let path = tree.path_of(handle).unwrap();
        assert_eq!(tree.find_node_by_path(&path), Some(handle), "{path}");
    }
    assert_eq!(
        tree.path_of(tree.find_node_by_path("Root/Brain/Chase/Hold").unwrap())
            .as_deref(),
        Some("Root/Brain/Chase/Hold")
    );
    assert_eq!(tree.find_node_by_path("Root/Brain/Missing"), None);
    assert_eq!(tree.find_node_by_path("Brain/Chase"), None);
}

#[test]
fn nodes_are_found_by_tag_and_guid() {
    let template = patrol();
    let tree = template.instantiate().unwrap();
    let tagged: Vec<String> = tree
        .find_nodes_by_tag("combat")
        .into_iter()
        .map(|h| tree.node(h).unwrap().name().to_string())
        .collect();
    assert_eq!(tagged, vec!["Chase", "Hold"]);

    let idle_guid = template.node(NodeId(5)).unwrap().guid.clone();
    let idle = tree.find_node_by_guid(&idle_guid).unwrap();
    assert_eq!(tree.node(idle).unwrap().name(), "Idle");
}

#[test]
fn shared_bindings_resolve_to_the_same_property() {
    let tree = patrol().instantiate().unwrap();
    let raise = tree.find_node_by_path("Root/Brain/Chase/Raise").unwrap();
    let binding = &tree.node(raise).unwrap().bindings()[0];
    assert_eq!(binding.field, "target");
    assert_eq!(Some(binding.property), tree.blackboard().find_property("alert"));
}

#[test]
fn listeners_fire_in_execution_order() {
    let mut tree = patrol().instantiate().unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    for path in ["Root/Brain/Chase", "Root/Brain/Chase/Raise"] {
        let handle = tree.find_node_by_path(path).unwrap();
        let enter = Rc::clone(&events);
        tree.on_enter(handle, move |e| {
            enter.borrow_mut().push((e.name.to_string(), e.phase, e.result))
        });
        let exit = Rc::clone(&events);
        tree.on_exit(handle, move |e| {
            exit.borrow_mut().push((e.name.to_string(), e.phase, e.result))
        });
    }

    tree.tick(TickContext::new(1, 0.1));
    assert_eq!(
        *events.borrow(),
        vec![
            ("Chase".to_string(), NodePhase::Enter, BtStatus::Running),
            ("Raise".to_string(), NodePhase::Enter, BtStatus::Running),
            ("Raise".to_string(), NodePhase::Exit, BtStatus::Success),
        ]
    );
}

#[test]
fn missing_root_and_second_root_are_rejected() {
    let template = TreeTemplate::new();
    assert_eq!(
        template.instantiate().unwrap_err(),
        BuildError::Structural(StructuralError::MissingRoot)
    );

    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    assert_eq!(
        template.add_node(NodeDefinition::root()).unwrap_err(),
        StructuralError::MultipleRoots { existing: root }
    );
}

#[test]
fn arity_is_enforced() {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let gate = template
        .add_child(root, NodeDefinition::decorator("Invert", DecoratorKind::Inverter))
        .unwrap();
    assert!(matches!(
        template.instantiate(),
        Err(BuildError::Structural(StructuralError::MissingChild { node, .. })) if node == gate
    ));

    let leaf = template
        .add_child(gate, NodeDefinition::action("Leaf", Succeed))
        .unwrap();
    assert!(matches!(
        template.add_child(leaf, NodeDefinition::action("Nested", Succeed)),
        Err(StructuralError::TooManyChildren { max: 0, .. })
    ));
    assert!(matches!(
        template.add_child(gate, NodeDefinition::action("Second", Succeed)),
        Err(StructuralError::TooManyChildren { max: 1, .. })
    ));
    assert!(template.instantiate().is_ok());
}

#[test]
fn detached_nodes_and_cycles_are_rejected() {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let seq = template
        .add_child(root, NodeDefinition::sequence("Seq"))
        .unwrap();
    let stray = template.add_node(NodeDefinition::action("Stray", Succeed)).unwrap();
    assert!(matches!(
        template.validate(),
        Err(StructuralError::Orphaned { node, .. }) if node == stray
    ));

    template.connect(seq, stray).unwrap();
    assert!(template.validate().is_ok());
    assert_eq!(
        template.connect(seq, root),
        Err(StructuralError::RootHasParent { node: root })
    );
    assert_eq!(
        template.connect(stray, seq),
        Err(StructuralError::MultipleParents { node: seq })
    );

    // Edges injected without checks are still caught on validation.
    let defs = vec![
        NodeDefinition::root(),
        NodeDefinition::sequence("A"),
        NodeDefinition::sequence("B"),
        NodeDefinition::action("C", Succeed),
    ];
    let cyclic = TreeTemplate::from_edges(
        Default::default(),
        defs,
        &[(NodeId(0), NodeId(3)), (NodeId(1), NodeId(2)), (NodeId(2), NodeId(1))],
        Some(NodeId(0)),
    );
    assert_eq!(cyclic.validate(), Err(StructuralError::Cycle { node: NodeId(1) }));
}

#[test]
fn editing_operations_keep_the_template_consistent() {
    let mut template = patrol();
    let idle = NodeId(5);
    let brain = template.parent(idle).unwrap();

    template.disconnect(brain, idle).unwrap();
    assert_eq!(template.parent(idle), None);
    assert_eq!(
        template.disconnect(brain, idle),
        Err(StructuralError::NotConnected {
            parent: brain,
            child: idle
        })
    );

    let removed = template.remove_node(idle).unwrap();
    assert_eq!(removed.name, "Idle");
    assert!(template.validate().is_ok());
    assert_eq!(template.instantiate().unwrap().len(), 5);
}

#[test]
fn bindings_to_unknown_keys_fail_the_whole_build() {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    template
        .add_child(
            root,
            NodeDefinition::action("Write", SetProperty::new(1i64)).bind("target", "nope"),
        )
        .unwrap();

    match template.instantiate() {
        Err(BuildError::Binding { node, field, source }) => {
            assert_eq!(node, "Write");
            assert_eq!(field, "target");
            assert_eq!(source, BlackboardError::PropertyNotFound { key: "nope".into() });
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn condition_literals_are_checked_against_property_types() {
    let mut template = TreeTemplate::new();
    template.declare("name", String::from("guard")).unwrap();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let gate = template
        .add_child(
            root,
            NodeDefinition::decorator(
                "Gate",
                DecoratorKind::ConditionGate {
                    conditions: vec![Condition::new(
                        "name",
                        Comparison::GreaterThan,
                        BbValue::Text("a".into()),
                    )],
                },
            ),
        )
        .unwrap();
    template
        .add_child(gate, NodeDefinition::action("S", Succeed))
        .unwrap();

    assert!(matches!(
        template.instantiate(),
        Err(BuildError::Binding {
            source: BlackboardError::UnsupportedComparison { .. },
            ..
        })
    ));
}

#[test]
fn until_for_running_is_a_config_error() {
    let mut template = TreeTemplate::new();
    let root = template.add_node(NodeDefinition::root()).unwrap();
    let until = template
        .add_child(
            root,
            NodeDefinition::decorator(
                "Until",
                DecoratorKind::UntilFor {
                    target: BtStatus::Running,
                },
            ),
        )
        .unwrap();
    template
        .add_child(until, NodeDefinition::action("S", Succeed))
        .unwrap();
    assert!(matches!(
        template.validate(),
        Err(StructuralError::InvalidNodeConfig { .. })
    ));
}
