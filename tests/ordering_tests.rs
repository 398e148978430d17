use persistlite::{
    ColumnType, EntityRegistry, EntityType, PersistError, dependency_order, import_order,
    ordering::has_foreign_key_dependency,
};
use rand::{Rng, seq::SliceRandom};


fn names(order: &[&EntityType]) -> Vec<String> {
    order.iter().map(|e| e.name.clone()).collect()
}

#[test]
fn test_dependents_come_before_their_references() {
    let registry = EntityRegistry::from_entities([
        EntityType::new("Account").column("name", ColumnType::Text),
        EntityType::new("Build").foreign_key("account", "Account"),
    ])
    .unwrap();
    let order = dependency_order(&registry).unwrap();
    assert_eq!(names(&order), ["DataVersion", "Build", "Account"]);

    let import = import_order(&registry).unwrap();
    assert_eq!(names(&import), ["Account", "Build", "DataVersion"]);
}

#[test]
fn test_fixture_schema_order_is_stable() {
    let registry = fixtures::ci_registry();
    let first = names(&dependency_order(&registry).unwrap());
    let second = names(&dependency_order(&registry).unwrap());
    assert_eq!(first, second);
    assert_eq!(
        first,
        ["DataVersion", "BuildStep", "Build", "Project", "Account"]
    );
}

#[test]
fn test_transitive_dependency_is_respected() {
    // Registered in the opposite of the required order.
    let registry = EntityRegistry::from_entities([
        EntityType::new("A"),
        EntityType::new("B").foreign_key("a", "A"),
        EntityType::new("C").foreign_key("b", "B"),
    ])
    .unwrap();
    let a = registry.get("A").unwrap();
    let c = registry.get("C").unwrap();
    assert!(has_foreign_key_dependency(&registry, c, a));
    assert!(!has_foreign_key_dependency(&registry, a, c));
    assert_eq!(
        names(&dependency_order(&registry).unwrap()),
        ["DataVersion", "C", "B", "A"]
    );
}

#[test]
fn test_self_reference_is_not_a_dependency() {
    let registry = EntityRegistry::from_entities([EntityType::new("Step")
        .column("name", ColumnType::Text)
        .optional_foreign_key("parent", "Step")])
    .unwrap();
    let step = registry.get("Step").unwrap();
    assert!(!has_foreign_key_dependency(&registry, step, step));
    assert_eq!(
        names(&dependency_order(&registry).unwrap()),
        ["DataVersion", "Step"]
    );
}

#[test]
fn test_cycle_is_reported_as_configuration_error() {
    let registry = EntityRegistry::from_entities([
        EntityType::new("Left").foreign_key("right", "Right"),
        EntityType::new("Right").foreign_key("left", "Left"),
    ])
    .unwrap();
    match dependency_order(&registry) {
        Err(PersistError::ConfigurationError(message)) => {
            assert!(message.contains("cyclic"), "{message}");
            assert!(message.contains("Left") && message.contains("Right"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_unknown_reference_is_rejected_at_registration() {
    let err = EntityRegistry::from_entities([EntityType::new("Build").foreign_key("agent", "Agent")])
        .unwrap_err();
    assert!(matches!(err, PersistError::ConfigurationError(_)));
}

#[test]
fn fuzz_random_acyclic_schemas_respect_dependencies() {
    let iterations = fuzz_common::fuzz_iterations();
    let mut rng = fuzz_common::labeled_rng("ordering-fuzz");
    for _ in 0..iterations {
        let count = rng.gen_range(1..12);
        let mut entities: Vec<EntityType> = (0..count)
            .map(|i| {
                let mut entity = EntityType::new(format!("T{i}"));
                for j in 0..i {
                    if rng.gen_bool(0.3) {
                        entity = entity.foreign_key(format!("ref{j}"), format!("T{j}"));
                    }
                }
                entity
            })
            .collect();
        entities.shuffle(&mut rng);

        let registry = EntityRegistry::from_entities(entities).unwrap();
        let order = dependency_order(&registry).unwrap();
        assert_eq!(order.len(), registry.len());
        for (i, earlier) in order.iter().enumerate() {
            for later in &order[i + 1..] {
                assert!(
                    !has_foreign_key_dependency(&registry, later, earlier),
                    "{} depends on {} but comes after it",
                    later.name,
                    earlier.name
                );
            }
        }
    }
}
