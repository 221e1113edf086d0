use arbor_core::{BbKey, BbType, BbValue, Blackboard, BlackboardError};

const HEALTH: BbKey<i64> = BbKey::new("health");
const NAME: BbKey<String> = BbKey::new("name");

#[test]
fn blackboard_insert_get_set() {
    let mut bb = Blackboard::new();
    assert!(!bb.contains("health"));

    let health = bb.insert("health", 100i64).unwrap();
    bb.insert("name", "grunt".to_string()).unwrap();

    assert_eq!(bb.get(HEALTH), Ok(100));
    assert_eq!(bb.get(NAME).as_deref(), Ok("grunt"));

    bb.set(HEALTH, 42).unwrap();
    assert_eq!(bb.read::<i64>(health), Ok(42));
    assert_eq!(bb.find_property("health"), Some(health));
}

#[test]
fn blackboard_rejects_duplicate_keys() {
    let mut bb = Blackboard::new();
    bb.insert("speed", 1.5f64).unwrap();
    assert_eq!(
        bb.insert("speed", 2.0f64),
        Err(BlackboardError::DuplicateKey {
            key: "speed".to_string()
        })
    );
    assert_eq!(bb.len(), 1);
}

#[test]
fn blackboard_reports_missing_and_mismatched_properties() {
    let mut bb = Blackboard::new();
    bb.insert("health", 10i64).unwrap();

    assert_eq!(
        bb.get(BbKey::<bool>::new("alive")),
        Err(BlackboardError::PropertyNotFound {
            key: "alive".to_string()
        })
    );
    assert_eq!(
        bb.get_by_name::<f64>("health"),
        Err(BlackboardError::PropertyTypeMismatch {
            key: "health".to_string(),
            expected: BbType::Float,
            found: BbType::Int,
        })
    );
    assert!(bb.set_by_name("health", true).is_err());
    assert_eq!(bb.get(HEALTH), Ok(10));
}

#[test]
fn cloned_blackboard_is_independent() {
    let mut original = Blackboard::new();
    original.insert("health", 10i64).unwrap();
    original.insert_value("pos", BbValue::Vector([1.0, 2.0, 3.0])).unwrap();

    let mut copy = original.clone();
    copy.set(HEALTH, 1).unwrap();

    assert_eq!(original.get(HEALTH), Ok(10));
    assert_eq!(copy.get(HEALTH), Ok(1));
    assert_eq!(copy.find_property("pos"), original.find_property("pos"));
}
