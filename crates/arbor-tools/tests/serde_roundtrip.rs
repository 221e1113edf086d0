#![cfg(feature = "serde")]

use arbor_tools::{tags, TraceEvent, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, tags::NODE_ENTER).with_a(1).with_b(0),
            TraceEvent::new(2, tags::NODE_ABORT).with_a(4).with_b(2),
            TraceEvent::new(3, tags::TREE_RESULT).with_a(1),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}
