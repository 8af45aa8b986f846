#![no_main]
use libfuzzer_sys::fuzz_target;
use treffzeit::aggregate::aggregate;
use treffzeit::slot::SlotSet;

fuzz_target!(|member_sets: Vec<SlotSet>| {
    let aggregation = aggregate(&member_sets);
    let members = member_sets.len();

    assert_eq!(aggregation.member_count(), members);

    for (key, count) in aggregation.slot_counts() {
        assert!(
            *count >= 1 && *count <= members,
            "Count must stay within 1..=member_count"
        );
        assert_eq!(
            aggregation.is_optimal(key),
            aggregation.optimal_slots().contains(key),
            "Counts and the intersection must agree on optimality"
        );
    }

    for key in aggregation.optimal_slots() {
        assert!(
            member_sets.iter().all(|set| set.contains(key)),
            "Optimal slots must appear in every member set"
        );
    }

    if members == 0 || member_sets.iter().any(SlotSet::is_empty) {
        assert!(
            aggregation.optimal_slots().is_empty(),
            "A member with nothing declared leaves no optimal slots"
        );
    }
});
