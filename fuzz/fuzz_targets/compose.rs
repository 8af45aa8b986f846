#![no_main]
use libfuzzer_sys::fuzz_target;
use treffzeit::config::GridConfig;
use treffzeit::recommend::compose;
use treffzeit::slot::{build_slot_set, SlotSet};
use treffzeit::time::{MemberId, Scope, TimeRange};

fuzz_target!(|optimal: SlotSet| {
    let config = GridConfig::default();
    let blocks = compose(&optimal, &config);

    for pair in blocks.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        assert!(
            (left.day, left.start_minute) < (right.day, right.start_minute),
            "Blocks must be ordered by day and start"
        );
        if left.day == right.day {
            assert!(
                left.end_minute < right.start_minute,
                "Blocks on one day must be separated by a gap"
            );
        }
    }

    let mut covered = 0usize;
    for block in &blocks {
        assert!(block.duration_minutes() >= config.interval_minutes);
        assert_eq!(block.duration_minutes() % config.interval_minutes, 0);
        covered += usize::from(block.duration_minutes() / config.interval_minutes);
    }
    assert_eq!(
        covered,
        optimal.len(),
        "Blocks must cover every slot exactly once"
    );

    // Slicing the blocks back up reproduces the slot set.
    let owner = MemberId::new();
    let ranges: Vec<TimeRange> = blocks
        .iter()
        .map(|block| {
            TimeRange::new(
                owner,
                Scope::Personal,
                block.day,
                block.start_minute,
                block.end_minute,
            )
        })
        .collect();
    assert_eq!(build_slot_set(&ranges, &config), optimal);
});
