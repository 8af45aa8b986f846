use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::time::{TimeRange, Weekday};

/// One cell of the weekly grid: a day, an hour, and a minute offset into that
/// hour. Keys order by day, then hour, then minute, so a `SlotSet` iterates in
/// week order.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub day: Weekday,
    pub hour: u8,
    pub minute: u8,
}

impl SlotKey {
    pub fn new(day: Weekday, hour: u8, minute: u8) -> SlotKey {
        SlotKey { day, hour, minute }
    }

    pub fn from_day_minute(day: Weekday, minute_of_day: u16) -> SlotKey {
        SlotKey {
            day,
            hour: (minute_of_day / 60) as u8,
            minute: (minute_of_day % 60) as u8,
        }
    }

    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for SlotKey {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        // Constrain keys to the default grid so fuzzed sets stay inside one
        // keyspace and intersect often enough to be interesting.
        let day = Weekday::ALL[usize::from(u.arbitrary::<u8>()? % 7)];
        let hour = 9 + u.arbitrary::<u8>()? % 12;
        let minute = (u.arbitrary::<u8>()? % 6) * 10;
        Ok(SlotKey { day, hour, minute })
    }
}

/// A member's discretized availability for one team.
pub type SlotSet = BTreeSet<SlotKey>;

/// Slices declared ranges into grid slots.
///
/// Each range is walked from its own start in interval steps, so a start that
/// is not aligned to the grid phases every slot it produces; a trailing
/// remainder shorter than one interval yields nothing. Slots are dropped
/// one by one when they fall on a disallowed day or outside the daily window.
///
/// # Examples
/// ```
/// use treffzeit::config::GridConfig;
/// use treffzeit::slot::build_slot_set;
/// use treffzeit::time::{MemberId, Scope, TimeRange, Weekday};
///
/// let owner = MemberId::new();
/// let config = GridConfig::default();
/// let ranges = vec![TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 570)];
///
/// // 09:00..09:30 on a 10-minute grid covers exactly three slots.
/// let slots = build_slot_set(&ranges, &config);
/// assert_eq!(slots.len(), 3);
/// assert!(slots.iter().all(|key| key.day == Weekday::Monday && key.hour == 9));
/// ```
pub fn build_slot_set(ranges: &[TimeRange], config: &GridConfig) -> SlotSet {
    let interval = config.interval_minutes;
    let mut slots = SlotSet::new();
    if interval == 0 {
        return slots;
    }
    let window_start = config.window_start_minute();
    let window_end = config.window_end_minute();
    for range in ranges {
        if !config.day_allowed(range.day) {
            continue;
        }
        let end = range.end_minute.min(window_end);
        let mut minute = range.start_minute;
        while minute + interval <= end {
            if minute >= window_start {
                slots.insert(SlotKey::from_day_minute(range.day, minute));
            }
            minute += interval;
        }
    }
    slots
}
