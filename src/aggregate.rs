use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;

use crate::config::GridConfig;
use crate::slot::{SlotKey, SlotSet};
use crate::time::Weekday;

/// One team's folded availability: how many members cover each slot, and the
/// slots covered by everyone.
///
/// `count(key)` never exceeds `member_count`, and equals it exactly on the
/// optimal slots. Built by [`aggregate`]; an `Aggregation` is a snapshot and
/// does not observe later declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    slot_counts: BTreeMap<SlotKey, usize>,
    optimal_slots: SlotSet,
    member_count: usize,
}

impl Aggregation {
    /// The aggregation of a team nobody has declared for. No slot is counted
    /// and no slot is optimal.
    pub fn empty() -> Aggregation {
        Aggregation::default()
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn slot_counts(&self) -> &BTreeMap<SlotKey, usize> {
        &self.slot_counts
    }

    pub fn optimal_slots(&self) -> &SlotSet {
        &self.optimal_slots
    }

    /// How many members cover `key`. Slots nobody covers count zero.
    pub fn count(&self, key: &SlotKey) -> usize {
        self.slot_counts.get(key).copied().unwrap_or(0)
    }

    /// Whether every member covers `key`. Never true for a memberless team.
    pub fn is_optimal(&self, key: &SlotKey) -> bool {
        self.member_count > 0 && self.count(key) == self.member_count
    }

    /// Total minutes of full-team availability across the week.
    pub fn optimal_duration_minutes(&self, config: &GridConfig) -> u32 {
        self.optimal_slots.len() as u32 * u32::from(config.interval_minutes)
    }

    /// Number of optimal slots falling inside one hour of one day.
    pub fn optimal_in_hour(&self, day: Weekday, hour: u8) -> usize {
        self.optimal_slots
            .range(SlotKey::new(day, hour, 0)..=SlotKey::new(day, hour, 59))
            .count()
    }

    /// Fraction of one day-hour that is optimal, between 0.0 and 1.0.
    pub fn hour_coverage(&self, day: Weekday, hour: u8, config: &GridConfig) -> f64 {
        self.optimal_in_hour(day, hour) as f64 / f64::from(config.slots_per_hour())
    }
}

/// Folds per-member slot sets into an [`Aggregation`].
///
/// Every occurrence of a key across the sets adds one to its count. The
/// optimal set is the intersection of all sets, computed by probing the
/// smallest set against the rest.
///
/// # Examples
/// ```
/// use treffzeit::aggregate::aggregate;
/// use treffzeit::slot::{SlotKey, SlotSet};
/// use treffzeit::time::Weekday;
///
/// let nine = SlotKey::new(Weekday::Monday, 9, 0);
/// let half = SlotKey::new(Weekday::Monday, 9, 30);
///
/// let a: SlotSet = vec![nine, half].into_iter().collect();
/// let b: SlotSet = vec![half].into_iter().collect();
///
/// let result = aggregate(&[a, b]);
/// assert_eq!(result.count(&nine), 1);
/// assert!(result.is_optimal(&half));
/// assert_eq!(result.optimal_slots().len(), 1);
/// ```
pub fn aggregate(member_sets: &[SlotSet]) -> Aggregation {
    let mut slot_counts: BTreeMap<SlotKey, usize> = BTreeMap::new();
    for set in member_sets {
        for key in set {
            *slot_counts.entry(*key).or_insert(0) += 1;
        }
    }

    let optimal_slots = intersect_all(member_sets);

    debug!(
        "aggregated {} member sets: {} slots counted, {} optimal",
        member_sets.len(),
        slot_counts.len(),
        optimal_slots.len()
    );

    Aggregation {
        slot_counts,
        optimal_slots,
        member_count: member_sets.len(),
    }
}

fn intersect_all(member_sets: &[SlotSet]) -> SlotSet {
    let sorted = member_sets
        .iter()
        .sorted_unstable_by_key(|set| set.len())
        .collect_vec();

    match sorted.split_first() {
        // The pivot is the smallest set, so one member who declared nothing
        // empties the whole intersection.
        Some((pivot, rest)) => pivot
            .iter()
            .filter(|key| rest.iter().all(|set| set.contains(*key)))
            .copied()
            .collect(),
        None => SlotSet::new(),
    }
}
