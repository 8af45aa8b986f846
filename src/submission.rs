use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::time::{MemberId, TeamId};

/// Whether a team's recommendation side effect has fired. A team moves to
/// `Triggered` at most once and never back.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriggerState {
    NotTriggered,
    Triggered,
}

/// One member's submission flag on one team, as reported to callers.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub team: TeamId,
    pub member: MemberId,
    pub submitted: bool,
}

/// Tracks who has finalized their availability per team.
///
/// Submission is an explicit act, recorded here as a flag; declaring ranges
/// alone never counts as submitting. The flag only ever moves from false to
/// true, so [`SubmissionCoordinator::ensure_record`] is safe to call on
/// every declaration.
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
    records: HashMap<TeamId, HashMap<MemberId, bool>>,
}

impl SubmissionCoordinator {
    pub fn new() -> SubmissionCoordinator {
        SubmissionCoordinator::default()
    }

    /// Makes sure a flag exists for `member` on `team`, starting unsubmitted.
    /// A flag already set stays set.
    pub fn ensure_record(&mut self, team: TeamId, member: MemberId) {
        self.records
            .entry(team)
            .or_default()
            .entry(member)
            .or_insert(false);
    }

    /// Flags `member` as submitted on `team`. Idempotent.
    pub fn mark_submitted(&mut self, team: TeamId, member: MemberId) {
        self.records.entry(team).or_default().insert(member, true);
    }

    pub fn has_submitted(&self, team: TeamId, member: MemberId) -> bool {
        self.records
            .get(&team)
            .and_then(|members| members.get(&member))
            .copied()
            .unwrap_or(false)
    }

    /// Whether every listed member has submitted. A team with no members is
    /// never fully submitted.
    pub fn is_fully_submitted(&self, team: TeamId, members: &[MemberId]) -> bool {
        !members.is_empty()
            && members
                .iter()
                .all(|member| self.has_submitted(team, *member))
    }

    /// Current flags for one team, ordered by member id.
    pub fn records(&self, team: TeamId) -> Vec<SubmissionRecord> {
        self.records
            .get(&team)
            .into_iter()
            .flatten()
            .map(|(member, submitted)| SubmissionRecord {
                team,
                member: *member,
                submitted: *submitted,
            })
            .sorted_unstable_by_key(|record| record.member)
            .collect()
    }
}
