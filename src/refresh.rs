use std::collections::HashMap;

use log::debug;

use crate::aggregate::Aggregation;
use crate::time::TeamId;

/// Handle for one refresh attempt. Minted by [`RefreshTracker::issue`]; a tag
/// is only honored while it is the newest one for its team.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RefreshTag {
    team: TeamId,
    generation: u64,
}

impl RefreshTag {
    pub fn team(&self) -> TeamId {
        self.team
    }
}

/// Issues monotonically increasing refresh generations per team.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    latest: HashMap<TeamId, u64>,
}

impl RefreshTracker {
    pub fn new() -> RefreshTracker {
        RefreshTracker::default()
    }

    /// Mints the next tag for `team`, superseding all earlier ones.
    pub fn issue(&mut self, team: TeamId) -> RefreshTag {
        let generation = self.latest.entry(team).or_insert(0);
        *generation += 1;
        RefreshTag {
            team,
            generation: *generation,
        }
    }

    /// Whether `tag` is still the newest issued for its team.
    pub fn is_latest(&self, tag: RefreshTag) -> bool {
        self.latest.get(&tag.team) == Some(&tag.generation)
    }
}

/// One consumer's view of aggregation results that may arrive out of order.
///
/// [`AggregationFeed::begin`] marks a refresh as the one the consumer now
/// wants; [`AggregationFeed::apply`] only keeps a result whose tag matches
/// that refresh. A result from an abandoned refresh is dropped, so switching
/// teams mid-flight never leaves the old team's numbers on display.
///
/// # Examples
/// ```
/// use treffzeit::aggregate::Aggregation;
/// use treffzeit::refresh::AggregationFeed;
/// use treffzeit::time::TeamId;
///
/// let mut feed = AggregationFeed::new();
/// let team = TeamId::new();
///
/// let stale = feed.begin(team);
/// let fresh = feed.begin(team);
///
/// assert!(!feed.apply(stale, Aggregation::empty()));
/// assert!(feed.apply(fresh, Aggregation::empty()));
/// assert_eq!(feed.team(), Some(team));
/// ```
#[derive(Debug, Default)]
pub struct AggregationFeed {
    tracker: RefreshTracker,
    active: Option<RefreshTag>,
    current: Option<(TeamId, Aggregation)>,
}

impl AggregationFeed {
    pub fn new() -> AggregationFeed {
        AggregationFeed::default()
    }

    /// Starts a refresh for `team` and returns its tag. Switching to a
    /// different team drops whatever was on display.
    pub fn begin(&mut self, team: TeamId) -> RefreshTag {
        if self.current.as_ref().map(|(showing, _)| *showing) != Some(team) {
            self.current = None;
        }
        let tag = self.tracker.issue(team);
        self.active = Some(tag);
        tag
    }

    /// Installs `aggregation` if `tag` is still the active refresh. Returns
    /// whether the result was kept.
    pub fn apply(&mut self, tag: RefreshTag, aggregation: Aggregation) -> bool {
        if self.active != Some(tag) {
            debug!("discarding stale aggregation for team {}", tag.team());
            return false;
        }
        self.current = Some((tag.team(), aggregation));
        true
    }

    /// Team whose aggregation is currently on display, if any.
    pub fn team(&self) -> Option<TeamId> {
        self.current.as_ref().map(|(team, _)| *team)
    }

    pub fn aggregation(&self) -> Option<&Aggregation> {
        self.current.as_ref().map(|(_, aggregation)| aggregation)
    }
}
