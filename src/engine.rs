use core::fmt;
use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::{aggregate, Aggregation};
use crate::config::{ConfigError, GridConfig};
use crate::recommend::{compose, publish_recommendation, RecommendationBlock};
use crate::slot::{build_slot_set, SlotSet};
use crate::submission::SubmissionCoordinator;
use crate::time::{
    scan_overlaps, validate_candidate, MemberId, RangeError, RangeId, Scope, TeamId, TimeRange,
    Weekday,
};

/// Identifies a post on a team board.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostId(Uuid);

impl PostId {
    pub fn new() -> PostId {
        PostId(Uuid::new_v4())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failures reported by the backing collaborators.
#[derive(Serialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Anything an engine operation can refuse with.
#[derive(Serialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("member {member} is not an active member of team {team}")]
    NotAMember { team: TeamId, member: MemberId },
}

/// Source of team membership.
pub trait Roster {
    /// Members currently on `team`. Someone who left is not listed, even if
    /// their declarations are still stored.
    fn active_members(&self, team: TeamId) -> Result<Vec<MemberId>, StoreError>;
}

/// Persistence for declared ranges and the per-team trigger flag.
pub trait RangeStore {
    /// A member's ranges in one scope, ordered by day then start.
    fn fetch_ranges(&self, member: MemberId, scope: Scope) -> Result<Vec<TimeRange>, StoreError>;

    fn save_range(&mut self, range: TimeRange) -> Result<(), StoreError>;

    /// Removes one of `member`'s ranges. A range owned by someone else is
    /// reported as not found, the same as an unknown id.
    fn delete_range(&mut self, member: MemberId, id: RangeId) -> Result<(), StoreError>;

    /// Atomically claims the right to fire `team`'s one recommendation.
    /// Returns true for exactly one caller over the team's lifetime; every
    /// later claim returns false. A refused claim is not an error.
    fn try_claim_trigger(&mut self, team: TeamId) -> Result<bool, StoreError>;
}

/// Destination for the recommendation post.
pub trait PostBoard {
    fn create_post(&mut self, team: TeamId, title: &str, body: &str)
        -> Result<PostId, StoreError>;
}

/// What one submission call did.
///
/// `blocks` and `post` are only filled on the call that fired the trigger;
/// `post` stays `None` when the team had no common availability to post.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub triggered: bool,
    pub blocks: Option<Vec<RecommendationBlock>>,
    pub post: Option<PostId>,
}

/// Coordinates declarations, aggregation, and the one-time recommendation
/// for any number of teams, on top of caller-supplied collaborators.
///
/// # Examples
/// ```
/// use treffzeit::config::GridConfig;
/// use treffzeit::engine::Engine;
/// use treffzeit::memory::{MemoryPosts, MemoryRoster, MemoryStore};
/// use treffzeit::time::{MemberId, Scope, Weekday};
///
/// let mut roster = MemoryRoster::new();
/// let team = roster.create_board(4);
/// let anna = MemberId::new();
/// let ben = MemberId::new();
/// roster.join(team, anna).unwrap();
/// roster.join(team, ben).unwrap();
/// roster.activate(team).unwrap();
///
/// let mut engine = Engine::new(
///     GridConfig::default(),
///     roster,
///     MemoryStore::new(),
///     MemoryPosts::new(),
/// )
/// .unwrap();
///
/// engine
///     .add_time_range(anna, Scope::Team(team), Weekday::Friday, 600, 660)
///     .unwrap();
/// engine
///     .add_time_range(ben, Scope::Team(team), Weekday::Friday, 630, 690)
///     .unwrap();
///
/// let partial = engine.submit_availability(team, anna).unwrap();
/// assert!(!partial.triggered);
///
/// let full = engine.submit_availability(team, ben).unwrap();
/// assert!(full.triggered);
/// assert!(full.post.is_some());
///
/// // The overlap, 10:30..11:00, is three slots on the 10-minute grid.
/// assert_eq!(engine.aggregation(team).optimal_slots().len(), 3);
/// ```
pub struct Engine<R, S, B> {
    config: GridConfig,
    roster: R,
    store: S,
    posts: B,
    submissions: SubmissionCoordinator,
    cache: HashMap<TeamId, Aggregation>,
}

impl<R, S, B> Engine<R, S, B>
where
    R: Roster,
    S: RangeStore,
    B: PostBoard,
{
    /// Builds an engine after checking the grid is usable.
    pub fn new(
        config: GridConfig,
        roster: R,
        store: S,
        posts: B,
    ) -> Result<Engine<R, S, B>, ConfigError> {
        config.validate()?;
        Ok(Engine {
            config,
            roster,
            store,
            posts,
            submissions: SubmissionCoordinator::new(),
            cache: HashMap::new(),
        })
    }

    /// Declares a new range for `owner`, validated against their existing
    /// declarations in the same scope.
    pub fn add_time_range(
        &mut self,
        owner: MemberId,
        scope: Scope,
        day: Weekday,
        start_minute: u16,
        end_minute: u16,
    ) -> Result<RangeId, EngineError> {
        let candidate = TimeRange::new(owner, scope, day, start_minute, end_minute);
        let existing = self.store.fetch_ranges(owner, scope)?;
        validate_candidate(&existing, &candidate)?;
        self.store.save_range(candidate)?;

        // Declaring for a team opens that member's submission record, still
        // unsubmitted.
        if let Scope::Team(team) = scope {
            self.submissions.ensure_record(team, owner);
        }

        debug!(
            "member {} declared {} {}..{} in {:?}",
            owner, day, start_minute, end_minute, scope
        );
        Ok(candidate.id)
    }

    /// Deletes one of `owner`'s ranges. Removing someone else's range is
    /// refused as not found.
    pub fn remove_time_range(&mut self, owner: MemberId, id: RangeId) -> Result<(), EngineError> {
        self.store.delete_range(owner, id)?;
        debug!("member {} removed range {}", owner, id);
        Ok(())
    }

    /// The team's current aggregation.
    ///
    /// Never fails: when a collaborator is unreachable the last good
    /// aggregation is served again, and a team that has never aggregated
    /// gets the empty one.
    pub fn aggregation(&mut self, team: TeamId) -> Aggregation {
        match self.compute_aggregation(team) {
            Ok(aggregation) => {
                self.cache.insert(team, aggregation.clone());
                aggregation
            }
            Err(error) => {
                warn!("aggregation refresh for team {} failed: {}", team, error);
                self.cache
                    .get(&team)
                    .cloned()
                    .unwrap_or_else(Aggregation::empty)
            }
        }
    }

    fn compute_aggregation(&self, team: TeamId) -> Result<Aggregation, StoreError> {
        let members = self.roster.active_members(team)?;
        let mut member_sets = Vec::with_capacity(members.len());
        for member in members {
            member_sets.push(self.member_slot_set(member, team)?);
        }
        Ok(aggregate(&member_sets))
    }

    fn member_slot_set(&self, member: MemberId, team: TeamId) -> Result<SlotSet, StoreError> {
        let ranges = self.store.fetch_ranges(member, Scope::Team(team))?;
        match scan_overlaps(&ranges) {
            Ok(()) => Ok(build_slot_set(&ranges, &self.config)),
            Err(error) => {
                warn!(
                    "member {} has conflicting stored ranges, treated as unavailable: {}",
                    member, error
                );
                Ok(SlotSet::new())
            }
        }
    }

    /// Marks `member`'s availability on `team` as final. When this makes the
    /// submission the team's last missing one, claims the trigger and posts
    /// the recommendation.
    pub fn submit_availability(
        &mut self,
        team: TeamId,
        member: MemberId,
    ) -> Result<SubmitOutcome, EngineError> {
        let members = self.roster.active_members(team)?;
        if !members.contains(&member) {
            return Err(EngineError::NotAMember { team, member });
        }

        self.submissions.mark_submitted(team, member);

        if !self.submissions.is_fully_submitted(team, &members) {
            return Ok(SubmitOutcome {
                triggered: false,
                blocks: None,
                post: None,
            });
        }

        // The claim comes before the post. A post that then fails is not
        // retried, keeping the side effect at-most-once.
        if !self.store.try_claim_trigger(team)? {
            return Ok(SubmitOutcome {
                triggered: false,
                blocks: None,
                post: None,
            });
        }

        info!("team {} fully submitted, composing recommendation", team);

        let aggregation = self.aggregation(team);
        let blocks = compose(aggregation.optimal_slots(), &self.config);
        let post = publish_recommendation(&mut self.posts, team, &blocks)?;

        Ok(SubmitOutcome {
            triggered: true,
            blocks: Some(blocks),
            post,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn submissions(&self) -> &SubmissionCoordinator {
        &self.submissions
    }

    pub fn roster(&self) -> &R {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut R {
        &mut self.roster
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn posts(&self) -> &B {
        &self.posts
    }
}
