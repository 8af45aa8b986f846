use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::engine::{PostBoard, PostId, RangeStore, Roster, StoreError};
use crate::submission::TriggerState;
use crate::time::{MemberId, RangeId, Scope, TeamId, TimeRange};

/// One team board as the in-memory roster keeps it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamBoard {
    pub id: TeamId,
    pub member_ids: Vec<MemberId>,
    pub max_members: usize,
    pub activated: bool,
}

/// In-memory [`Roster`]: boards fill up, activate, and lose members, all
/// without leaving the process. Members only count as active once their
/// board is activated.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    boards: HashMap<TeamId, TeamBoard>,
}

impl MemoryRoster {
    pub fn new() -> MemoryRoster {
        MemoryRoster::default()
    }

    pub fn create_board(&mut self, max_members: usize) -> TeamId {
        let id = TeamId::new();
        self.boards.insert(
            id,
            TeamBoard {
                id,
                member_ids: Vec::new(),
                max_members,
                activated: false,
            },
        );
        id
    }

    pub fn join(&mut self, team: TeamId, member: MemberId) -> Result<(), StoreError> {
        let board = self
            .boards
            .get_mut(&team)
            .ok_or_else(|| StoreError::NotFound(format!("team {}", team)))?;
        if board.member_ids.contains(&member) {
            return Err(StoreError::Conflict(format!(
                "member {} already on team {}",
                member, team
            )));
        }
        if board.member_ids.len() >= board.max_members {
            return Err(StoreError::Conflict(format!("team {} is full", team)));
        }
        board.member_ids.push(member);
        Ok(())
    }

    pub fn leave(&mut self, team: TeamId, member: MemberId) -> Result<(), StoreError> {
        let board = self
            .boards
            .get_mut(&team)
            .ok_or_else(|| StoreError::NotFound(format!("team {}", team)))?;
        let position = board
            .member_ids
            .iter()
            .position(|id| *id == member)
            .ok_or_else(|| StoreError::NotFound(format!("member {} on team {}", member, team)))?;
        board.member_ids.remove(position);
        Ok(())
    }

    pub fn activate(&mut self, team: TeamId) -> Result<(), StoreError> {
        let board = self
            .boards
            .get_mut(&team)
            .ok_or_else(|| StoreError::NotFound(format!("team {}", team)))?;
        board.activated = true;
        Ok(())
    }

    pub fn board(&self, team: TeamId) -> Option<&TeamBoard> {
        self.boards.get(&team)
    }
}

impl Roster for MemoryRoster {
    fn active_members(&self, team: TeamId) -> Result<Vec<MemberId>, StoreError> {
        let board = self
            .boards
            .get(&team)
            .ok_or_else(|| StoreError::NotFound(format!("team {}", team)))?;
        if !board.activated {
            return Ok(Vec::new());
        }
        Ok(board.member_ids.clone())
    }
}

/// In-memory [`RangeStore`] with a switch to simulate losing the backend.
///
/// The trigger claim is a plain set insert, which is exactly the test-and-set
/// the engine needs: the first insert for a team returns true, every later
/// one false.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ranges: HashMap<(MemberId, Scope), Vec<TimeRange>>,
    triggered: HashSet<TeamId>,
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// While offline, every store operation fails with
    /// [`StoreError::Unavailable`]. Stored data survives the outage.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn trigger_state(&self, team: TeamId) -> TriggerState {
        if self.triggered.contains(&team) {
            TriggerState::Triggered
        } else {
            TriggerState::NotTriggered
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }
}

impl RangeStore for MemoryStore {
    fn fetch_ranges(&self, member: MemberId, scope: Scope) -> Result<Vec<TimeRange>, StoreError> {
        self.check_online()?;
        let mut ranges = self
            .ranges
            .get(&(member, scope))
            .cloned()
            .unwrap_or_default();
        ranges.sort_unstable_by_key(|range| (range.day, range.start_minute));
        Ok(ranges)
    }

    fn save_range(&mut self, range: TimeRange) -> Result<(), StoreError> {
        self.check_online()?;
        self.ranges
            .entry((range.owner, range.scope))
            .or_default()
            .push(range);
        Ok(())
    }

    fn delete_range(&mut self, member: MemberId, id: RangeId) -> Result<(), StoreError> {
        self.check_online()?;
        for ((owner, _), ranges) in self.ranges.iter_mut() {
            if *owner != member {
                continue;
            }
            if let Some(position) = ranges.iter().position(|range| range.id == id) {
                ranges.remove(position);
                return Ok(());
            }
        }
        Err(StoreError::NotFound(format!(
            "range {} owned by {}",
            id, member
        )))
    }

    fn try_claim_trigger(&mut self, team: TeamId) -> Result<bool, StoreError> {
        self.check_online()?;
        Ok(self.triggered.insert(team))
    }
}

/// A post as the in-memory board records it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedPost {
    pub id: PostId,
    pub team: TeamId,
    pub title: String,
    pub body: String,
}

/// In-memory [`PostBoard`] that keeps every created post for inspection.
#[derive(Debug, Default)]
pub struct MemoryPosts {
    posts: Vec<CreatedPost>,
}

impl MemoryPosts {
    pub fn new() -> MemoryPosts {
        MemoryPosts::default()
    }

    pub fn posts(&self) -> &[CreatedPost] {
        &self.posts
    }
}

impl PostBoard for MemoryPosts {
    fn create_post(
        &mut self,
        team: TeamId,
        title: &str,
        body: &str,
    ) -> Result<PostId, StoreError> {
        let id = PostId::new();
        self.posts.push(CreatedPost {
            id,
            team,
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(id)
    }
}
