use core::fmt;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Identifies a team member. Minted by the account system; opaque here.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn new() -> MemberId {
        MemberId(Uuid::new_v4())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a team board. Minted by the board system; opaque here.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamId(Uuid);

impl TeamId {
    pub fn new() -> TeamId {
        TeamId(Uuid::new_v4())
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one declared time range. A range is never edited in place;
/// replacing one means deleting it and inserting a fresh id.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(Uuid);

impl RangeId {
    pub fn new() -> RangeId {
        RangeId(Uuid::new_v4())
    }
}

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Day of the week, Monday first.
///
/// # Examples
/// ```
/// use treffzeit::time::Weekday;
///
/// assert_eq!(Weekday::from_index(0), Some(Weekday::Monday));
/// assert_eq!(Weekday::from_index(6), Some(Weekday::Sunday));
/// assert_eq!(Weekday::from_index(7), None);
/// assert_eq!(Weekday::Wednesday.index(), 2);
/// ```
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn from_index(index: u8) -> Option<Weekday> {
        Weekday::ALL.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Namespace a declaration lives in. A member's general availability and the
/// availability they declare for one specific team never interact: ranges in
/// different scopes may overlap freely.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Personal,
    Team(TeamId),
}

/// One recurring weekly availability window, half-open on
/// `[start_minute, end_minute)` within a single day.
///
/// # Examples
/// ```
/// use treffzeit::time::{MemberId, Scope, TimeRange, Weekday};
///
/// let owner = MemberId::new();
/// let morning = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 9 * 60, 10 * 60);
/// let late = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 10 * 60, 11 * 60);
///
/// // Half-open ranges that only touch do not overlap.
/// assert!(!morning.overlaps(&late));
/// assert_eq!(morning.minutes(), 60);
/// ```
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub id: RangeId,
    pub owner: MemberId,
    pub scope: Scope,
    pub day: Weekday,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl TimeRange {
    /// Constructs a new range with a fresh id. Minute bounds are taken as
    /// given; [`validate_candidate`] decides whether they are acceptable.
    pub fn new(
        owner: MemberId,
        scope: Scope,
        day: Weekday,
        start_minute: u16,
        end_minute: u16,
    ) -> TimeRange {
        TimeRange {
            id: RangeId::new(),
            owner,
            scope,
            day,
            start_minute,
            end_minute,
        }
    }

    pub fn minutes(&self) -> u16 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    /// Whether two ranges share at least one minute. Ranges on different days
    /// or in different scopes never overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.day == other.day
            && self.scope == other.scope
            && self.start_minute < other.end_minute
            && self.end_minute > other.start_minute
    }
}

/// Rejected declarations.
#[derive(Serialize, Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum RangeError {
    #[error("a range must start before it ends and stay within one day, got minutes {start}..{end}")]
    InvalidRange { start: u16, end: u16 },
    #[error("range overlaps an existing {day} declaration in the same scope")]
    Overlap { day: Weekday, with: RangeId },
}

/// Decides whether `candidate` may join `existing`, which holds the declaring
/// member's current ranges in the same scope.
///
/// An empty or reversed candidate is rejected before any comparison; after
/// that, sharing any minute with an existing same-day same-scope range is a
/// conflict. Pure predicate: callers insert only after `Ok`.
///
/// # Examples
/// ```
/// use treffzeit::time::{validate_candidate, MemberId, RangeError, Scope, TimeRange, Weekday};
///
/// let owner = MemberId::new();
/// let existing = vec![TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600)];
///
/// let touching = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 660);
/// assert!(validate_candidate(&existing, &touching).is_ok());
///
/// let shared = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 570, 630);
/// assert!(matches!(
///     validate_candidate(&existing, &shared),
///     Err(RangeError::Overlap { .. })
/// ));
///
/// let reversed = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 540);
/// assert!(matches!(
///     validate_candidate(&existing, &reversed),
///     Err(RangeError::InvalidRange { .. })
/// ));
/// ```
pub fn validate_candidate(existing: &[TimeRange], candidate: &TimeRange) -> Result<(), RangeError> {
    if candidate.start_minute >= candidate.end_minute || candidate.end_minute > MINUTES_PER_DAY {
        return Err(RangeError::InvalidRange {
            start: candidate.start_minute,
            end: candidate.end_minute,
        });
    }
    if let Some(hit) = existing.iter().find(|range| range.overlaps(candidate)) {
        return Err(RangeError::Overlap {
            day: candidate.day,
            with: hit.id,
        });
    }
    Ok(())
}

/// Checks a stored set of ranges for pairwise conflicts.
///
/// Declarations are validated one by one on entry, but the store is an
/// external collaborator and may hand back anything; a set that conflicts
/// with itself is reported so the caller can suppress it.
pub fn scan_overlaps(ranges: &[TimeRange]) -> Result<(), RangeError> {
    if let Some((_, second)) = ranges
        .iter()
        .sorted_unstable_by_key(|range| (range.scope, range.day, range.start_minute))
        .tuple_windows()
        .find(|(a, b)| a.overlaps(b))
    {
        return Err(RangeError::Overlap {
            day: second.day,
            with: second.id,
        });
    }
    Ok(())
}
