use log::info;
use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::engine::{PostBoard, PostId, StoreError};
use crate::slot::{SlotKey, SlotSet};
use crate::time::{TeamId, Weekday};

/// Tag marking a post as engine-generated rather than member-written.
pub const AUTO_POST_TAG: &str = "[Auto]";

/// Title of the one recommendation post a team receives.
pub const RECOMMENDATION_TITLE: &str = "[Auto] Recommended meeting times";

/// A maximal contiguous run of optimal slots, half-open on
/// `[start_minute, end_minute)` within one day.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RecommendationBlock {
    pub day: Weekday,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl RecommendationBlock {
    pub fn duration_minutes(&self) -> u16 {
        self.end_minute.saturating_sub(self.start_minute)
    }
}

/// Merges an optimal slot set into contiguous blocks, ordered by day then
/// start. Runs break at day boundaries and wherever consecutive slots are
/// more than one interval apart.
///
/// # Examples
/// ```
/// use treffzeit::config::GridConfig;
/// use treffzeit::recommend::compose;
/// use treffzeit::slot::{SlotKey, SlotSet};
/// use treffzeit::time::Weekday;
///
/// let optimal: SlotSet = vec![
///     SlotKey::new(Weekday::Monday, 9, 30),
///     SlotKey::new(Weekday::Monday, 9, 40),
///     SlotKey::new(Weekday::Monday, 9, 50),
///     SlotKey::new(Weekday::Tuesday, 12, 0),
/// ]
/// .into_iter()
/// .collect();
///
/// let blocks = compose(&optimal, &GridConfig::default());
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0].start_minute, 570);
/// assert_eq!(blocks[0].end_minute, 600);
/// assert_eq!(blocks[1].duration_minutes(), 10);
/// ```
pub fn compose(optimal: &SlotSet, config: &GridConfig) -> Vec<RecommendationBlock> {
    let interval = config.interval_minutes;
    let (run, mut blocks) =
        optimal
            .iter()
            .fold((None, Vec::new()), |(run, mut blocks), &key| match run {
                None => (Some((key, key)), blocks),
                Some((first, prev)) => {
                    if continues(prev, key, interval) {
                        (Some((first, key)), blocks)
                    } else {
                        blocks.push(block_from(first, prev, interval));
                        (Some((key, key)), blocks)
                    }
                }
            });

    if let Some((first, last)) = run {
        blocks.push(block_from(first, last, interval));
    }

    blocks
}

fn continues(prev: SlotKey, next: SlotKey, interval: u16) -> bool {
    prev.day == next.day && next.minute_of_day() == prev.minute_of_day() + interval
}

fn block_from(first: SlotKey, last: SlotKey, interval: u16) -> RecommendationBlock {
    RecommendationBlock {
        day: first.day,
        start_minute: first.minute_of_day(),
        end_minute: last.minute_of_day() + interval,
    }
}

pub fn format_minute(minute_of_day: u16) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Renders the post body, one line per block.
pub fn render_body(blocks: &[RecommendationBlock]) -> String {
    let mut body = String::from("Times when every member of the team is available:");
    for block in blocks {
        body.push_str(&format!(
            "\n- {} {}-{}",
            block.day,
            format_minute(block.start_minute),
            format_minute(block.end_minute)
        ));
    }
    body
}

/// Writes the recommendation post for `team`, or suppresses it when there is
/// nothing to recommend. Returns the created post's id, `None` when no post
/// was made.
pub fn publish_recommendation<B: PostBoard>(
    board: &mut B,
    team: TeamId,
    blocks: &[RecommendationBlock],
) -> Result<Option<PostId>, StoreError> {
    if blocks.is_empty() {
        info!(
            "no common availability for team {}, recommendation post suppressed",
            team
        );
        return Ok(None);
    }

    let body = render_body(blocks);
    let post = board.create_post(team, RECOMMENDATION_TITLE, &body)?;
    info!("posted recommendation {} for team {}", post, team);
    Ok(Some(post))
}
