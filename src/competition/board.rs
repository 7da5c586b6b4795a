use crate::model::{Member, Room, RoomId, Route, Score};
use crate::scoring::route_share;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// Competition ranking: tied totals share a rank, the next rank skips.
    pub rank: usize,
    pub member: Member,
    pub completed_routes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub room_id: RoomId,
    pub room_name: String,
    pub standard_line_score: u32,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub(crate) fn build(room: &Room, mut rows: Vec<(Member, usize)>) -> Self {
        rows.sort_by(|(a, _), (b, _)| leaderboard_order(a, b));

        let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(rows.len());
        for (i, (member, completed_routes)) in rows.into_iter().enumerate() {
            let rank = match entries.last() {
                Some(prev) if prev.member.total_score == member.total_score => prev.rank,
                _ => i + 1,
            };
            entries.push(LeaderboardEntry {
                rank,
                member,
                completed_routes,
            });
        }

        Self {
            room_id: room.id,
            room_name: room.name.clone(),
            standard_line_score: room.standard_line_score,
            entries,
        }
    }
}

/// Total descending, then name ascending.
fn leaderboard_order(a: &Member, b: &Member) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| a.name.cmp(&b.name))
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub route: Route,
    /// Normal-class completers sharing the route's L.
    pub completers: usize,
    pub custom_completers: usize,
    pub share: Decimal,
    /// Names of every completer, in roster order.
    pub completed_by: Vec<String>,
}

impl RouteSummary {
    pub(crate) fn build(route: Route, members: &[Member], scores: &[Score], line_score: u32) -> Self {
        let mut completers = 0;
        let mut custom_completers = 0;
        let mut completed_by = Vec::new();
        for member in members {
            let done = scores
                .iter()
                .any(|s| s.member_id == member.id && s.is_completed);
            if !done {
                continue;
            }
            if member.is_custom_calc {
                custom_completers += 1;
            } else {
                completers += 1;
            }
            completed_by.push(member.name.clone());
        }

        Self {
            route,
            completers,
            custom_completers,
            share: route_share(line_score, completers),
            completed_by,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteBoard {
    pub room_id: RoomId,
    pub room_name: String,
    pub standard_line_score: u32,
    pub routes: Vec<RouteSummary>,
}
