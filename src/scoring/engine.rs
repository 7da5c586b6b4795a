use super::line_score::standard_line_score;
use crate::model::{Member, MemberId, Route, RouteId, Score, ScoreId};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap};

/// Decimal places kept on every score and total.
pub const POINTS_SCALE: u32 = 2;

/// How one route's L was split.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteShare {
    pub route_id: RouteId,
    /// Normal-class members who completed the route (P).
    pub completers: usize,
    /// Points each of them receives (L / P, or 0.00 when P is 0).
    pub share: Decimal,
}

/// Every derived value of one room, computed from its completion state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot {
    pub standard_line_score: u32,
    pub routes: Vec<RouteShare>,
    pub score_attained: BTreeMap<ScoreId, Decimal>,
    pub member_totals: BTreeMap<MemberId, Decimal>,
}

#[cfg(test)]
impl ScoreSnapshot {
    fn route_share(&self, route_id: RouteId) -> Option<&RouteShare> {
        self.routes.iter().find(|r| r.route_id == route_id)
    }
}

/// Round to two places (half to even) and pin the scale so `6` prints as `6.00`.
pub fn to_points(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(POINTS_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(POINTS_SCALE);
    rounded
}

/// Per-completer value of a route: L / P, exact decimal division, rounded to
/// two places. Zero completers yield 0.00.
pub fn route_share(line_score: u32, completers: usize) -> Decimal {
    if completers == 0 {
        return to_points(Decimal::ZERO);
    }
    to_points(Decimal::from(line_score) / Decimal::from(completers as u64))
}

/// Derive L, per-route shares, per-row attained scores and member totals.
///
/// Pure: nothing is read or written outside the arguments. The steps run in
/// a fixed order because each reads what the previous one produced:
/// L from the normal roster, route distribution for normal members, normal
/// totals, then custom members (full L per completion).
///
/// Score rows whose member or route is not in the given lists are ignored.
/// Cost is O(routes x members).
pub fn compute_snapshot(members: &[Member], routes: &[Route], scores: &[Score]) -> ScoreSnapshot {
    let is_custom: HashMap<MemberId, bool> = members.iter().map(|m| (m.id, m.is_custom_calc)).collect();
    let normal_count = members.iter().filter(|m| !m.is_custom_calc).count();
    let line_score = standard_line_score(normal_count);
    let full_line = to_points(Decimal::from(line_score));

    let mut by_route: HashMap<RouteId, Vec<&Score>> = HashMap::new();
    for score in scores {
        by_route.entry(score.route_id).or_default().push(score);
    }

    let mut score_attained = BTreeMap::new();
    let mut route_shares = Vec::with_capacity(routes.len());

    for route in routes {
        let normal_rows: Vec<&Score> = by_route
            .get(&route.id)
            .map(|rows| {
                rows.iter()
                    .copied()
                    .filter(|s| is_custom.get(&s.member_id) == Some(&false))
                    .collect()
            })
            .unwrap_or_default();

        let completers = normal_rows.iter().filter(|s| s.is_completed).count();
        let share = route_share(line_score, completers);

        for row in normal_rows {
            let value = if row.is_completed { share } else { to_points(Decimal::ZERO) };
            score_attained.insert(row.id, value);
        }

        route_shares.push(RouteShare {
            route_id: route.id,
            completers,
            share,
        });
    }

    let mut rows_by_member: HashMap<MemberId, Vec<&Score>> = HashMap::new();
    for rows in by_route
        .iter()
        .filter(|(route_id, _)| routes.iter().any(|r| r.id == **route_id))
        .map(|(_, rows)| rows)
    {
        for row in rows {
            rows_by_member.entry(row.member_id).or_default().push(row);
        }
    }

    let mut member_totals = BTreeMap::new();

    for member in members.iter().filter(|m| !m.is_custom_calc) {
        let total: Decimal = rows_by_member
            .get(&member.id)
            .into_iter()
            .flatten()
            .filter(|s| s.is_completed)
            .filter_map(|s| score_attained.get(&s.id))
            .sum();
        member_totals.insert(member.id, to_points(total));
    }

    for member in members.iter().filter(|m| m.is_custom_calc) {
        let rows = rows_by_member.get(&member.id).map(Vec::as_slice).unwrap_or_default();
        let completed = rows.iter().filter(|s| s.is_completed).count();
        member_totals.insert(
            member.id,
            to_points(Decimal::from(completed as u64) * Decimal::from(line_score)),
        );
        for row in rows {
            let value = if row.is_completed { full_line } else { to_points(Decimal::ZERO) };
            score_attained.insert(row.id, value);
        }
    }

    ScoreSnapshot {
        standard_line_score: line_score,
        routes: route_shares,
        score_attained,
        member_totals,
    }
}
