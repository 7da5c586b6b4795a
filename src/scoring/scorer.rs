use super::engine::{compute_snapshot, ScoreSnapshot};
use super::locks::{RoomGuard, RoomLocks};
use crate::model::{Room, RoomId, Score};
use crate::store::{ScoreStore, StoreError};
use tracing::{debug, info};

/// What a recompute pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOutcome {
    pub room_id: RoomId,
    pub standard_line_score: u32,
    pub line_score_changed: bool,
    pub scores_written: usize,
    pub members_written: usize,
}

impl RecomputeOutcome {
    pub fn is_noop(&self) -> bool {
        !self.line_score_changed && self.scores_written == 0 && self.members_written == 0
    }
}

/// Sole writer of `standard_line_score`, `score_attained` and `total_score`.
///
/// Every pass re-derives the whole room from its completion state; passes for
/// the same room are serialized through [`RoomLocks`].
#[derive(Debug, Default)]
pub struct Scorer {
    locks: RoomLocks,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a room so a mutation and its recompute run as one critical section.
    pub fn lock_room(&self, room_id: RoomId) -> RoomGuard<'_> {
        self.locks.lock(room_id)
    }

    /// Recompute and persist every derived value of a room.
    ///
    /// A missing room is a no-op (`Ok(None)`), not an error. Storage errors
    /// propagate as-is.
    pub fn recompute<S>(&self, store: &S, room_id: RoomId) -> Result<Option<RecomputeOutcome>, StoreError>
    where
        S: ScoreStore + ?Sized,
    {
        let guard = self.lock_room(room_id);
        self.recompute_locked(store, &guard)
    }

    /// Same as [`recompute`](Self::recompute) for a room the caller already holds.
    pub fn recompute_locked<S>(&self, store: &S, guard: &RoomGuard<'_>) -> Result<Option<RecomputeOutcome>, StoreError>
    where
        S: ScoreStore + ?Sized,
    {
        let room_id = guard.room_id();
        let Some((mut room, snapshot, scores)) = load_and_compute(store, room_id)? else {
            debug!(%room_id, "recompute skipped, room not found");
            return Ok(None);
        };

        let line_score_changed = room.standard_line_score != snapshot.standard_line_score;
        if line_score_changed {
            info!(
                %room_id,
                from = room.standard_line_score,
                to = snapshot.standard_line_score,
                "standard line score changed"
            );
            room.standard_line_score = snapshot.standard_line_score;
            store.save_room(&room)?;
        }

        let changed_scores: Vec<Score> = scores
            .into_iter()
            .filter_map(|mut score| {
                let value = *snapshot.score_attained.get(&score.id)?;
                if score.score_attained == value && score.score_attained.scale() == value.scale() {
                    return None;
                }
                score.score_attained = value;
                Some(score)
            })
            .collect();
        if !changed_scores.is_empty() {
            store.save_scores(&changed_scores)?;
        }

        let changed_members: Vec<_> = store
            .list_members(room_id, None)?
            .into_iter()
            .filter_map(|mut member| {
                let total = *snapshot.member_totals.get(&member.id)?;
                if member.total_score == total && member.total_score.scale() == total.scale() {
                    return None;
                }
                member.total_score = total;
                Some(member)
            })
            .collect();
        if !changed_members.is_empty() {
            store.save_members(&changed_members)?;
        }

        debug!(
            %room_id,
            line_score = snapshot.standard_line_score,
            routes = snapshot.routes.len(),
            scores_written = changed_scores.len(),
            members_written = changed_members.len(),
            "recompute finished"
        );

        Ok(Some(RecomputeOutcome {
            room_id,
            standard_line_score: snapshot.standard_line_score,
            line_score_changed,
            scores_written: changed_scores.len(),
            members_written: changed_members.len(),
        }))
    }

    /// Compute a room's derived values without persisting them.
    pub fn snapshot<S>(&self, store: &S, room_id: RoomId) -> Result<Option<ScoreSnapshot>, StoreError>
    where
        S: ScoreStore + ?Sized,
    {
        let _guard = self.lock_room(room_id);
        Ok(load_and_compute(store, room_id)?.map(|(_, snapshot, _)| snapshot))
    }
}

fn load_and_compute<S>(store: &S, room_id: RoomId) -> Result<Option<(Room, ScoreSnapshot, Vec<Score>)>, StoreError>
where
    S: ScoreStore + ?Sized,
{
    let Some(room) = store.get_room(room_id)? else {
        return Ok(None);
    };
    let members = store.list_members(room_id, None)?;
    let routes = store.list_routes(room_id)?;
    let mut scores = Vec::new();
    for route in &routes {
        scores.extend(store.list_scores(route.id)?);
    }

    let snapshot = compute_snapshot(&members, &routes, &scores);
    for share in &snapshot.routes {
        debug!(route_id = %share.route_id, completers = share.completers, share = %share.share, "route distributed");
    }
    Ok(Some((room, snapshot, scores)))
}
