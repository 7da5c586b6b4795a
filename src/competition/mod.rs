//! Roster, route and completion mutations.
//!
//! Every mutating operation takes the room's lock, applies its change, then
//! recomputes the room before returning, so callers always read fresh totals.

mod board;
mod error;

pub use board::{Leaderboard, LeaderboardEntry, RouteBoard, RouteSummary};
pub use error::CompetitionError;

use crate::model::{Member, MemberId, Room, RoomId, Route, RouteId, Score};
use crate::scoring::{RecomputeOutcome, Scorer};
use crate::store::CompetitionStore;
use std::collections::BTreeSet;
use tracing::debug;

pub type Result<T> = std::result::Result<T, CompetitionError>;

/// Optional field changes for [`Competition::update_member`].
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub is_custom_calc: Option<bool>,
}

/// Optional field changes for [`Competition::update_route`].
///
/// When `completions` is set, exactly the listed members end up completed;
/// everyone else in the room is marked incomplete.
#[derive(Debug, Clone, Default)]
pub struct RouteUpdate {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub completions: Option<BTreeSet<MemberId>>,
}

pub struct Competition<S> {
    store: S,
    scorer: Scorer,
}

impl<S: CompetitionStore> Competition<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            scorer: Scorer::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn rooms(&self) -> Result<Vec<Room>> {
        Ok(self.store.list_rooms()?)
    }

    pub fn room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .get_room(room_id)?
            .ok_or(CompetitionError::RoomNotFound(room_id))
    }

    pub fn member(&self, member_id: MemberId) -> Result<Member> {
        self.store
            .get_member(member_id)?
            .ok_or(CompetitionError::MemberNotFound(member_id))
    }

    pub fn route(&self, route_id: RouteId) -> Result<Route> {
        self.store
            .get_route(route_id)?
            .ok_or(CompetitionError::RouteNotFound(route_id))
    }

    pub fn members(&self, room_id: RoomId) -> Result<Vec<Member>> {
        self.room(room_id)?;
        Ok(self.store.list_members(room_id, None)?)
    }

    pub fn routes(&self, room_id: RoomId) -> Result<Vec<Route>> {
        self.room(room_id)?;
        Ok(self.store.list_routes(room_id)?)
    }

    /// Re-derive a room's scores; `None` if the room does not exist.
    pub fn recompute(&self, room_id: RoomId) -> Result<Option<RecomputeOutcome>> {
        Ok(self.scorer.recompute(&self.store, room_id)?)
    }

    pub fn create_room(&self, name: &str) -> Result<Room> {
        let name = required("room name", name)?;
        let room = self.store.insert_room(name)?;
        self.scorer.recompute(&self.store, room.id)?;
        debug!(room_id = %room.id, "room created");
        self.room(room.id)
    }

    pub fn rename_room(&self, room_id: RoomId, name: &str) -> Result<Room> {
        let name = required("room name", name)?;
        let guard = self.scorer.lock_room(room_id);
        let mut room = self.room(room_id)?;
        room.name = name.to_string();
        self.store.save_room(&room)?;
        self.scorer.recompute_locked(&self.store, &guard)?;
        self.room(room_id)
    }

    pub fn delete_room(&self, room_id: RoomId) -> Result<()> {
        let guard = self.scorer.lock_room(room_id);
        if !self.store.delete_room(room_id)? {
            return Err(CompetitionError::RoomNotFound(room_id));
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        debug!(%room_id, "room deleted");
        Ok(())
    }

    /// Add a member with an incomplete score row on every existing route.
    pub fn add_member(&self, room_id: RoomId, name: &str, is_custom_calc: bool) -> Result<Member> {
        let name = required("member name", name)?;
        let guard = self.scorer.lock_room(room_id);
        self.room(room_id)?;
        self.ensure_unique_name(room_id, name, None)?;

        let member = self.store.insert_member(room_id, name, is_custom_calc)?;
        for route in self.store.list_routes(room_id)? {
            self.store.insert_score(member.id, route.id, false)?;
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        debug!(member_id = %member.id, %room_id, "member added");
        self.member(member.id)
    }

    /// Rename a member and/or switch its scoring class.
    pub fn update_member(&self, member_id: MemberId, update: MemberUpdate) -> Result<Member> {
        let room_id = self.member(member_id)?.room_id;
        let guard = self.scorer.lock_room(room_id);
        let mut member = self.member(member_id)?;

        if let Some(name) = update.name.as_deref() {
            let name = required("member name", name)?;
            self.ensure_unique_name(room_id, name, Some(member_id))?;
            member.name = name.to_string();
        }
        if let Some(is_custom_calc) = update.is_custom_calc {
            let was = member.class_label();
            member.is_custom_calc = is_custom_calc;
            if was != member.class_label() {
                debug!(%member_id, from = was, to = member.class_label(), "member class changed");
            }
        }
        self.store.save_members(std::slice::from_ref(&member))?;
        self.scorer.recompute_locked(&self.store, &guard)?;
        self.member(member_id)
    }

    pub fn delete_member(&self, member_id: MemberId) -> Result<()> {
        let room_id = self.member(member_id)?.room_id;
        let guard = self.scorer.lock_room(room_id);
        if !self.store.delete_member(member_id)? {
            return Err(CompetitionError::MemberNotFound(member_id));
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        Ok(())
    }

    /// Add a route with one score row per member of the room; members in
    /// `completions` start out completed.
    pub fn add_route(
        &self,
        room_id: RoomId,
        name: &str,
        grade: &str,
        completions: &BTreeSet<MemberId>,
    ) -> Result<Route> {
        let name = required("route name", name)?;
        let grade = required("route grade", grade)?;
        let guard = self.scorer.lock_room(room_id);
        self.room(room_id)?;
        let members = self.store.list_members(room_id, None)?;
        ensure_members_in_room(room_id, &members, completions)?;

        let route = self.store.insert_route(room_id, name, grade)?;
        for member in &members {
            self.store
                .insert_score(member.id, route.id, completions.contains(&member.id))?;
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        debug!(route_id = %route.id, %room_id, completed = completions.len(), "route added");
        self.route(route.id)
    }

    pub fn update_route(&self, route_id: RouteId, update: RouteUpdate) -> Result<Route> {
        let room_id = self.route(route_id)?.room_id;
        let guard = self.scorer.lock_room(room_id);
        let mut route = self.route(route_id)?;

        if let Some(name) = update.name.as_deref() {
            route.name = required("route name", name)?.to_string();
        }
        if let Some(grade) = update.grade.as_deref() {
            route.grade = required("route grade", grade)?.to_string();
        }

        let mut changed_scores = Vec::new();
        if let Some(completions) = &update.completions {
            let members = self.store.list_members(room_id, None)?;
            ensure_members_in_room(room_id, &members, completions)?;
            for member in &members {
                let completed = completions.contains(&member.id);
                match self.store.find_score(member.id, route_id)? {
                    Some(mut score) => {
                        if score.is_completed != completed {
                            score.is_completed = completed;
                            changed_scores.push(score);
                        }
                    }
                    None => {
                        self.store.insert_score(member.id, route_id, completed)?;
                    }
                }
            }
        }

        self.store.save_route(&route)?;
        if !changed_scores.is_empty() {
            self.store.save_scores(&changed_scores)?;
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        self.route(route_id)
    }

    pub fn delete_route(&self, route_id: RouteId) -> Result<()> {
        let room_id = self.route(route_id)?.room_id;
        let guard = self.scorer.lock_room(room_id);
        if !self.store.delete_route(route_id)? {
            return Err(CompetitionError::RouteNotFound(route_id));
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        Ok(())
    }

    /// Mark one member's attempt on one route as completed or not.
    pub fn set_completion(&self, member_id: MemberId, route_id: RouteId, completed: bool) -> Result<Score> {
        let member = self.member(member_id)?;
        let route = self.route(route_id)?;
        if member.room_id != route.room_id {
            return Err(CompetitionError::ForeignMember {
                member: member_id,
                room: route.room_id,
            });
        }
        let guard = self.scorer.lock_room(route.room_id);
        let mut score = self
            .store
            .find_score(member_id, route_id)?
            .ok_or(CompetitionError::ScoreNotFound {
                member: member_id,
                route: route_id,
            })?;
        if score.is_completed != completed {
            score.is_completed = completed;
            self.store.save_scores(std::slice::from_ref(&score))?;
        }
        self.scorer.recompute_locked(&self.store, &guard)?;
        self.store
            .find_score(member_id, route_id)?
            .ok_or(CompetitionError::ScoreNotFound {
                member: member_id,
                route: route_id,
            })
    }

    /// Members by total descending, then name ascending.
    pub fn leaderboard(&self, room_id: RoomId) -> Result<Leaderboard> {
        let room = self.room(room_id)?;
        let members = self.store.list_members(room_id, None)?;
        let mut rows = Vec::with_capacity(members.len());
        for member in members {
            let completed_routes = self
                .store
                .list_scores_by_member(member.id)?
                .iter()
                .filter(|s| s.is_completed)
                .count();
            rows.push((member, completed_routes));
        }
        Ok(Leaderboard::build(&room, rows))
    }

    /// Routes in creation order with their current split.
    pub fn route_board(&self, room_id: RoomId) -> Result<RouteBoard> {
        let room = self.room(room_id)?;
        let members = self.store.list_members(room_id, None)?;
        let mut summaries = Vec::new();
        for route in self.store.list_routes(room_id)? {
            let scores = self.store.list_scores(route.id)?;
            summaries.push(RouteSummary::build(route, &members, &scores, room.standard_line_score));
        }
        Ok(RouteBoard {
            room_id,
            room_name: room.name,
            standard_line_score: room.standard_line_score,
            routes: summaries,
        })
    }

    fn ensure_unique_name(&self, room_id: RoomId, name: &str, except: Option<MemberId>) -> Result<()> {
        let taken = self
            .store
            .list_members(room_id, None)?
            .iter()
            .any(|m| m.name == name && Some(m.id) != except);
        if taken {
            return Err(CompetitionError::DuplicateMemberName(name.to_string()));
        }
        Ok(())
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CompetitionError::Blank(field));
    }
    Ok(trimmed)
}

fn ensure_members_in_room(room_id: RoomId, members: &[Member], ids: &BTreeSet<MemberId>) -> Result<()> {
    match ids.iter().find(|id| !members.iter().any(|m| m.id == **id)) {
        Some(&member) => Err(CompetitionError::ForeignMember { member, room: room_id }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ScoreStore};
    use rust_decimal::Decimal;

    fn pts(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn competition() -> Competition<MemoryStore> {
        Competition::new(MemoryStore::new())
    }

    #[test]
    fn test_create_room_rejects_blank_name() {
        let comp = competition();
        let err = comp.create_room("   ").unwrap_err();
        assert!(matches!(err, CompetitionError::Blank("room name")));
    }

    #[test]
    fn test_create_room_trims_name() {
        let comp = competition();
        let room = comp.create_room("  Summer Send  ").unwrap();
        assert_eq!(room.name, "Summer Send");
        assert_eq!(room.standard_line_score, 1);
    }

    #[test]
    fn test_add_member_creates_rows_for_existing_routes() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        let r1 = comp.add_route(room.id, "One", "V1", &BTreeSet::from([a.id])).unwrap();
        let r2 = comp.add_route(room.id, "Two", "V2", &BTreeSet::new()).unwrap();

        let b = comp.add_member(room.id, "B", false).unwrap();
        let rows = comp.store().list_scores_by_member(b.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|s| !s.is_completed));
        assert!(rows.iter().any(|s| s.route_id == r1.id));
        assert!(rows.iter().any(|s| s.route_id == r2.id));

        // L went from 1 to 2, so A's solo send on R1 is now worth 2
        assert_eq!(comp.member(a.id).unwrap().total_score, pts("2.00"));
    }

    #[test]
    fn test_duplicate_member_name_rejected() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        comp.add_member(room.id, "Ada", false).unwrap();
        let err = comp.add_member(room.id, "Ada", true).unwrap_err();
        assert!(matches!(err, CompetitionError::DuplicateMemberName(name) if name == "Ada"));

        // Same name in another room is fine
        let other = comp.create_room("Other").unwrap();
        assert!(comp.add_member(other.id, "Ada", false).is_ok());
    }

    #[test]
    fn test_rename_member_to_own_name_is_allowed() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let ada = comp.add_member(room.id, "Ada", false).unwrap();
        comp.add_member(room.id, "Bo", false).unwrap();

        let same = MemberUpdate {
            name: Some("Ada".to_string()),
            ..MemberUpdate::default()
        };
        assert!(comp.update_member(ada.id, same).is_ok());

        let clash = MemberUpdate {
            name: Some("Bo".to_string()),
            ..MemberUpdate::default()
        };
        assert!(comp.update_member(ada.id, clash).is_err());
    }

    #[test]
    fn test_add_route_rejects_foreign_member() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let other = comp.create_room("Other").unwrap();
        let outsider = comp.add_member(other.id, "Out", false).unwrap();

        let err = comp
            .add_route(room.id, "One", "V1", &BTreeSet::from([outsider.id]))
            .unwrap_err();
        assert!(matches!(err, CompetitionError::ForeignMember { .. }));
        assert!(comp.routes(room.id).unwrap().is_empty());
    }

    #[test]
    fn test_add_route_requires_grade() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let err = comp.add_route(room.id, "One", "", &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, CompetitionError::Blank("route grade")));
    }

    #[test]
    fn test_set_completion_toggles_and_recomputes() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        let b = comp.add_member(room.id, "B", false).unwrap();
        let route = comp.add_route(room.id, "One", "V1", &BTreeSet::new()).unwrap();

        let row = comp.set_completion(a.id, route.id, true).unwrap();
        assert_eq!(row.score_attained, pts("2.00"));

        comp.set_completion(b.id, route.id, true).unwrap();
        assert_eq!(comp.member(a.id).unwrap().total_score, pts("1.00"));
        assert_eq!(comp.member(b.id).unwrap().total_score, pts("1.00"));

        comp.set_completion(a.id, route.id, false).unwrap();
        assert_eq!(comp.member(a.id).unwrap().total_score, Decimal::ZERO);
        assert_eq!(comp.member(b.id).unwrap().total_score, pts("2.00"));
    }

    #[test]
    fn test_update_route_replaces_completion_set() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        let b = comp.add_member(room.id, "B", false).unwrap();
        let route = comp
            .add_route(room.id, "One", "V1", &BTreeSet::from([a.id]))
            .unwrap();

        let update = RouteUpdate {
            grade: Some("V5".to_string()),
            completions: Some(BTreeSet::from([b.id])),
            ..RouteUpdate::default()
        };
        let route = comp.update_route(route.id, update).unwrap();
        assert_eq!(route.grade, "V5");
        assert!(!comp.store().find_score(a.id, route.id).unwrap().unwrap().is_completed);
        assert!(comp.store().find_score(b.id, route.id).unwrap().unwrap().is_completed);
        assert_eq!(comp.member(b.id).unwrap().total_score, pts("2.00"));
        assert_eq!(comp.member(a.id).unwrap().total_score, Decimal::ZERO);
    }

    #[test]
    fn test_set_completion_across_rooms_rejected() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let other = comp.create_room("Other").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        let route = comp.add_route(other.id, "One", "V1", &BTreeSet::new()).unwrap();
        let err = comp.set_completion(a.id, route.id, true).unwrap_err();
        assert!(matches!(err, CompetitionError::ForeignMember { .. }));
    }

    #[test]
    fn test_delete_room_removes_everything() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        comp.delete_room(room.id).unwrap();
        assert!(matches!(comp.room(room.id), Err(CompetitionError::RoomNotFound(_))));
        assert!(matches!(comp.member(a.id), Err(CompetitionError::MemberNotFound(_))));
        assert!(matches!(comp.delete_room(room.id), Err(CompetitionError::RoomNotFound(_))));
    }

    #[test]
    fn test_leaderboard_order_and_ties() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let cy = comp.add_member(room.id, "Cy", false).unwrap();
        let ada = comp.add_member(room.id, "Ada", false).unwrap();
        let bo = comp.add_member(room.id, "Bo", false).unwrap();
        comp.add_route(room.id, "One", "V1", &BTreeSet::from([cy.id, ada.id])).unwrap();

        let board = comp.leaderboard(room.id).unwrap();
        assert_eq!(board.standard_line_score, 6);
        let names: Vec<&str> = board.entries.iter().map(|e| e.member.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Cy", "Bo"]);
        let ranks: Vec<usize> = board.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
        assert_eq!(board.entries[0].completed_routes, 1);
        assert_eq!(board.entries[2].member.id, bo.id);
    }

    #[test]
    fn test_route_board_reports_split() {
        let comp = competition();
        let room = comp.create_room("R").unwrap();
        let a = comp.add_member(room.id, "A", false).unwrap();
        let b = comp.add_member(room.id, "B", false).unwrap();
        let c = comp.add_member(room.id, "C", true).unwrap();
        comp.add_route(room.id, "One", "V1", &BTreeSet::from([a.id, b.id, c.id])).unwrap();

        let board = comp.route_board(room.id).unwrap();
        let summary = &board.routes[0];
        assert_eq!(summary.completers, 2);
        assert_eq!(summary.custom_completers, 1);
        assert_eq!(summary.share, pts("1.00"));
        assert_eq!(summary.completed_by, vec!["A", "B", "C"]);
    }
}
