use super::{CompetitionStore, ScoreStore, StoreError, StoreState};
use crate::model::{Member, MemberId, Room, RoomId, Route, RouteId, Score, ScoreId};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    rooms: BTreeMap<RoomId, Room>,
    members: BTreeMap<MemberId, Member>,
    routes: BTreeMap<RouteId, Route>,
    scores: BTreeMap<ScoreId, Score>,
    score_pairs: HashMap<(MemberId, RouteId), ScoreId>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn remove_scores_where(&mut self, keep: impl Fn(&Score) -> bool) {
        self.scores.retain(|_, score| keep(score));
        let scores = &self.scores;
        self.score_pairs.retain(|_, id| scores.contains_key(id));
    }
}

/// Thread-safe in-memory store.
///
/// Ids come from a single counter shared by every table, so creation order
/// is id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::new())
    }

    pub fn from_state(state: StoreState) -> Self {
        let mut tables = Tables {
            next_id: state.next_id,
            ..Tables::default()
        };
        for room in state.rooms {
            tables.rooms.insert(room.id, room);
        }
        for member in state.members {
            tables.members.insert(member.id, member);
        }
        for route in state.routes {
            tables.routes.insert(route.id, route);
        }
        for score in state.scores {
            tables.score_pairs.insert((score.member_id, score.route_id), score.id);
            tables.scores.insert(score.id, score);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn to_state(&self) -> Result<StoreState, StoreError> {
        let tables = self.read()?;
        Ok(StoreState {
            next_id: tables.next_id,
            rooms: tables.rooms.values().cloned().collect(),
            members: tables.members.values().cloned().collect(),
            routes: tables.routes.values().cloned().collect(),
            scores: tables.scores.values().cloned().collect(),
            ..StoreState::new()
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl ScoreStore for MemoryStore {
    fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.read()?.rooms.get(&id).cloned())
    }

    fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let slot = tables
            .rooms
            .get_mut(&room.id)
            .ok_or_else(|| StoreError::missing("room", room.id))?;
        *slot = room.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    fn list_members(&self, room_id: RoomId, custom: Option<bool>) -> Result<Vec<Member>, StoreError> {
        Ok(self
            .read()?
            .members
            .values()
            .filter(|m| m.room_id == room_id)
            .filter(|m| custom.map_or(true, |c| m.is_custom_calc == c))
            .cloned()
            .collect())
    }

    fn save_members(&self, members: &[Member]) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        // Validate the whole batch before touching anything
        if let Some(missing) = members.iter().find(|m| !tables.members.contains_key(&m.id)) {
            return Err(StoreError::missing("member", missing.id));
        }
        let now = Utc::now();
        for member in members {
            let mut row = member.clone();
            row.updated_at = now;
            tables.members.insert(row.id, row);
        }
        Ok(())
    }

    fn list_routes(&self, room_id: RoomId) -> Result<Vec<Route>, StoreError> {
        Ok(self
            .read()?
            .routes
            .values()
            .filter(|r| r.room_id == room_id)
            .cloned()
            .collect())
    }

    fn list_scores(&self, route_id: RouteId) -> Result<Vec<Score>, StoreError> {
        Ok(self
            .read()?
            .scores
            .values()
            .filter(|s| s.route_id == route_id)
            .cloned()
            .collect())
    }

    fn list_scores_by_member(&self, member_id: MemberId) -> Result<Vec<Score>, StoreError> {
        Ok(self
            .read()?
            .scores
            .values()
            .filter(|s| s.member_id == member_id)
            .cloned()
            .collect())
    }

    fn save_scores(&self, scores: &[Score]) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if let Some(missing) = scores.iter().find(|s| !tables.scores.contains_key(&s.id)) {
            return Err(StoreError::missing("score", missing.id));
        }
        let now = Utc::now();
        for score in scores {
            let mut row = score.clone();
            row.updated_at = now;
            tables.scores.insert(row.id, row);
        }
        Ok(())
    }
}

impl CompetitionStore for MemoryStore {
    fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.read()?.rooms.values().cloned().collect())
    }

    fn insert_room(&self, name: &str) -> Result<Room, StoreError> {
        let mut tables = self.write()?;
        let room = Room::new(RoomId(tables.allocate_id()), name);
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    fn insert_member(&self, room_id: RoomId, name: &str, is_custom_calc: bool) -> Result<Member, StoreError> {
        let mut tables = self.write()?;
        if !tables.rooms.contains_key(&room_id) {
            return Err(StoreError::missing("room", room_id));
        }
        let member = Member::new(MemberId(tables.allocate_id()), room_id, name, is_custom_calc);
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    fn insert_route(&self, room_id: RoomId, name: &str, grade: &str) -> Result<Route, StoreError> {
        let mut tables = self.write()?;
        if !tables.rooms.contains_key(&room_id) {
            return Err(StoreError::missing("room", room_id));
        }
        let route = Route::new(RouteId(tables.allocate_id()), room_id, name, grade);
        tables.routes.insert(route.id, route.clone());
        Ok(route)
    }

    fn insert_score(&self, member_id: MemberId, route_id: RouteId, is_completed: bool) -> Result<Score, StoreError> {
        let mut tables = self.write()?;
        if !tables.members.contains_key(&member_id) {
            return Err(StoreError::missing("member", member_id));
        }
        if !tables.routes.contains_key(&route_id) {
            return Err(StoreError::missing("route", route_id));
        }
        if tables.score_pairs.contains_key(&(member_id, route_id)) {
            return Err(StoreError::DuplicateScore {
                member: member_id,
                route: route_id,
            });
        }
        let score = Score::new(ScoreId(tables.allocate_id()), member_id, route_id, is_completed);
        tables.score_pairs.insert((member_id, route_id), score.id);
        tables.scores.insert(score.id, score.clone());
        Ok(score)
    }

    fn get_member(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.read()?.members.get(&id).cloned())
    }

    fn get_route(&self, id: RouteId) -> Result<Option<Route>, StoreError> {
        Ok(self.read()?.routes.get(&id).cloned())
    }

    fn find_score(&self, member_id: MemberId, route_id: RouteId) -> Result<Option<Score>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .score_pairs
            .get(&(member_id, route_id))
            .and_then(|id| tables.scores.get(id))
            .cloned())
    }

    fn save_route(&self, route: &Route) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let slot = tables
            .routes
            .get_mut(&route.id)
            .ok_or_else(|| StoreError::missing("route", route.id))?;
        *slot = route.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        let member_ids: Vec<MemberId> = tables
            .members
            .values()
            .filter(|m| m.room_id == id)
            .map(|m| m.id)
            .collect();
        let route_ids: Vec<RouteId> = tables
            .routes
            .values()
            .filter(|r| r.room_id == id)
            .map(|r| r.id)
            .collect();
        tables.members.retain(|_, m| m.room_id != id);
        tables.routes.retain(|_, r| r.room_id != id);
        tables.remove_scores_where(|s| {
            !member_ids.contains(&s.member_id) && !route_ids.contains(&s.route_id)
        });
        Ok(true)
    }

    fn delete_member(&self, id: MemberId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.members.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_scores_where(|s| s.member_id != id);
        Ok(true)
    }

    fn delete_route(&self, id: RouteId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.routes.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_scores_where(|s| s.route_id != id);
        Ok(true)
    }
}
