//! Storage seam between the scorer and whatever holds the rows.
//!
//! [`ScoreStore`] is the narrow view the recompute pass needs. The
//! [`CompetitionStore`] extension adds the create/delete operations used by
//! the competition layer.

mod file;
mod memory;

pub use file::{get_state_path, load_state, save_state, with_locked_state, StoreState, STATE_VERSION};
pub use memory::MemoryStore;

use crate::model::{Member, MemberId, Room, RoomId, Route, RouteId, Score};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} does not exist")]
    Missing { kind: &'static str, id: String },
    #[error("a score row for {member} on {route} already exists")]
    DuplicateScore { member: MemberId, route: RouteId },
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn missing(kind: &'static str, id: impl ToString) -> Self {
        StoreError::Missing {
            kind,
            id: id.to_string(),
        }
    }
}

/// Read/write access the recompute pass borrows from the storage layer.
///
/// All methods take `&self`; implementations that are shared across threads
/// synchronize internally.
pub trait ScoreStore {
    fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;

    fn save_room(&self, room: &Room) -> Result<(), StoreError>;

    /// Members of a room in creation order. `custom` filters on
    /// `is_custom_calc` when set.
    fn list_members(&self, room_id: RoomId, custom: Option<bool>) -> Result<Vec<Member>, StoreError>;

    fn save_members(&self, members: &[Member]) -> Result<(), StoreError>;

    /// Routes of a room in creation order.
    fn list_routes(&self, room_id: RoomId) -> Result<Vec<Route>, StoreError>;

    fn list_scores(&self, route_id: RouteId) -> Result<Vec<Score>, StoreError>;

    fn list_scores_by_member(&self, member_id: MemberId) -> Result<Vec<Score>, StoreError>;

    fn save_scores(&self, scores: &[Score]) -> Result<(), StoreError>;
}

/// Row creation and cascading deletes on top of [`ScoreStore`].
pub trait CompetitionStore: ScoreStore {
    fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    fn insert_room(&self, name: &str) -> Result<Room, StoreError>;

    fn insert_member(&self, room_id: RoomId, name: &str, is_custom_calc: bool) -> Result<Member, StoreError>;

    fn insert_route(&self, room_id: RoomId, name: &str, grade: &str) -> Result<Route, StoreError>;

    fn insert_score(&self, member_id: MemberId, route_id: RouteId, is_completed: bool) -> Result<Score, StoreError>;

    fn get_member(&self, id: MemberId) -> Result<Option<Member>, StoreError>;

    fn get_route(&self, id: RouteId) -> Result<Option<Route>, StoreError>;

    fn find_score(&self, member_id: MemberId, route_id: RouteId) -> Result<Option<Score>, StoreError>;

    fn save_route(&self, route: &Route) -> Result<(), StoreError>;

    /// Deletes the room with its members, routes and scores. Returns false
    /// if the room did not exist.
    fn delete_room(&self, id: RoomId) -> Result<bool, StoreError>;

    /// Deletes the member and its score rows.
    fn delete_member(&self, id: MemberId) -> Result<bool, StoreError>;

    /// Deletes the route and its score rows.
    fn delete_route(&self, id: RouteId) -> Result<bool, StoreError>;
}
