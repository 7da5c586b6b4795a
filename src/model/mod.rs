mod types;

pub use types::{Member, MemberId, Room, RoomId, Route, RouteId, Score, ScoreId};
