use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

entity_id!(RoomId, "room#");
entity_id!(MemberId, "member#");
entity_id!(RouteId, "route#");
entity_id!(ScoreId, "score#");

/// A competition. `standard_line_score` is the point budget L of every route;
/// it is derived from the normal-class roster and only the scorer writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub standard_line_score: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            standard_line_score: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A competitor.
///
/// `is_custom_calc` picks the scoring class: normal-class members share each
/// route's L with their co-completers, custom-class members get the full L
/// for every route they complete. `total_score` is derived by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub room_id: RoomId,
    pub name: String,
    pub is_custom_calc: bool,
    pub total_score: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: MemberId, room_id: RoomId, name: impl Into<String>, is_custom_calc: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            room_id,
            name: name.into(),
            is_custom_calc,
            total_score: Decimal::new(0, 2),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn class_label(&self) -> &'static str {
        if self.is_custom_calc {
            "custom"
        } else {
            "normal"
        }
    }
}

/// A boulder problem set in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub room_id: RoomId,
    pub name: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn new(id: RouteId, room_id: RoomId, name: impl Into<String>, grade: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            room_id,
            name: name.into(),
            grade: grade.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Join row between a member and a route. `is_completed` is the only field
/// callers set; `score_attained` is written by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: ScoreId,
    pub member_id: MemberId,
    pub route_id: RouteId,
    pub is_completed: bool,
    pub score_attained: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Score {
    pub fn new(id: ScoreId, member_id: MemberId, route_id: RouteId, is_completed: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            member_id,
            route_id,
            is_completed,
            score_attained: Decimal::new(0, 2),
            created_at: now,
            updated_at: now,
        }
    }
}
