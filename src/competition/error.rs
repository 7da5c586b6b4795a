use crate::model::{MemberId, RoomId, RouteId};
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompetitionError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("a member named \"{0}\" already exists in this room")]
    DuplicateMemberName(String),
    #[error("{0} not found")]
    RoomNotFound(RoomId),
    #[error("{0} not found")]
    MemberNotFound(MemberId),
    #[error("{0} not found")]
    RouteNotFound(RouteId),
    #[error("no score row for {member} on {route}")]
    ScoreNotFound { member: MemberId, route: RouteId },
    #[error("{member} is not part of {room}")]
    ForeignMember { member: MemberId, room: RoomId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CompetitionError {
    /// True for failures caused by the request itself rather than storage.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, CompetitionError::Store(_))
    }
}
