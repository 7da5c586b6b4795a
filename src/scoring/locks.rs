use crate::model::RoomId;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Per-room mutual exclusion.
///
/// Holding a [`RoomGuard`] for a room blocks every other `lock` call for the
/// same room until the guard drops. Different rooms never contend.
#[derive(Debug, Default)]
pub struct RoomLocks {
    busy: Mutex<HashSet<RoomId>>,
    released: Condvar,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `room_id` is free, then claim it.
    pub fn lock(&self, room_id: RoomId) -> RoomGuard<'_> {
        // The set is only mutated by insert/remove, so a poisoned lock still
        // holds a consistent value.
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while busy.contains(&room_id) {
            busy = self
                .released
                .wait(busy)
                .unwrap_or_else(PoisonError::into_inner);
        }
        busy.insert(room_id);
        RoomGuard {
            locks: self,
            room_id,
        }
    }

    #[cfg(test)]
    fn is_locked(&self, room_id: RoomId) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&room_id)
    }
}

/// Claim on one room, released on drop.
#[derive(Debug)]
pub struct RoomGuard<'a> {
    locks: &'a RoomLocks,
    room_id: RoomId,
}

impl RoomGuard<'_> {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .locks
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        busy.remove(&self.room_id);
        drop(busy);
        self.locks.released.notify_all();
    }
}
