use crate::model::{Member, Room, Route, Score};
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const STATE_VERSION: u32 = 1;

/// On-disk form of a [`MemoryStore`](super::MemoryStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub version: u32,
    /// Next id handed out to any new row.
    pub next_id: u64,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub scores: Vec<Score>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            next_id: 1,
            rooms: Vec::new(),
            members: Vec::new(),
            routes: Vec::new(),
            scores: Vec::new(),
        }
    }
}

/// Get the default state file path (~/.config/boulder-tally/state.json)
pub fn get_state_path() -> Result<PathBuf> {
    Ok(crate::config::get_config_dir()?.join("state.json"))
}

/// Load competition state from a JSON file
///
/// If the file doesn't exist, returns a new empty state.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_state(path: &Path) -> Result<StoreState> {
    if !path.exists() {
        return Ok(StoreState::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open state file at {}", path.display()))?;

    let state: StoreState = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse state file at {}", path.display()))?;

    if state.version != STATE_VERSION {
        anyhow::bail!("Unsupported state file version: {}", state.version);
    }

    Ok(state)
}

/// Save competition state to a JSON file atomically
///
/// Creates the parent directory if it doesn't exist.
pub fn save_state(path: &Path, state: &StoreState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, state).context("Failed to serialize state")?;

    file.commit().context("Failed to save state")?;

    Ok(())
}

/// Exclusive advisory lock on `<state file>.lock`, released on drop.
struct StateFileLock {
    file: File,
}

impl StateFileLock {
    fn acquire(state_path: &Path) -> Result<Self> {
        let path = lock_path(state_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file at {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", path.display()))?;

        Ok(Self { file })
    }
}

impl Drop for StateFileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Load, update and save the state file while holding its lock.
///
/// Other processes going through this function block until the update has
/// been committed, so concurrent invocations serialize instead of
/// overwriting each other. `update` returns `Some(state)` to save it, or
/// `None` to leave the file untouched.
pub fn with_locked_state<F>(path: &Path, update: F) -> Result<()>
where
    F: FnOnce(StoreState) -> Result<Option<StoreState>>,
{
    let _lock = StateFileLock::acquire(path)?;
    let state = load_state(path)?;
    if let Some(updated) = update(state)? {
        save_state(path, &updated)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberId, RoomId, RouteId, ScoreId};
    use rust_decimal::Decimal;

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_state(&dir.path().join("missing.json")).unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.next_id, 1);
        assert!(state.rooms.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = StoreState::new();
        state.rooms.push(Room::new(RoomId(1), "Boulder Bash"));
        state.members.push(Member::new(MemberId(2), RoomId(1), "Ada", false));
        state.routes.push(Route::new(RouteId(3), RoomId(1), "Crimp City", "V4"));
        let mut score = Score::new(ScoreId(4), MemberId(2), RouteId(3), true);
        score.score_attained = Decimal::new(240, 2);
        state.scores.push(score);
        state.next_id = 5;

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();

        assert_eq!(loaded, state);
        assert_eq!(loaded.scores[0].score_attained.to_string(), "2.40");
    }

    #[test]
    fn test_decimals_are_written_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = StoreState::new();
        let mut member = Member::new(MemberId(1), RoomId(9), "Bo", true);
        member.total_score = Decimal::new(3333, 2);
        state.members.push(member);
        save_state(&path, &state).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"33.33\""), "unexpected encoding: {}", raw);
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 7, "next_id": 1}"#).unwrap();

        let err = load_state(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported state file version: 7"));
    }

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path(Path::new("/srv/comp/state.json")),
            PathBuf::from("/srv/comp/state.json.lock")
        );
    }

    #[test]
    fn test_locked_update_skips_save_on_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        with_locked_state(&path, |_| Ok(None)).unwrap();
        assert!(!path.exists());
        assert!(dir.path().join("state.json.lock").exists());
    }

    #[test]
    fn test_locked_update_propagates_error_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_state(&path, &StoreState::new()).unwrap();

        let err = with_locked_state(&path, |mut state| {
            state.next_id = 99;
            anyhow::bail!("rejected")
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "rejected");
        assert_eq!(load_state(&path).unwrap().next_id, 1);
    }

    #[test]
    fn test_concurrent_locked_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        with_locked_state(&path, |mut state| {
                            let id = state.next_id;
                            state.rooms.push(Room::new(RoomId(id), format!("Room {}", id)));
                            state.next_id += 1;
                            Ok(Some(state))
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = load_state(&path).unwrap();
        assert_eq!(state.rooms.len(), 40);
        assert_eq!(state.next_id, 41);
    }
}
