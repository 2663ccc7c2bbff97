use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::state::UserState;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize state: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Location of the user-state document: `$HOURS_STATE` if set, otherwise
/// `~/.hours/state.json`.
pub fn state_path() -> PathBuf {
    if let Ok(p) = env::var("HOURS_STATE") {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".hours").join("state.json")
}

/// Read the state document. A missing file yields the default state; a
/// malformed one is reported and also yields the default, so a corrupt file
/// never blocks the session.
pub fn load(path: &Path) -> UserState {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return UserState::default(),
    };
    match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("hours: ignoring malformed state file {}: {}", path.display(), e);
            UserState::default()
        }
    }
}

/// Overwrite the state document in full. The old file stays intact until the
/// write happens, so a crash mid-session loses at most the unsaved mutation.
pub fn save(path: &Path, state: &UserState) -> Result<(), StateError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StateError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content).map_err(|e| StateError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}
