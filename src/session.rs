//! Primary-file session state
//!
//! One record survives across runs: the primary uploaded file. It is held in
//! an explicit session object passed to the views that need it, persisted as
//! JSON under a single well-known path, reloaded at startup, and cleared on
//! explicit removal. Saves are atomic (temp file + rename); there is exactly
//! one writer at a time, so last-write-wins needs no conflict handling.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::dataset::get_data_dir;

const SESSION_FILE: &str = "session.json";

/// The one piece of cross-view state: name, size, raw content, and upload
/// timestamp of the primary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryFile {
    pub name: String,
    pub size: u64,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

impl PrimaryFile {
    pub fn from_path(path: &Path) -> Result<PrimaryFile, std::io::Error> {
        let content = fs::read_to_string(path)?;
        let size = fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(PrimaryFile {
            name,
            size,
            content,
            uploaded_at: Utc::now(),
        })
    }
}

#[derive(Debug)]
pub struct SessionState {
    path: PathBuf,
    primary: Option<PrimaryFile>,
}

impl SessionState {
    pub fn default_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(get_data_dir()?.join(SESSION_FILE))
    }

    /// Load the session from disk. A missing file is a fresh session; a
    /// corrupt file is discarded with a warning rather than failing startup.
    pub fn load(path: PathBuf) -> SessionState {
        let primary = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(primary) => Some(primary),
                Err(e) => {
                    warn!("Discarding unreadable session file {path:?}: {e}");
                    None
                }
            },
            Err(_) => None,
        };

        if primary.is_some() {
            debug!("Restored primary file from {path:?}");
        }

        SessionState { path, primary }
    }

    pub fn primary(&self) -> Option<&PrimaryFile> {
        self.primary.as_ref()
    }

    /// Replace the primary file and persist it.
    pub fn set_primary(&mut self, primary: PrimaryFile) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(&primary)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        self.primary = Some(primary);
        Ok(())
    }

    /// Drop the primary file and remove its persisted record.
    pub fn clear(&mut self) -> Result<(), Box<dyn Error>> {
        self.primary = None;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
