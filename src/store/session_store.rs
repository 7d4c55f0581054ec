//! Session state file I/O.
//!
//! One directory per session under the sessions root:
//! `<root>/<session_id>/session_state.json` holds the full record and
//! `<root>/<session_id>/topics/` is the session's topic storage area.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use crate::error::PipelineError;
use crate::models::Session;

const STATE_FILE: &str = "session_state.json";

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `root`. A relative root is resolved against
    /// the current directory once, here, so later working-directory switches
    /// around external invocations cannot change where state lands.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .context("failed to resolve current directory")?
                .join(root)
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    pub fn topics_dir(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join("topics")
    }

    pub fn state_path(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join(STATE_FILE)
    }

    /// Create the session directory and its topic storage area.
    pub fn create_session_dirs(&self, session_id: &str) -> Result<()> {
        let topics = self.topics_dir(session_id);
        fs::create_dir_all(&topics)
            .with_context(|| format!("failed to create session directory: {}", topics.display()))
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.state_path(session_id).exists()
    }

    /// Persist the full session record, replacing any prior record.
    ///
    /// `created_at` from an existing record is carried forward (read-before-
    /// write merge); `updated_at` is stamped here. Every other field is taken
    /// from the caller's record, so callers must pass the complete desired
    /// state including unchanged fields.
    pub fn save(&self, session: &mut Session) -> Result<PathBuf> {
        let path = self.state_path(&session.session_id);

        if let Some(prior) = self.load_if_exists(&session.session_id)? {
            session.created_at = prior.created_at;
        }
        session.updated_at = Utc::now();

        fs::create_dir_all(self.session_dir(&session.session_id)).with_context(|| {
            format!(
                "failed to create session directory: {}",
                self.session_dir(&session.session_id).display()
            )
        })?;

        let json = serde_json::to_string_pretty(session)
            .context("failed to serialize session state")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write session state: {}", path.display()))?;

        Ok(path)
    }

    /// Load the full session record, failing with `SessionNotFound` when no
    /// record exists for the id.
    pub fn load(&self, session_id: &str) -> Result<Session> {
        let path = self.state_path(session_id);

        if !path.exists() {
            return Err(PipelineError::SessionNotFound {
                session_id: session_id.to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read session state: {}", path.display()))?;

        let session: Session = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse session state: {}", path.display()))?;

        Ok(session)
    }

    fn load_if_exists(&self, session_id: &str) -> Result<Option<Session>> {
        if !self.exists(session_id) {
            return Ok(None);
        }
        self.load(session_id).map(Some)
    }

    /// List all stored sessions, sorted by id. Ids are time-derived, so this
    /// is chronological. Unreadable entries are skipped with a warning.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read sessions root: {}", self.root.display()))?;

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(session_id) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.exists(session_id) {
                continue;
            }
            match self.load(session_id) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("skipping unreadable session '{session_id}': {e:#}"),
            }
        }

        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(sessions)
    }
}
