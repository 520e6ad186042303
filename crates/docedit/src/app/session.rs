//! Session persistence utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::app::history::EditHistory;
use crate::app::resolve::Resolution;
use crate::domain::model::{ChatMessage, MatchTier, Proposal, ResolvedRange};

const SESSION_DIR: &str = ".docedit";
const SESSION_FILE: &str = "session.json";

/// Snapshot of editor state persisted between invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Document being edited.
    pub document: PathBuf,
    /// Active resolved selection, if any.
    #[serde(default)]
    pub selection: Option<SelectionRecord>,
    /// Proposal awaiting accept or discard.
    #[serde(default)]
    pub proposal: Option<Proposal>,
    /// Undo/redo snapshots of the document.
    pub history: EditHistory,
    /// Conversation with the edit source.
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}

impl SessionSnapshot {
    pub fn new(document: impl Into<PathBuf>, history: EditHistory) -> Self {
        Self {
            document: document.into(),
            selection: None,
            proposal: None,
            history,
            chat: Vec::new(),
        }
    }
}

/// Serializable representation of a [`Resolution`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionRecord {
    pub tier: MatchTier,
    #[serde(flatten)]
    pub range: ResolvedRange,
}

impl From<&Resolution> for SelectionRecord {
    fn from(value: &Resolution) -> Self {
        Self {
            tier: value.tier,
            range: value.range.clone(),
        }
    }
}

impl SelectionRecord {
    /// Convert the record back into a [`Resolution`].
    pub fn into_resolution(self) -> Resolution {
        Resolution {
            tier: self.tier,
            range: self.range,
        }
    }
}

/// Persists editor state to a session file under `.docedit/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    path: PathBuf,
}

impl SessionStore {
    /// Create a new store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(SESSION_DIR).join(SESSION_FILE);
        Self { root, path }
    }

    /// Location of the persisted session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the most recently persisted session snapshot.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("invalid session data in {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Persist the provided snapshot to disk, creating parent directories as needed.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize session snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write session file to {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}
