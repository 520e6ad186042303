//! Editor session tying documents, selections, proposals, and history together.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::app::diff::{DiffView, render_diff};
use crate::app::edit::{EditReply, EditRequest, EditSource, PromptRenderer, parse_reply};
use crate::app::history::{EditHistory, HistoryEntry};
use crate::app::resolve::{Resolution, Resolver};
use crate::app::selection::SelectionTracker;
use crate::app::session::{SelectionRecord, SessionSnapshot, SessionStore};
use crate::domain::model::{ChatMessage, ChatRole, Proposal};
use crate::infra::config::Config;
use crate::infra::document::DocumentFile;

/// Result of sending an edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposeOutcome {
    /// A proposal is pending; the diff shows the change.
    Proposed(DiffView),
    /// The edit source declined with the given reason.
    Rejected(String),
}

/// A persisted editing session on a single document.
pub struct EditorSession {
    config: Config,
    store: SessionStore,
    document: DocumentFile,
    state: SessionSnapshot,
    selection: SelectionTracker,
    prompts: PromptRenderer,
}

impl EditorSession {
    /// Start a fresh session on `path`, replacing any existing session under `root`.
    pub fn open(config: Config, root: &Path, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = DocumentFile::new(root.join(&path));
        let text = document.read()?;
        let history = EditHistory::new(text, config.editor.history_limit);
        let state = SessionSnapshot::new(path, history);

        let session = Self::assemble(config, root, state)?;
        session.save()?;
        tracing::info!(path = %session.document.path().display(), "opened document");
        Ok(session)
    }

    /// Resume the session persisted under `root`.
    pub fn load(config: Config, root: &Path) -> Result<Self> {
        let store = SessionStore::new(root);
        let mut state = store
            .load()?
            .ok_or_else(|| anyhow!("no open document; run `docedit open <FILE>` first"))?;
        state.history.set_limit(config.editor.history_limit);
        Self::assemble(config, root, state)
    }

    fn assemble(config: Config, root: &Path, state: SessionSnapshot) -> Result<Self> {
        let resolver = Resolver::from_config(&config);
        let selection = SelectionTracker::new(resolver).with_active(
            state
                .selection
                .clone()
                .map(SelectionRecord::into_resolution),
        );
        Ok(Self {
            store: SessionStore::new(root),
            document: DocumentFile::new(root.join(&state.document)),
            prompts: PromptRenderer::new()?,
            config,
            state,
            selection,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document_path(&self) -> &Path {
        self.document.path()
    }

    /// Current document text as stored on disk.
    pub fn text(&self) -> Result<String> {
        self.document.read()
    }

    pub fn selection(&self) -> Option<&Resolution> {
        self.selection.active()
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.state.proposal.as_ref()
    }

    pub fn history(&self) -> &EditHistory {
        &self.state.history
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.state.chat
    }

    /// Resolve a fragment copied from the rendered document into the active selection.
    pub fn select(&mut self, fragment: &str) -> Result<Option<Resolution>> {
        let text = self.text()?;
        let resolved = self.selection.select(&text, fragment).cloned();
        self.save()?;
        Ok(resolved)
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.selection.clear();
        self.save()
    }

    /// Ask `source` to rewrite the active selection (or the whole document).
    ///
    /// A selection that no longer matches the document is discarded and reported as an
    /// error rather than silently widened to the whole document.
    pub fn propose(
        &mut self,
        source: &dyn EditSource,
        prompt: &str,
        whole_document: bool,
    ) -> Result<ProposeOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bail!("edit prompt is empty");
        }

        let text = self.text()?;
        let validated = self.selection.validate(&text).map(|range| range.cloned());
        let range = match validated {
            Ok(range) => range,
            Err(err) => {
                self.save()?;
                return Err(err).context("reselect the text and try again");
            }
        };
        let range = if whole_document { None } else { range };

        let request = EditRequest::new(prompt, range);
        let rendered = self
            .prompts
            .render(&request, &text, self.config.edit.template())?;
        self.state.chat.push(ChatMessage::new(ChatRole::User, prompt));

        let reply = source.complete(&rendered)?;
        let outcome = match parse_reply(&reply) {
            EditReply::Rejected(reason) => {
                tracing::info!(reason = %reason, "edit source declined request");
                self.state
                    .chat
                    .push(ChatMessage::new(ChatRole::System, format!("ERROR: {reason}")));
                ProposeOutcome::Rejected(reason)
            }
            EditReply::Replacement(replacement) => {
                self.state
                    .chat
                    .push(ChatMessage::new(ChatRole::Assistant, replacement.clone()));
                let proposal = Proposal::from_reply(&request, &text, replacement);
                let view = self.render_proposal(&proposal);
                self.state.proposal = Some(proposal);
                ProposeOutcome::Proposed(view)
            }
        };

        self.save()?;
        Ok(outcome)
    }

    /// Diff of the pending proposal, if there is one.
    pub fn diff(&self) -> Option<DiffView> {
        self.proposal().map(|proposal| self.render_proposal(proposal))
    }

    fn render_proposal(&self, proposal: &Proposal) -> DiffView {
        render_diff(&proposal.before, &proposal.after, self.config.diff.context_lines)
    }

    /// Apply the pending proposal to the document and record it in the history.
    pub fn accept(&mut self) -> Result<String> {
        let proposal = self
            .state
            .proposal
            .clone()
            .ok_or_else(|| anyhow!("no pending proposal to accept"))?;
        let text = self.text()?;

        let updated = match proposal.apply(&text) {
            Ok(updated) => updated,
            Err(err) => {
                self.state.proposal = None;
                self.selection.clear();
                self.save()?;
                return Err(err).context("document changed since the proposal was made");
            }
        };

        if self.state.history.current().content != text {
            self.state.history.record(text, "external change");
        }
        self.document.write(&updated)?;
        self.state
            .history
            .record(updated.clone(), format!("{}: {}", proposal.scope.label(), proposal.prompt));
        self.state.proposal = None;
        self.selection.clear();
        self.save()?;
        Ok(updated)
    }

    /// Drop the pending proposal. Returns `false` when there was none.
    pub fn discard(&mut self) -> Result<bool> {
        let had_proposal = self.state.proposal.take().is_some();
        self.save()?;
        Ok(had_proposal)
    }

    /// Restore the previous snapshot and write it to the document.
    pub fn undo(&mut self) -> Result<Option<HistoryEntry>> {
        let entry = self.state.history.undo().cloned();
        self.restore(entry)
    }

    /// Restore the next snapshot and write it to the document.
    pub fn redo(&mut self) -> Result<Option<HistoryEntry>> {
        let entry = self.state.history.redo().cloned();
        self.restore(entry)
    }

    fn restore(&mut self, entry: Option<HistoryEntry>) -> Result<Option<HistoryEntry>> {
        if let Some(entry) = &entry {
            self.document.write(&entry.content)?;
            self.selection.clear();
            self.state.proposal = None;
            self.save()?;
        }
        Ok(entry)
    }

    fn save(&self) -> Result<()> {
        let mut snapshot = self.state.clone();
        snapshot.selection = self.selection.active().map(SelectionRecord::from);
        self.store.save(&snapshot)
    }
}
