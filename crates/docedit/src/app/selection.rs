//! Tracking the active selection between resolution and edit application.

use crate::app::resolve::{Resolution, Resolver};
use crate::domain::errors::DomainError;
use crate::domain::model::ResolvedRange;

/// Holds the most recent resolved selection for a document.
#[derive(Debug, Default, Clone)]
pub struct SelectionTracker {
    resolver: Resolver,
    active: Option<Resolution>,
}

impl SelectionTracker {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            active: None,
        }
    }

    /// Restore a previously resolved range, e.g. from a saved session.
    pub fn with_active(mut self, active: Option<Resolution>) -> Self {
        self.active = active;
        self
    }

    pub fn active(&self) -> Option<&Resolution> {
        self.active.as_ref()
    }

    pub fn range(&self) -> Option<&ResolvedRange> {
        self.active.as_ref().map(|resolution| &resolution.range)
    }

    /// Resolve a freshly captured fragment and make it the active selection.
    ///
    /// The fragment is trimmed first. When it cannot be placed the previous selection is
    /// cleared as well, so no edit is ever applied to an outdated range.
    pub fn select(&mut self, source: &str, fragment: &str) -> Option<&Resolution> {
        self.active = self.resolver.resolve_with_tier(source, fragment.trim());
        if self.active.is_none() {
            tracing::info!("selection could not be matched to the document");
        }
        self.active.as_ref()
    }

    /// Confirm the active selection still matches `source`, dropping it when it does not.
    pub fn validate(&mut self, source: &str) -> Result<Option<&ResolvedRange>, DomainError> {
        if let Some(resolution) = &self.active
            && let Err(err) = resolution.range.validate(source)
        {
            tracing::warn!(error = %err, "discarding stale selection");
            self.active = None;
            return Err(err);
        }
        Ok(self.range())
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
