//! Domain models for selections, proposals, and the conversation log.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::errors::DomainError;

/// A span of the source document located from a rendered-view fragment.
///
/// Offsets are byte offsets into the UTF-8 source and always sit on `char`
/// boundaries, so `&source[start..end] == text` holds for any range the
/// resolver hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl ResolvedRange {
    /// Build a range by slicing `source`. Callers guarantee valid boundaries.
    pub(crate) fn from_source(source: &str, start: usize, end: usize) -> Self {
        Self {
            text: source[start..end].to_owned(),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check that the range still reproduces its text in `source`.
    pub fn validate(&self, source: &str) -> Result<(), DomainError> {
        match source.get(self.start..self.end) {
            Some(slice) if slice == self.text => Ok(()),
            _ => Err(DomainError::StaleSelection {
                start: self.start,
                end: self.end,
            }),
        }
    }
}

/// Which resolution strategy produced a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    /// Literal substring match.
    Exact,
    /// Match after collapsing whitespace runs.
    Normalized,
    /// Span bracketed by the first and last anchor words.
    Bracketed,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Normalized => "normalized",
            MatchTier::Bracketed => "bracketed",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an edit request operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EditScope {
    Selection { range: ResolvedRange },
    Document,
}

impl EditScope {
    pub fn label(&self) -> &'static str {
        match self {
            EditScope::Selection { .. } => "selection",
            EditScope::Document => "document",
        }
    }
}

/// A change returned by the edit source, awaiting accept or discard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub scope: EditScope,
    pub prompt: String,
    pub before: String,
    pub after: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Author of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One entry of the edit conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_detects_shifted_text() {
        let range = ResolvedRange::from_source("alpha beta", 6, 10);
        assert_eq!(range.text, "beta");
        assert!(range.validate("alpha beta").is_ok());
        assert_eq!(
            range.validate("alpha  beta"),
            Err(DomainError::StaleSelection { start: 6, end: 10 })
        );
        assert!(range.validate("alpha").is_err());
    }

    #[test]
    fn scope_serializes_with_kind_tag() {
        let scope = EditScope::Selection {
            range: ResolvedRange::from_source("abc", 0, 1),
        };
        let json = serde_json::to_string(&scope).unwrap();
        assert!(json.contains("\"kind\":\"selection\""));
        assert_eq!(
            serde_json::to_string(&EditScope::Document).unwrap(),
            "{\"kind\":\"document\"}"
        );
    }
}
