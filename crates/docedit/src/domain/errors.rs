//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("selection {start}..{end} no longer matches the document")]
    StaleSelection { start: usize, end: usize },
    #[error("document changed since the edit was proposed")]
    StaleDocument,
    #[error("range {start}..{end} is outside the document (length {len})")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("range {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },
}
