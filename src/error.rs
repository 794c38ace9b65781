use thiserror::Error;

use crate::store::{AnnotationId, AnnotationKind};

/// Internal consistency failures. These mean a caller broke the contract
/// (reused an id, finished a degenerate line) and are never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invariant {
    #[error("{kind} {id} already exists")]
    DuplicateId { kind: AnnotationKind, id: AnnotationId },
    #[error("line {0} has zero length")]
    ZeroLengthLine(AnnotationId),
    #[error("{kind} {id} has {count} point(s), expected 2")]
    MissingPoint {
        kind: AnnotationKind,
        id: AnnotationId,
        count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CropperError {
    /// The referenced annotation does not exist or is already finished.
    #[error("{kind} {id} not found")]
    NotFound { kind: AnnotationKind, id: AnnotationId },
    #[error("invariant violated: {0}")]
    InvariantViolation(#[from] Invariant),
}

impl CropperError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CropperError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CropperError>;
