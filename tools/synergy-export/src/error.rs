//! Export error type

use synergy_common::FormatError;

/// Error produced while converting between host data and asset records
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Face {face} references vertex {vertex}, but the mesh has {count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        vertex: u32,
        count: usize,
    },

    #[error("Face {face} uses face group {group}, but the mesh has {count} face groups")]
    UnknownFaceGroup {
        face: usize,
        group: usize,
        count: usize,
    },

    #[error("Skeleton has {bones} bones, but at most 255 can be labeled")]
    LabelSpaceExhausted { bones: usize },

    #[error("No free bone id left for '{0}' (ids 0-254 are all taken)")]
    IdSpaceExhausted(String),

    #[error("Duplicate bone name '{0}'")]
    DuplicateBone(String),

    #[error("Parent chain of bone '{0}' loops")]
    ParentCycle(String),
}

/// Result alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;
