//! Shared formats and packing codecs for Rune Synergy assets
//!
//! This crate provides the file-level pieces shared between the exporter
//! library and its command line tool:
//!
//! # Modules
//!
//! - [`packing`] - Position, palette color/UV and alpha quantization
//! - [`formats`] - `.mdl` and `.rig` JSON documents
//! - [`error`] - Format error type

pub mod error;
pub mod formats;
pub mod packing;

pub use error::{FormatError, FormatResult};

// Re-export commonly used packing items
pub use packing::{
    PALETTE_COLUMNS, PALETTE_ROWS, UvPacking, pack_alpha, pack_color_uv, pack_position,
    round_half_up, unpack_alpha, unpack_color_uv, unpack_color_uv_legacy, unpack_position,
};

// Re-export commonly used format items
pub use formats::{
    BoneDescriptor, DecodedRig, FACE_TYPE_FLAT, FACE_TYPE_SMOOTH, FaceRecord, LABEL_MAX,
    LABEL_NONE, MODEL_EXT, Model, RIG_EXT, ROOT_BONE_NAME, RigDocument, RigSchema,
    VertexGroupEntry, decode_rig,
};
