//! synergy-export library
//!
//! Converts between Rune Synergy assets (`.mdl` models, `.rig` bone
//! hierarchies) and an editor-side mesh/skeleton representation, and infers
//! positioned skeletons from labeled model vertices.

pub mod error;
pub mod manifest;
pub mod mesh;
pub mod skeleton;

pub use error::{ExportError, ExportResult};

// Re-export codecs and formats from synergy-common
pub use synergy_common::{
    BoneDescriptor, DecodedRig, MODEL_EXT, Model, RIG_EXT, RigDocument, RigSchema, UvPacking,
    decode_rig, pack_color_uv, pack_position, unpack_color_uv, unpack_position,
};

// Re-export key types for model conversion
pub use mesh::{ImportOptions, LabelIndex, Mesh, export_model, import_model};

// Re-export key types for rig inference and export
pub use skeleton::{
    Bone, OrphanPolicy, RigOptions, RigOutput, RigWarning, Skeleton, encode_rig, infer_skeleton,
    rig_mesh,
};
