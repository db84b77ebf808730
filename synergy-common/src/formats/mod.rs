//! Rune Synergy asset formats
//!
//! - [`model`] - `.mdl` parallel-array model record
//! - [`rig`] - `.rig` bone hierarchy documents (v1 and v2 schemas)

pub mod model;
pub mod rig;

pub use model::{FACE_TYPE_FLAT, FACE_TYPE_SMOOTH, FaceRecord, LABEL_MAX, LABEL_NONE, Model};
pub use rig::{
    BoneDescriptor, DecodedRig, ROOT_BONE_NAME, RigBone, RigDocument, RigSchema,
    VertexGroupEntry, decode_rig, validate_descriptors,
};

/// Model file extension
pub const MODEL_EXT: &str = "mdl";
/// Rig file extension
pub const RIG_EXT: &str = "rig";
