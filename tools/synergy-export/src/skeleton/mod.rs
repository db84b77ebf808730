//! Skeleton inference and rig export (.rig <-> positioned bones)

mod export;
mod inference;
mod rig;
mod types;

// Re-export public API
pub use export::encode_rig;
pub use inference::{
    MIN_BONE_LENGTH, OrphanPolicy, RigOptions, RigOutput, RigWarning, SkinGroup,
    apply_skin_groups, infer_skeleton, rig_mesh,
};
pub use rig::{
    RiggedModel, bake_model, convert_rig, load_rigged_model, read_rig, write_rig, write_skeleton,
};
pub use types::{Bone, PROVISIONAL_TAIL, Skeleton};
