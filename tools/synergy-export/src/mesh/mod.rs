//! Model conversion (.mdl <-> host mesh)

mod export;
mod import;
mod labels;
mod mdl;
mod types;

// Re-export public API
pub use export::export_model;
pub use import::{FaceGroupBuilder, ImportOptions, fold_backfaces, import_model};
pub use labels::LabelIndex;
pub use mdl::{convert_model, load_model, read_model, write_model};
pub use types::{DOMINANT_WEIGHT, FaceGroup, Mesh, MeshFace, MeshVertex, VertexGroup};
