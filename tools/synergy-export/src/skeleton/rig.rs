//! .rig file loading and writing, and the model + rig pipelines

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use synergy_common::{DecodedRig, RigDocument, decode_rig};

use super::export::encode_rig;
use super::inference::{RigOptions, RigOutput, rig_mesh};
use super::types::Skeleton;
use crate::mesh::{ImportOptions, Mesh, export_model, load_model, write_model};

/// Mesh skinned to an inferred skeleton
#[derive(Debug, Clone)]
pub struct RiggedModel {
    pub mesh: Mesh,
    pub rig: RigOutput,
}

/// Read and validate a `.rig` document in either schema
pub fn read_rig(input: &Path) -> Result<DecodedRig> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read rig: {:?}", input))?;
    decode_rig(&bytes).with_context(|| format!("Failed to decode rig: {:?}", input))
}

pub fn write_rig(output: &Path, document: &RigDocument) -> Result<()> {
    let json = document.to_json()?;
    fs::write(output, json).with_context(|| format!("Failed to write rig: {:?}", output))
}

/// Write the positioned skeleton as pretty JSON
pub fn write_skeleton(output: &Path, skeleton: &Skeleton) -> Result<()> {
    let json = serde_json::to_string_pretty(skeleton)?;
    fs::write(output, json).with_context(|| format!("Failed to write skeleton: {:?}", output))
}

/// Load a model, infer the rig against its labels and skin it
pub fn load_rigged_model(
    model_path: &Path,
    rig_path: &Path,
    import: &ImportOptions,
    options: &RigOptions,
) -> Result<RiggedModel> {
    let mut mesh = load_model(model_path, import)?;
    let decoded = read_rig(rig_path)?;
    let rig = rig_mesh(&mut mesh, &decoded.bones, options)
        .with_context(|| format!("Failed to infer rig: {:?}", rig_path))?;

    tracing::info!(
        "Inferred rig {:?} ({:?}): {} of {} bones placed, {} warnings",
        rig_path,
        decoded.schema,
        rig.skeleton.len(),
        decoded.bones.len(),
        rig.warnings.len()
    );
    Ok(RiggedModel { mesh, rig })
}

/// Infer a rig and write the skeleton JSON, plus the v2 rig document if
/// `rig_output` is given
pub fn convert_rig(
    model_path: &Path,
    rig_path: &Path,
    skeleton_output: &Path,
    rig_output: Option<&Path>,
    import: &ImportOptions,
    options: &RigOptions,
) -> Result<RigOutput> {
    let RiggedModel { mut rig, .. } = load_rigged_model(model_path, rig_path, import, options)?;

    // Encode first so assigned ids appear in the skeleton JSON
    let document = rig_output
        .map(|_| encode_rig(&mut rig.skeleton))
        .transpose()?;

    // Serialize everything before touching the filesystem
    let skeleton_json = serde_json::to_string_pretty(&rig.skeleton)?;
    let rig_json = document.as_ref().map(RigDocument::to_json).transpose()?;

    if let (Some(output), Some(json)) = (rig_output, rig_json) {
        fs::write(output, json).with_context(|| format!("Failed to write rig: {:?}", output))?;
    }
    if let Err(err) = fs::write(skeleton_output, skeleton_json) {
        if let Some(output) = rig_output {
            let _ = fs::remove_file(output);
        }
        return Err(err).with_context(|| format!("Failed to write skeleton: {:?}", skeleton_output));
    }

    if let Some(document) = &document {
        tracing::info!(
            "Exported rig: {} vertex groups",
            document.vertex_groups.len()
        );
    }
    Ok(rig)
}

/// Infer a rig and write the model with bone labels and origin markers
pub fn bake_model(
    model_path: &Path,
    rig_path: &Path,
    output: &Path,
    import: &ImportOptions,
    options: &RigOptions,
) -> Result<RigOutput> {
    let RiggedModel { mesh, rig } = load_rigged_model(model_path, rig_path, import, options)?;
    let model = export_model(&mesh, Some(&rig.skeleton))?;
    write_model(output, &model)?;

    tracing::info!(
        "Baked model: {} vertices ({} bone markers), {} faces",
        model.vertex_count(),
        rig.skeleton.len(),
        model.face_count()
    );
    Ok(rig)
}
