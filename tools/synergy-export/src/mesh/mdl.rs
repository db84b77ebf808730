//! .mdl file loading and writing

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use synergy_common::Model;

use super::export::export_model;
use super::import::{ImportOptions, import_model};
use super::types::Mesh;

/// Read and validate a `.mdl` record
pub fn read_model(input: &Path) -> Result<Model> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read model: {:?}", input))?;
    Model::from_slice(&bytes).with_context(|| format!("Failed to decode model: {:?}", input))
}

/// Load a `.mdl` file as a host mesh named after the file stem
pub fn load_model(input: &Path, options: &ImportOptions) -> Result<Mesh> {
    let model = read_model(input)?;
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    let mesh = import_model(&model, name, options);

    tracing::info!(
        "Loaded model {:?}: {} vertices, {} faces, {} face groups",
        input,
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.face_groups.len()
    );
    Ok(mesh)
}

/// Serialize a record and write it in one step
pub fn write_model(output: &Path, model: &Model) -> Result<()> {
    let json = model.to_json()?;
    fs::write(output, json).with_context(|| format!("Failed to write model: {:?}", output))
}

/// Decode a `.mdl` file to a host mesh and encode it again
pub fn convert_model(input: &Path, output: &Path, options: &ImportOptions) -> Result<()> {
    let mesh = load_model(input, options)?;
    let model = export_model(&mesh, None)?;
    write_model(output, &model)?;

    tracing::info!(
        "Converted model: {} vertices, {} faces",
        model.vertex_count(),
        model.face_count()
    );
    Ok(())
}
