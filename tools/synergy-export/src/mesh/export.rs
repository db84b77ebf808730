//! Model export (host mesh [+ skeleton] -> .mdl record)

use hashbrown::HashMap;
use synergy_common::{
    FACE_TYPE_FLAT, FACE_TYPE_SMOOTH, FaceRecord, LABEL_MAX, LABEL_NONE, Model, pack_alpha,
    pack_color_uv, pack_position,
};

use super::types::Mesh;
use crate::error::{ExportError, ExportResult};
use crate::skeleton::Skeleton;

/// Reserved compositing layer written for every face
const FACE_LAYER: u8 = 0;

/// Build the `.mdl` record for a mesh.
///
/// Without a skeleton every vertex keeps its stored label. With a skeleton,
/// each vertex takes the label of the bone whose vertex group weights it
/// above 0.5 (0 if none), and one origin-marker vertex per bone is appended
/// at the bone head with label `255 - bone label`.
///
/// Double-sided faces get a mirror face (winding reversed, attributes
/// copied) appended after all front faces, in front-face order.
pub fn export_model(mesh: &Mesh, skeleton: Option<&Skeleton>) -> ExportResult<Model> {
    mesh.validate()?;

    let mut model = Model::default();

    match skeleton {
        Some(skeleton) => {
            let labels = bone_labels(skeleton)?;
            let dominant = mesh.dominant_groups();
            for (vertex, group) in mesh.vertices.iter().zip(dominant) {
                let label = group
                    .and_then(|name| labels.get(name).copied())
                    .unwrap_or(LABEL_NONE);
                model.push_vertex(pack_position(vertex.position), label);
            }
            for bone in skeleton.bones() {
                let origin = LABEL_MAX - labels[bone.name.as_str()];
                model.push_vertex(pack_position(bone.head), origin);
            }
        }
        None => {
            for vertex in &mesh.vertices {
                model.push_vertex(pack_position(vertex.position), vertex.label);
            }
        }
    }

    let mut backfaces = Vec::new();
    for face in &mesh.faces {
        let group = &mesh.face_groups[face.face_group];
        let record = FaceRecord {
            indices: face.indices,
            face_type: if face.smooth {
                FACE_TYPE_SMOOTH
            } else {
                FACE_TYPE_FLAT
            },
            color: pack_color_uv(face.uv),
            alpha: pack_alpha(group.opacity),
            label: face.label,
            layer: FACE_LAYER,
        };
        model.push_face(record);
        if group.double_sided {
            backfaces.push(record.mirrored());
        }
    }
    for record in backfaces {
        model.push_face(record);
    }

    model.validate()?;
    Ok(model)
}

/// Label of each bone: its explicit label, or its index in skeleton order
fn bone_labels(skeleton: &Skeleton) -> ExportResult<HashMap<&str, u8>> {
    let bones = skeleton.bones();
    if bones.len() > usize::from(LABEL_MAX) {
        return Err(ExportError::LabelSpaceExhausted { bones: bones.len() });
    }
    Ok(bones
        .iter()
        .enumerate()
        .map(|(index, bone)| (bone.name.as_str(), bone.label.unwrap_or(index as u8)))
        .collect())
}
