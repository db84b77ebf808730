//! Rig export (skeleton -> v2 `.rig` document)

use synergy_common::{LABEL_MAX, RigDocument, VertexGroupEntry};

use super::types::Skeleton;
use crate::error::{ExportError, ExportResult};

/// Build the v2 rig document for a skeleton.
///
/// Bones are written breadth-first from the roots. A bone without an id gets
/// the lowest id in `0..255` not held by any other bone, and empty label
/// lists default to `[255 - id]` (origin) and `[id]` (transform). Ids and
/// defaults are stored back on the bones, so exporting twice yields the
/// same document.
pub fn encode_rig(skeleton: &mut Skeleton) -> ExportResult<RigDocument> {
    let order = skeleton.breadth_first()?;

    let mut taken = [false; 256];
    for bone in skeleton.bones() {
        if let Some(id) = bone.id {
            taken[id as usize] = true;
        }
    }

    // Pick every id before storing any, so a failure leaves the bones as they were
    let mut ids = Vec::with_capacity(order.len());
    for &index in &order {
        let bone = &skeleton.bones()[index];
        let id = match bone.id {
            Some(id) => id,
            None => {
                let id = (0..LABEL_MAX)
                    .find(|&id| !taken[id as usize])
                    .ok_or_else(|| ExportError::IdSpaceExhausted(bone.name.clone()))?;
                taken[id as usize] = true;
                id
            }
        };
        ids.push((index, id));
    }

    for (index, id) in ids {
        let bone = skeleton.bone_mut(index);
        bone.id = Some(id);
        if bone.origin_labels.is_empty() {
            bone.origin_labels = vec![LABEL_MAX - id];
        }
        if bone.transform_labels.is_empty() {
            bone.transform_labels = vec![id];
        }
    }

    let vertex_groups = order
        .iter()
        .map(|&index| {
            let bone = &skeleton.bones()[index];
            VertexGroupEntry {
                name: bone.name.clone(),
                origin_labels: bone.origin_labels.clone(),
                labels: bone.transform_labels.clone(),
                children: order
                    .iter()
                    .filter(|&&child| skeleton.parent_index(child) == Some(index))
                    .map(|&child| skeleton.bones()[child].name.clone())
                    .collect(),
                inherit_scale: bone.inherit_scale.then_some(true),
            }
        })
        .collect();

    Ok(RigDocument {
        vertex_groups,
        face_groups: Vec::new(),
    })
}
