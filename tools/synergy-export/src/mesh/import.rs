//! Model import (.mdl record -> host mesh)

use hashbrown::HashMap;
use serde::Deserialize;
use synergy_common::{
    FACE_TYPE_FLAT, FACE_TYPE_SMOOTH, FaceRecord, Model, UvPacking, unpack_position,
};

use super::types::{FaceGroup, Mesh, MeshFace, MeshVertex};

/// Model import settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportOptions {
    /// Color id → UV mapping
    pub uv_packing: UvPacking,
    /// Collapse the trailing block of mirror faces into double-sided faces
    pub fold_backfaces: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            uv_packing: UvPacking::Canonical,
            fold_backfaces: true,
        }
    }
}

/// Lazily creates one face group per `(alpha, double_sided)` key.
///
/// Group ids follow first-encounter order, so two decodes of the same
/// record always produce the same groups.
#[derive(Debug, Default)]
pub struct FaceGroupBuilder {
    groups: Vec<FaceGroup>,
    lookup: HashMap<(u8, bool), usize>,
}

impl FaceGroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group id for a key, creating the group on first use
    pub fn group_for(&mut self, alpha: u8, double_sided: bool) -> usize {
        *self.lookup.entry((alpha, double_sided)).or_insert_with(|| {
            tracing::debug!(
                "Face group {}: alpha={}, double_sided={}",
                self.groups.len(),
                alpha,
                double_sided
            );
            self.groups.push(FaceGroup::from_alpha(alpha, double_sided));
            self.groups.len() - 1
        })
    }

    pub fn finish(self) -> Vec<FaceGroup> {
        self.groups
    }
}

/// Split faces into front faces and the trailing block of mirror faces that
/// export appends for double-sided faces.
///
/// Returns the number of front faces and the double-sided flag of each.
/// The block is the largest trailing run whose faces are, in order, mirrors
/// of a subsequence of the front faces with identical attributes.
pub fn fold_backfaces(faces: &[FaceRecord]) -> (usize, Vec<bool>) {
    let n = faces.len();

    // Upper bound: every face in the block must mirror some earlier face
    let mut first_index: HashMap<FaceRecord, usize> = HashMap::with_capacity(n);
    for (i, face) in faces.iter().enumerate() {
        first_index.entry(*face).or_insert(i);
    }
    let max_block = faces
        .iter()
        .enumerate()
        .rev()
        .take_while(|&(j, face)| first_index.get(&face.mirrored()).is_some_and(|&i| i < j))
        .count()
        .min(n / 2);

    // A block that fits still fits one face shorter, so search for the largest
    let (mut lo, mut hi) = (0, max_block);
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if match_block(faces, mid).is_some() {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    match match_block(faces, lo) {
        Some(double_sided) if lo > 0 => (n - lo, double_sided),
        _ => (n, vec![false; n]),
    }
}

/// Flags of the front faces whose mirrors, in order, form the last `block`
/// faces, or `None` if the trailing block does not fit.
fn match_block(faces: &[FaceRecord], block: usize) -> Option<Vec<bool>> {
    let (front, back) = faces.split_at(faces.len() - block);
    let mut double_sided = vec![false; front.len()];
    let mut matched = 0;
    for (i, face) in front.iter().enumerate() {
        if matched < block && face.mirrored() == back[matched] {
            double_sided[i] = true;
            matched += 1;
        }
    }
    (matched == block).then_some(double_sided)
}

/// Convert a validated model record to a host mesh
pub fn import_model(model: &Model, name: &str, options: &ImportOptions) -> Mesh {
    let mut mesh = Mesh::new(name);

    mesh.vertices = model
        .vertices
        .iter()
        .zip(&model.vertex_label)
        .map(|(&position, &label)| MeshVertex {
            position: unpack_position(position),
            label,
        })
        .collect();

    let records: Vec<FaceRecord> = model.face_records().collect();
    let (front_count, double_sided) = if options.fold_backfaces {
        fold_backfaces(&records)
    } else {
        (records.len(), vec![false; records.len()])
    };
    if front_count < records.len() {
        tracing::debug!(
            "Folded {} backfaces into double-sided faces",
            records.len() - front_count
        );
    }

    let mut builder = FaceGroupBuilder::new();
    mesh.faces = records[..front_count]
        .iter()
        .zip(&double_sided)
        .enumerate()
        .map(|(index, (record, &double_sided))| {
            if record.face_type > FACE_TYPE_FLAT {
                tracing::warn!(
                    "Face {} has unknown face type {}, importing as flat",
                    index,
                    record.face_type
                );
            }
            MeshFace {
                indices: record.indices,
                smooth: record.face_type == FACE_TYPE_SMOOTH,
                uv: options.uv_packing.unpack(record.color),
                face_group: builder.group_for(record.alpha, double_sided),
                label: record.label,
            }
        })
        .collect();
    mesh.face_groups = builder.finish();

    mesh
}
