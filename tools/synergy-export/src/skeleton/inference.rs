//! Rig inference (bone descriptors + labeled mesh -> positioned skeleton)
//!
//! Bones are placed from the labeled vertices alone:
//!
//! 1. A bone none of whose origin labels occur in the mesh is skipped.
//! 2. Head = centroid of the vertices carrying any origin label.
//! 3. Every vertex carrying a transform label joins the bone's skin group
//!    with weight 1.0.
//! 4. Parents are linked by name among surviving bones; `ROOT` never gets one.
//! 5. Tails are placed bottom-up from the children and the skinned vertices.
//! 6. Bones shorter than [`MIN_BONE_LENGTH`] are repaired.

use std::fmt;

use glam::Vec3;
use hashbrown::HashMap;
use serde::Deserialize;
use synergy_common::{BoneDescriptor, formats::validate_descriptors};

use super::types::{Bone, Skeleton};
use crate::error::ExportResult;
use crate::mesh::{LabelIndex, Mesh};

/// Bones shorter than this are repaired
pub const MIN_BONE_LENGTH: f32 = 2.0;

/// Tail distance when a short bone is pointed away from its parent
const REPAIR_LENGTH: f32 = 10.0;

/// Tail offset when a short bone has no usable direction
const VERTICAL_FALLBACK: Vec3 = Vec3::new(0.0, 0.0, 20.0);

/// How far a leaf tail extends past its skinned vertices' centroid
const LEAF_OVERSHOOT: f32 = 1.25;

/// What happens to a bone whose named parent was skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanPolicy {
    /// The bone becomes a new root
    #[default]
    Detach,
    /// The bone attaches to its closest surviving ancestor
    NearestAncestor,
}

/// Rig inference settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigOptions {
    /// Remove every vertex group of the mesh before applying skin groups
    pub clear_existing: bool,
    pub orphans: OrphanPolicy,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            clear_existing: true,
            orphans: OrphanPolicy::Detach,
        }
    }
}

/// Non-fatal condition met during inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigWarning {
    /// None of the bone's origin labels occur in the mesh; the bone was skipped
    UnresolvableLabel { bone: String },
    /// The bone had no usable direction and was given a vertical tail
    DegenerateGeometry { bone: String },
}

impl fmt::Display for RigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvableLabel { bone } => {
                write!(f, "Bone '{}' skipped: no vertex carries its origin labels", bone)
            }
            Self::DegenerateGeometry { bone } => {
                write!(f, "Bone '{}' ended up degenerate; tail set vertically", bone)
            }
        }
    }
}

/// Vertices skinned to one bone, all with weight 1.0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinGroup {
    /// Bone name, also the vertex group name
    pub name: String,
    /// Vertex indices in label order, then mesh order
    pub vertices: Vec<u32>,
}

/// Result of rig inference
#[derive(Debug, Clone)]
pub struct RigOutput {
    pub skeleton: Skeleton,
    /// One group per surviving bone, in skeleton order
    pub skin_groups: Vec<SkinGroup>,
    pub warnings: Vec<RigWarning>,
}

/// Place the bones described by `descriptors` against a labeled mesh.
///
/// Performs no mesh mutation; see [`apply_skin_groups`] and [`rig_mesh`].
pub fn infer_skeleton(
    descriptors: &[BoneDescriptor],
    index: &LabelIndex,
    options: &RigOptions,
) -> ExportResult<RigOutput> {
    validate_descriptors(descriptors)?;
    let mut warnings = Vec::new();

    // Eligibility
    let survives: Vec<bool> = descriptors
        .iter()
        .map(|descriptor| {
            let resolves = index.any_resolves(&descriptor.origin_labels);
            if !resolves {
                let warning = RigWarning::UnresolvableLabel {
                    bone: descriptor.name.clone(),
                };
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            resolves
        })
        .collect();

    let lookup: HashMap<&str, usize> = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();

    // Heads, skin groups and parent links
    let mut skeleton = Skeleton::new();
    let mut skin_groups = Vec::new();
    let mut root_markers = Vec::new();
    for (descriptor, _) in descriptors.iter().zip(&survives).filter(|(_, s)| **s) {
        let head = index.centroid(&descriptor.origin_labels).unwrap_or(Vec3::ZERO);

        let mut bone = Bone::new(descriptor.name.clone(), head);
        if !descriptor.is_root_bone() {
            bone.parent =
                resolve_parent(descriptor, descriptors, &lookup, &survives, options.orphans);
        }
        bone.label = descriptor.transform_labels.first().copied();
        bone.origin_labels = descriptor.origin_labels.clone();
        bone.transform_labels = descriptor.transform_labels.clone();
        bone.inherit_scale = descriptor.inherit_scale;

        skin_groups.push(SkinGroup {
            name: descriptor.name.clone(),
            vertices: skin_vertices(index, &descriptor.transform_labels),
        });
        root_markers.push(descriptor.root);
        skeleton.push(bone)?;
    }

    place_tails(&mut skeleton, index, &root_markers, &mut warnings)?;

    tracing::debug!(
        "Inferred {} of {} bones ({} warnings)",
        skeleton.len(),
        descriptors.len(),
        warnings.len()
    );

    Ok(RigOutput {
        skeleton,
        skin_groups,
        warnings,
    })
}

/// Parent of a surviving bone under the orphan policy
fn resolve_parent(
    descriptor: &BoneDescriptor,
    descriptors: &[BoneDescriptor],
    lookup: &HashMap<&str, usize>,
    survives: &[bool],
    policy: OrphanPolicy,
) -> Option<String> {
    let mut current = descriptor.parent.as_deref();
    while let Some(name) = current {
        let &index = lookup.get(name)?;
        if survives[index] {
            return Some(name.to_string());
        }
        match policy {
            OrphanPolicy::Detach => {
                tracing::debug!(
                    "Bone '{}' detached: parent '{}' was skipped",
                    descriptor.name,
                    name
                );
                return None;
            }
            OrphanPolicy::NearestAncestor => {
                let skipped = &descriptors[index];
                current = if skipped.is_root_bone() {
                    None
                } else {
                    skipped.parent.as_deref()
                };
            }
        }
    }
    None
}

/// Vertices carrying any of `labels`, each listed once
fn skin_vertices(index: &LabelIndex, labels: &[u8]) -> Vec<u32> {
    let mut seen = [false; 256];
    let mut vertices = Vec::new();
    for &label in labels {
        if !std::mem::replace(&mut seen[label as usize], true) {
            vertices.extend_from_slice(index.vertices(label));
        }
    }
    vertices
}

/// Tail placement and degeneracy repair, children before parents
fn place_tails(
    skeleton: &mut Skeleton,
    index: &LabelIndex,
    root_markers: &[bool],
    warnings: &mut Vec<RigWarning>,
) -> ExportResult<()> {
    let order = skeleton.breadth_first()?;
    let heads: Vec<Vec3> = skeleton.bones().iter().map(|b| b.head).collect();
    let parents: Vec<Option<usize>> = (0..skeleton.len())
        .map(|i| skeleton.parent_index(i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); skeleton.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(child);
        }
    }

    // ROOT is placed and repaired like any other bone
    for &i in order.iter().rev() {
        let head = heads[i];
        let mut tail = skeleton.bones()[i].tail;
        let mut connected_child = None;

        match children[i].as_slice() {
            [child] => {
                let child = *child;
                if heads[child] != head {
                    tail = heads[child];
                    connected_child = Some(child);
                }
            }
            _ if root_markers[i] => {
                // Subtree roots keep their provisional tail
                continue;
            }
            [] => {
                let label_center = index
                    .centroid(&skeleton.bones()[i].transform_labels)
                    .unwrap_or(head);
                tail = head + LEAF_OVERSHOOT * (label_center - head);
                tracing::debug!("Bone '{}': leaf tip at {}", skeleton.bones()[i].name, tail);
            }
            many => {
                let label_center = index
                    .centroid(&skeleton.bones()[i].transform_labels)
                    .unwrap_or(head);
                let children_center =
                    many.iter().map(|&c| heads[c]).sum::<Vec3>() / many.len() as f32;
                let direction = (label_center - head).normalize_or_zero();
                let distance = (label_center - children_center).length();
                tail = label_center + direction * distance * 0.5;
                tracing::debug!(
                    "Bone '{}': branch tip at {} over {} children",
                    skeleton.bones()[i].name,
                    tail,
                    many.len()
                );
            }
        }

        if (tail - head).length() < MIN_BONE_LENGTH {
            let away = parents[i]
                .map(|p| (head - heads[p]).normalize_or_zero())
                .filter(|direction| *direction != Vec3::ZERO);
            tail = match away {
                Some(direction) => {
                    tracing::debug!(
                        "Bone '{}' too short, pointing away from its parent",
                        skeleton.bones()[i].name
                    );
                    head + direction * REPAIR_LENGTH
                }
                None => {
                    let warning = RigWarning::DegenerateGeometry {
                        bone: skeleton.bones()[i].name.clone(),
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                    head + VERTICAL_FALLBACK
                }
            };
            // The tail no longer sits on the child's head
            connected_child = None;
        }

        skeleton.bone_mut(i).tail = tail;
        if let Some(child) = connected_child {
            skeleton.bone_mut(child).connected = true;
            tracing::debug!(
                "Bone '{}' connected to '{}'",
                skeleton.bones()[i].name,
                skeleton.bones()[child].name
            );
        }
    }

    Ok(())
}

/// Write skin groups into the mesh's vertex groups (weight 1.0, replace)
pub fn apply_skin_groups(mesh: &mut Mesh, groups: &[SkinGroup], clear_existing: bool) {
    if clear_existing {
        mesh.vertex_groups.clear();
    }
    for group in groups {
        let vertex_group = mesh.vertex_group_mut(&group.name);
        for &vertex in &group.vertices {
            vertex_group.replace(vertex, 1.0);
        }
    }
}

/// Infer a skeleton from the mesh's labels and skin the mesh to it
pub fn rig_mesh(
    mesh: &mut Mesh,
    descriptors: &[BoneDescriptor],
    options: &RigOptions,
) -> ExportResult<RigOutput> {
    let index = LabelIndex::build(mesh);
    let output = infer_skeleton(descriptors, &index, options)?;
    apply_skin_groups(mesh, &output.skin_groups, options.clear_existing);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshVertex;

    fn mesh(points: &[([f32; 3], u8)]) -> Mesh {
        let mut mesh = Mesh::new("rig");
        for &(p, label) in points {
            mesh.vertices.push(MeshVertex {
                position: Vec3::from_array(p),
                label,
            });
        }
        mesh
    }

    fn descriptor(
        name: &str,
        parent: Option<&str>,
        origins: &[u8],
        rotates: &[u8],
    ) -> BoneDescriptor {
        BoneDescriptor {
            name: name.into(),
            parent: parent.map(str::to_string),
            origin_labels: origins.to_vec(),
            transform_labels: rotates.to_vec(),
            ..Default::default()
        }
    }

    fn infer(mesh: &Mesh, descriptors: &[BoneDescriptor]) -> RigOutput {
        infer_skeleton(descriptors, &LabelIndex::build(mesh), &RigOptions::default()).unwrap()
    }

    #[test]
    fn test_single_root_repaired_vertically() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1)]);
        let output = infer(&mesh, &[descriptor("ROOT", None, &[1], &[1])]);

        let root = output.skeleton.get("ROOT").unwrap();
        assert_eq!(root.head, Vec3::ZERO);
        assert_eq!(root.tail, Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(
            output.warnings,
            vec![RigWarning::DegenerateGeometry { bone: "ROOT".into() }]
        );
    }

    #[test]
    fn test_chain_is_connected() {
        let mesh = mesh(&[
            ([0.0, 0.0, 0.0], 1),
            ([0.0, 0.0, 10.0], 2),
            ([0.0, 0.0, 20.0], 3),
            ([0.0, 0.0, 30.0], 3),
        ]);
        let output = infer(
            &mesh,
            &[
                descriptor("a", None, &[1], &[1]),
                descriptor("b", Some("a"), &[2], &[2]),
                descriptor("c", Some("b"), &[3], &[3]),
            ],
        );
        let s = &output.skeleton;
        let (a, b, c) = (s.get("a").unwrap(), s.get("b").unwrap(), s.get("c").unwrap());
        assert_eq!(a.tail, b.head);
        assert_eq!(b.tail, c.head);
        assert!(!a.connected);
        assert!(b.connected);
        assert!(c.connected);
        // Leaf: head (0,0,25), label center (0,0,25) is degenerate, so it
        // points away from b
        assert_eq!(c.head, Vec3::new(0.0, 0.0, 25.0));
        assert_eq!(c.tail, Vec3::new(0.0, 0.0, 35.0));
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_leaf_overshoots_label_center() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([8.0, 0.0, 0.0], 2)]);
        let output = infer(&mesh, &[descriptor("arm", None, &[1], &[2])]);
        let arm = output.skeleton.get("arm").unwrap();
        assert_eq!(arm.tail, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_branch_tail() {
        let mesh = mesh(&[
            ([0.0, 0.0, 0.0], 1),
            ([0.0, 0.0, 10.0], 2),
            ([4.0, 0.0, 20.0], 3),
            ([-4.0, 0.0, 20.0], 4),
        ]);
        let output = infer(
            &mesh,
            &[
                descriptor("hips", None, &[1], &[2]),
                descriptor("left", Some("hips"), &[3], &[3]),
                descriptor("right", Some("hips"), &[4], &[4]),
            ],
        );
        // label center (0,0,10), children center (0,0,20): 10 + 10 * 0.5
        let hips = output.skeleton.get("hips").unwrap();
        assert_eq!(hips.tail, Vec3::new(0.0, 0.0, 15.0));
        assert!(!output.skeleton.get("left").unwrap().connected);
    }

    #[test]
    fn test_root_marker_keeps_provisional_tail() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1)]);
        let mut hips = descriptor("hips", None, &[1], &[1]);
        hips.root = true;
        let output = infer(&mesh, &[hips]);
        let bone = output.skeleton.get("hips").unwrap();
        assert_eq!(bone.tail, Vec3::new(0.0, 10.0, 0.0));
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_child_sharing_head_keeps_provisional_tail() {
        let mesh = mesh(&[([1.0, 2.0, 3.0], 1)]);
        let output = infer(
            &mesh,
            &[
                descriptor("ROOT", None, &[1], &[1]),
                descriptor("pelvis", Some("ROOT"), &[1], &[]),
            ],
        );
        let root = output.skeleton.get("ROOT").unwrap();
        assert_eq!(root.tail, Vec3::new(1.0, 12.0, 3.0));
        assert!(!output.skeleton.get("pelvis").unwrap().connected);
    }

    #[test]
    fn test_repair_points_away_from_parent() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([3.0, 4.0, 0.0], 2)]);
        let output = infer(
            &mesh,
            &[
                descriptor("ROOT", None, &[1], &[1]),
                descriptor("head", Some("ROOT"), &[2], &[2]),
            ],
        );
        let head = output.skeleton.get("head").unwrap();
        assert!(head.length() >= MIN_BONE_LENGTH);
        assert!((head.tail - Vec3::new(9.0, 12.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_root_never_gets_a_parent() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([0.0, 0.0, 10.0], 2)]);
        let output = infer(
            &mesh,
            &[
                descriptor("spine", None, &[2], &[2]),
                descriptor("ROOT", Some("spine"), &[1], &[1]),
            ],
        );
        assert_eq!(output.skeleton.get("ROOT").unwrap().parent, None);
    }

    #[test]
    fn test_root_parent_loop_is_ignored() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([0.0, 0.0, 10.0], 2)]);

        let output = infer(&mesh, &[descriptor("ROOT", Some("ROOT"), &[1], &[1])]);
        assert_eq!(output.skeleton.len(), 1);
        assert_eq!(output.skeleton.get("ROOT").unwrap().parent, None);

        let output = infer(
            &mesh,
            &[
                descriptor("ROOT", Some("spine"), &[1], &[1]),
                descriptor("spine", Some("ROOT"), &[2], &[2]),
            ],
        );
        assert_eq!(output.skeleton.len(), 2);
        assert_eq!(output.skeleton.get("ROOT").unwrap().parent, None);
        assert_eq!(
            output.skeleton.get("spine").unwrap().parent.as_deref(),
            Some("ROOT")
        );
    }

    #[test]
    fn test_skipped_bone_and_orphans() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([0.0, 0.0, 10.0], 3)]);
        let descriptors = [
            descriptor("ROOT", None, &[1], &[1]),
            descriptor("spine", Some("ROOT"), &[2], &[2]),
            descriptor("neck", Some("spine"), &[3], &[3]),
        ];

        let output = infer(&mesh, &descriptors);
        assert!(output.skeleton.get("spine").is_none());
        assert_eq!(output.skeleton.get("neck").unwrap().parent, None);
        assert_eq!(
            output.warnings[0],
            RigWarning::UnresolvableLabel { bone: "spine".into() }
        );
        assert_eq!(output.skin_groups.len(), 2);

        let options = RigOptions {
            orphans: OrphanPolicy::NearestAncestor,
            ..Default::default()
        };
        let output = infer_skeleton(&descriptors, &LabelIndex::build(&mesh), &options).unwrap();
        assert_eq!(
            output.skeleton.get("neck").unwrap().parent.as_deref(),
            Some("ROOT")
        );
        assert!(output.skeleton.get("neck").unwrap().connected);
    }

    #[test]
    fn test_duplicate_descriptor_is_rejected() {
        let mesh = mesh(&[([0.0, 0.0, 0.0], 1)]);
        let descriptors = [
            descriptor("ROOT", None, &[1], &[1]),
            descriptor("ROOT", None, &[1], &[1]),
        ];
        let index = LabelIndex::build(&mesh);
        let result = infer_skeleton(&descriptors, &index, &RigOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mesh = mesh(&[
            ([0.3, 0.1, 0.7], 1),
            ([1.7, 2.2, 9.1], 2),
            ([4.1, 0.5, 20.9], 3),
            ([-3.3, 1.0, 19.4], 4),
            ([0.9, 8.8, 3.3], 2),
        ]);
        let descriptors = [
            descriptor("ROOT", None, &[1], &[1, 2]),
            descriptor("l", Some("ROOT"), &[3], &[3]),
            descriptor("r", Some("ROOT"), &[4], &[4, 2]),
        ];
        let first = infer(&mesh, &descriptors);
        for _ in 0..8 {
            let again = infer(&mesh, &descriptors);
            assert_eq!(again.skeleton.bones(), first.skeleton.bones());
        }
    }

    #[test]
    fn test_rig_mesh_applies_groups() {
        let mut mesh = mesh(&[([0.0, 0.0, 0.0], 1), ([0.0, 0.0, 10.0], 2), ([0.0, 0.0, 11.0], 2)]);
        mesh.vertex_group_mut("stale").replace(0, 0.3);

        let descriptors = [
            descriptor("ROOT", None, &[1], &[1]),
            descriptor("spine", Some("ROOT"), &[2], &[2, 2]),
        ];
        rig_mesh(&mut mesh, &descriptors, &RigOptions::default()).unwrap();
        assert!(mesh.vertex_group("stale").is_none());
        let spine = mesh.vertex_group("spine").unwrap();
        assert_eq!(spine.weights.len(), 2);
        assert_eq!(spine.weight(2), Some(1.0));

        let options = RigOptions {
            clear_existing: false,
            ..Default::default()
        };
        mesh.vertex_group_mut("stale").replace(0, 0.3);
        rig_mesh(&mut mesh, &descriptors, &options).unwrap();
        assert_eq!(mesh.vertex_group("stale").unwrap().weight(0), Some(0.3));
    }
}
