//! Host-side mesh types
//!
//! The shape of a mesh as an editor sees it: float positions in the host's
//! Z-up frame, per-face UV at one representative loop, faces pointing at
//! shared face groups (materials), and named vertex groups with weights.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use synergy_common::unpack_alpha;

use crate::error::{ExportError, ExportResult};

/// Weight above which a vertex group owns a vertex for labeling
pub const DOMINANT_WEIGHT: f32 = 0.5;

/// Mesh vertex
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshVertex {
    /// Position in the host frame
    pub position: Vec3,
    /// Stored label (0 = unlabeled)
    pub label: u8,
}

/// Triangle with its per-face attributes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshFace {
    /// Vertex indices; winding defines facing
    pub indices: [u32; 3],
    /// Smooth shading (otherwise flat)
    pub smooth: bool,
    /// Palette UV shared by every loop of the face
    pub uv: Vec2,
    /// Index into [`Mesh::face_groups`]
    pub face_group: usize,
    /// Face label (reserved, round-tripped)
    pub label: u8,
}

/// Material bucket shared by faces with the same alpha and sidedness
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGroup {
    pub name: String,
    /// Opacity in [0.0, 1.0]
    pub opacity: f32,
    /// Faces render from both sides
    pub double_sided: bool,
}

impl FaceGroup {
    /// Face group for a packed alpha value.
    ///
    /// Named `OPAQUE` for alpha 0 and `ALPHA_<opacity byte>` otherwise, with
    /// a `_DS` suffix when double-sided.
    pub fn from_alpha(alpha: u8, double_sided: bool) -> Self {
        let mut name = if alpha == 0 {
            "OPAQUE".to_string()
        } else {
            format!("ALPHA_{}", 255 - alpha)
        };
        if double_sided {
            name.push_str("_DS");
        }
        Self {
            name,
            opacity: unpack_alpha(alpha),
            double_sided,
        }
    }
}

/// Named skin weight group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexGroup {
    pub name: String,
    /// Vertex index → weight
    pub weights: BTreeMap<u32, f32>,
}

impl VertexGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weights: BTreeMap::new(),
        }
    }

    /// Set the weight of a vertex, replacing any previous value
    pub fn replace(&mut self, vertex: u32, weight: f32) {
        self.weights.insert(vertex, weight);
    }

    pub fn weight(&self, vertex: u32) -> Option<f32> {
        self.weights.get(&vertex).copied()
    }
}

/// Editable triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub faces: Vec<MeshFace>,
    pub face_groups: Vec<FaceGroup>,
    pub vertex_groups: Vec<VertexGroup>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check face indices and face group references
    pub fn validate(&self) -> ExportResult<()> {
        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&vertex) = face.indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ExportError::FaceIndexOutOfRange {
                    face: face_index,
                    vertex,
                    count: vertex_count,
                });
            }
            if face.face_group >= self.face_groups.len() {
                return Err(ExportError::UnknownFaceGroup {
                    face: face_index,
                    group: face.face_group,
                    count: self.face_groups.len(),
                });
            }
        }
        Ok(())
    }

    pub fn vertex_group(&self, name: &str) -> Option<&VertexGroup> {
        self.vertex_groups.iter().find(|g| g.name == name)
    }

    /// Get a vertex group by name, creating an empty one if absent
    pub fn vertex_group_mut(&mut self, name: &str) -> &mut VertexGroup {
        let index = match self.vertex_groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.vertex_groups.push(VertexGroup::new(name));
                self.vertex_groups.len() - 1
            }
        };
        &mut self.vertex_groups[index]
    }

    /// Name of the first vertex group (in group order) weighting each vertex
    /// above [`DOMINANT_WEIGHT`]
    pub fn dominant_groups(&self) -> Vec<Option<&str>> {
        let mut dominant = vec![None; self.vertices.len()];
        for group in &self.vertex_groups {
            for (&vertex, &weight) in &group.weights {
                if weight <= DOMINANT_WEIGHT {
                    continue;
                }
                if let Some(slot) = dominant.get_mut(vertex as usize) {
                    slot.get_or_insert(group.name.as_str());
                }
            }
        }
        dominant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new("quad");
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            mesh.vertices.push(MeshVertex {
                position: Vec3::from_array(p),
                label: 0,
            });
        }
        mesh.face_groups.push(FaceGroup::from_alpha(0, false));
        mesh.faces.push(MeshFace {
            indices: [0, 1, 2],
            ..Default::default()
        });
        mesh.faces.push(MeshFace {
            indices: [0, 2, 3],
            ..Default::default()
        });
        mesh
    }

    #[test]
    fn test_face_group_names() {
        assert_eq!(FaceGroup::from_alpha(0, false).name, "OPAQUE");
        assert_eq!(FaceGroup::from_alpha(128, false).name, "ALPHA_127");
        assert_eq!(FaceGroup::from_alpha(128, true).name, "ALPHA_127_DS");
        assert_eq!(FaceGroup::from_alpha(0, true).name, "OPAQUE_DS");
        assert_eq!(FaceGroup::from_alpha(0, false).opacity, 1.0);
    }

    #[test]
    fn test_validate() {
        let mut mesh = quad();
        assert!(mesh.validate().is_ok());

        mesh.faces[1].indices[2] = 4;
        assert!(matches!(
            mesh.validate(),
            Err(ExportError::FaceIndexOutOfRange { face: 1, vertex: 4, count: 4 })
        ));

        let mut mesh = quad();
        mesh.faces[0].face_group = 1;
        assert!(matches!(
            mesh.validate(),
            Err(ExportError::UnknownFaceGroup { face: 0, .. })
        ));
    }

    #[test]
    fn test_dominant_groups() {
        let mut mesh = quad();
        mesh.vertex_group_mut("a").replace(0, 0.4);
        mesh.vertex_group_mut("a").replace(1, 0.9);
        mesh.vertex_group_mut("b").replace(0, 0.6);
        mesh.vertex_group_mut("b").replace(1, 0.7);
        mesh.vertex_group_mut("b").replace(2, 0.5);

        let dominant = mesh.dominant_groups();
        assert_eq!(dominant, vec![Some("b"), Some("a"), None, None]);
    }

    #[test]
    fn test_vertex_group_mut_reuses_existing() {
        let mut mesh = quad();
        mesh.vertex_group_mut("arm").replace(0, 1.0);
        mesh.vertex_group_mut("arm").replace(0, 0.25);
        assert_eq!(mesh.vertex_groups.len(), 1);
        assert_eq!(mesh.vertex_group("arm").unwrap().weight(0), Some(0.25));
    }
}
