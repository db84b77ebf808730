//! Label → vertex index

use std::collections::BTreeMap;

use glam::Vec3;

use super::Mesh;

/// Read-only grouping of mesh vertices by their label.
///
/// Built once per rig import and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    groups: BTreeMap<u8, Vec<u32>>,
    positions: Vec<Vec3>,
}

impl LabelIndex {
    pub fn build(mesh: &Mesh) -> Self {
        let mut groups: BTreeMap<u8, Vec<u32>> = BTreeMap::new();
        for (index, vertex) in mesh.vertices.iter().enumerate() {
            groups.entry(vertex.label).or_default().push(index as u32);
        }
        Self {
            groups,
            positions: mesh.vertices.iter().map(|v| v.position).collect(),
        }
    }

    pub fn contains(&self, label: u8) -> bool {
        self.groups.contains_key(&label)
    }

    /// Whether at least one of `labels` has vertices
    pub fn any_resolves(&self, labels: &[u8]) -> bool {
        labels.iter().any(|&label| self.contains(label))
    }

    /// Vertices carrying `label`, in mesh order
    pub fn vertices(&self, label: u8) -> &[u32] {
        self.groups.get(&label).map(Vec::as_slice).unwrap_or_default()
    }

    /// Labels present in the mesh, ascending
    pub fn labels(&self) -> impl Iterator<Item = u8> + '_ {
        self.groups.keys().copied()
    }

    pub fn position(&self, vertex: u32) -> Vec3 {
        self.positions[vertex as usize]
    }

    /// Mean position of every vertex carrying any of `labels`.
    ///
    /// Repeated labels count once. `None` when no vertex matches.
    pub fn centroid(&self, labels: &[u8]) -> Option<Vec3> {
        let mut seen = [false; 256];
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;

        for &label in labels {
            if std::mem::replace(&mut seen[label as usize], true) {
                continue;
            }
            for &vertex in self.vertices(label) {
                sum += self.position(vertex);
                count += 1;
            }
        }

        (count > 0).then(|| sum / count as f32)
    }
}
