//! Skeleton arena
//!
//! Bones live in a flat list in creation order. Parents are referenced by
//! name and resolved by lookup; children are never stored, only computed.

use std::collections::VecDeque;

use glam::Vec3;
use hashbrown::HashMap;
use serde::Serialize;

use crate::error::{ExportError, ExportResult};

/// Offset of a freshly placed bone's tail from its head
pub const PROVISIONAL_TAIL: Vec3 = Vec3::new(0.0, 10.0, 0.0);

/// Positioned bone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bone {
    pub name: String,
    /// Parent bone name; a name that matches no bone acts as no parent
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
    /// Head sits on the parent's tail (continuous chain)
    pub connected: bool,
    /// Rig export id, assigned on first export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u8>,
    /// Vertex label for model export (defaults to the bone index)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<u8>,
    pub origin_labels: Vec<u8>,
    pub transform_labels: Vec<u8>,
    pub inherit_scale: bool,
}

impl Bone {
    /// Unparented bone at `head` with a provisional tail
    pub fn new(name: impl Into<String>, head: Vec3) -> Self {
        Self {
            name: name.into(),
            parent: None,
            head,
            tail: head + PROVISIONAL_TAIL,
            connected: false,
            id: None,
            label: None,
            origin_labels: Vec::new(),
            transform_labels: Vec::new(),
            inherit_scale: false,
        }
    }

    pub fn length(&self) -> f32 {
        (self.tail - self.head).length()
    }
}

/// Bone hierarchy with name lookup
#[derive(Debug, Clone, Default, Serialize)]
pub struct Skeleton {
    bones: Vec<Bone>,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone. Names must be unique.
    pub fn push(&mut self, bone: Bone) -> ExportResult<usize> {
        if self.lookup.contains_key(&bone.name) {
            return Err(ExportError::DuplicateBone(bone.name));
        }
        let index = self.bones.len();
        self.lookup.insert(bone.name.clone(), index);
        self.bones.push(bone);
        Ok(index)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Bone> {
        self.index_of(name).map(|i| &self.bones[i])
    }

    /// Mutable access for editing positions and labels.
    ///
    /// Renaming through this reference is not supported; the name index
    /// would go stale.
    pub(crate) fn bone_mut(&mut self, index: usize) -> &mut Bone {
        &mut self.bones[index]
    }

    /// Index of a bone's parent, if the parent name resolves
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.bones[index]
            .parent
            .as_deref()
            .and_then(|name| self.index_of(name))
    }

    pub fn parent(&self, bone: &Bone) -> Option<&Bone> {
        bone.parent.as_deref().and_then(|name| self.get(name))
    }

    /// Bones whose parent is `name`, in bone order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bone> + 'a {
        self.bones
            .iter()
            .filter(move |b| b.parent.as_deref() == Some(name))
    }

    /// Bones without a resolvable parent, in bone order
    pub fn roots(&self) -> impl Iterator<Item = &Bone> + '_ {
        (0..self.bones.len())
            .filter(|&i| self.parent_index(i).is_none())
            .map(|i| &self.bones[i])
    }

    /// Bone indices in breadth-first order from the roots.
    ///
    /// Roots come in bone order, and each bone's children in bone order.
    /// Fails if a parent chain loops, since such bones are unreachable.
    pub fn breadth_first(&self) -> ExportResult<Vec<usize>> {
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.bones.len()];
        let mut queue = VecDeque::new();
        for index in 0..self.bones.len() {
            match self.parent_index(index) {
                Some(parent) => children[parent].push(index),
                None => queue.push_back(index),
            }
        }

        let mut order = Vec::with_capacity(self.bones.len());
        while let Some(index) = queue.pop_front() {
            order.push(index);
            queue.extend(children[index].iter().copied());
        }

        if order.len() != self.bones.len() {
            let mut visited = vec![false; self.bones.len()];
            for &index in &order {
                visited[index] = true;
            }
            let stuck = visited.iter().position(|v| !v).unwrap_or_default();
            return Err(ExportError::ParentCycle(self.bones[stuck].name.clone()));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, parent: Option<&str>) -> Bone {
        let mut bone = Bone::new(name, Vec3::ZERO);
        bone.parent = parent.map(str::to_string);
        bone
    }

    fn skeleton(bones: &[(&str, Option<&str>)]) -> Skeleton {
        let mut skeleton = Skeleton::new();
        for &(name, parent) in bones {
            skeleton.push(bone(name, parent)).unwrap();
        }
        skeleton
    }

    #[test]
    fn test_duplicate_bone() {
        let mut s = skeleton(&[("ROOT", None)]);
        assert!(matches!(
            s.push(bone("ROOT", None)),
            Err(ExportError::DuplicateBone(name)) if name == "ROOT"
        ));
    }

    #[test]
    fn test_provisional_tail() {
        let b = Bone::new("b", Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.tail, Vec3::new(1.0, 12.0, 3.0));
        assert_eq!(b.length(), 10.0);
    }

    #[test]
    fn test_children_and_roots() {
        let s = skeleton(&[
            ("ROOT", None),
            ("a", Some("ROOT")),
            ("b", Some("ROOT")),
            ("c", Some("a")),
            ("orphan", Some("missing")),
        ]);
        let children: Vec<_> = s.children("ROOT").map(|b| b.name.as_str()).collect();
        assert_eq!(children, vec!["a", "b"]);
        let roots: Vec<_> = s.roots().map(|b| b.name.as_str()).collect();
        assert_eq!(roots, vec!["ROOT", "orphan"]);
        assert_eq!(s.parent(s.get("c").unwrap()).unwrap().name, "a");
    }

    #[test]
    fn test_breadth_first() {
        let s = skeleton(&[
            ("c", Some("a")),
            ("ROOT", None),
            ("a", Some("ROOT")),
            ("d", Some("b")),
            ("b", Some("ROOT")),
        ]);
        let names: Vec<_> = s
            .breadth_first()
            .unwrap()
            .into_iter()
            .map(|i| s.bones()[i].name.as_str())
            .collect();
        assert_eq!(names, vec!["ROOT", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_breadth_first_cycle() {
        let s = skeleton(&[("ROOT", None), ("a", Some("b")), ("b", Some("a"))]);
        assert!(matches!(
            s.breadth_first(),
            Err(ExportError::ParentCycle(name)) if name == "a"
        ));
    }
}
