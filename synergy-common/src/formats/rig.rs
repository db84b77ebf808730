//! `.rig` bone hierarchy documents
//!
//! Two schemas exist on disk and both are read:
//!
//! - **v1 (`bones`)** - written by the content tools and consumed by rig
//!   import. Each entry names its parent.
//!   ```text
//!   { "bones": [ { "name", "parent", "origins": [..], "rotates": [..], "root"? } ] }
//!   ```
//! - **v2 (`vertex_groups`)** - written by rig export. Each entry lists its
//!   children; parents are implied.
//!   ```text
//!   { "vertex_groups": [ { "name", "origin_labels": [..], "labels": [..],
//!                          "children": [..], "inherit_scale"? } ],
//!     "face_groups": [] }
//!   ```
//!
//! Both decode to the same [`BoneDescriptor`] list. Only v2 is ever written.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// Name of the bone that never receives a parent
pub const ROOT_BONE_NAME: &str = "ROOT";

/// Which on-disk schema a rig document used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigSchema {
    /// `bones` entries with `origins`/`rotates`/`parent`
    V1Bones,
    /// `vertex_groups` entries with `origin_labels`/`labels`/`children`
    V2VertexGroups,
}

/// Schema-independent description of one bone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoneDescriptor {
    /// Unique bone name
    pub name: String,
    /// Parent bone name (`None` for roots)
    pub parent: Option<String>,
    /// Labels whose vertex centroid places the bone head
    pub origin_labels: Vec<u8>,
    /// Labels whose vertices are skinned to this bone
    pub transform_labels: Vec<u8>,
    /// Explicit subtree-root marker (v1 `root: true`)
    pub root: bool,
    /// Inherit parent scale (v2 `inherit_scale: true`)
    pub inherit_scale: bool,
}

impl BoneDescriptor {
    /// Whether this is the bone named `ROOT`
    pub fn is_root_bone(&self) -> bool {
        self.name == ROOT_BONE_NAME
    }
}

// ============================================================================
// v1 - `bones`
// ============================================================================

/// v1 bone entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RigBone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub origins: Vec<u8>,
    #[serde(default)]
    pub rotates: Vec<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
}

impl From<RigBone> for BoneDescriptor {
    fn from(bone: RigBone) -> Self {
        Self {
            name: bone.name,
            // An empty parent name means "no parent"
            parent: bone.parent.filter(|p| !p.is_empty()),
            origin_labels: bone.origins,
            transform_labels: bone.rotates,
            root: bone.root,
            inherit_scale: false,
        }
    }
}

// ============================================================================
// v2 - `vertex_groups`
// ============================================================================

/// v2 bone entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VertexGroupEntry {
    pub name: String,
    pub origin_labels: Vec<u8>,
    pub labels: Vec<u8>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_scale: Option<bool>,
}

/// v2 rig document, as written by rig export
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RigDocument {
    pub vertex_groups: Vec<VertexGroupEntry>,
    /// Reserved; always written empty
    #[serde(default)]
    pub face_groups: Vec<serde_json::Value>,
}

impl RigDocument {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> FormatResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Resolve parent links from child lists
    pub fn to_descriptors(&self) -> FormatResult<Vec<BoneDescriptor>> {
        let known: HashSet<&str> = self.vertex_groups.iter().map(|g| g.name.as_str()).collect();

        let mut parents: HashMap<&str, &str> = HashMap::new();
        for group in &self.vertex_groups {
            for child in &group.children {
                if !known.contains(child.as_str()) {
                    return Err(FormatError::malformed(format!(
                        "vertex group '{}' lists unknown child '{}'",
                        group.name, child
                    )));
                }
                if let Some(previous) = parents.insert(child.as_str(), group.name.as_str()) {
                    return Err(FormatError::malformed(format!(
                        "bone '{}' is a child of both '{}' and '{}'",
                        child, previous, group.name
                    )));
                }
            }
        }

        let descriptors = self
            .vertex_groups
            .iter()
            .map(|group| BoneDescriptor {
                name: group.name.clone(),
                parent: parents.get(group.name.as_str()).map(|p| (*p).to_string()),
                origin_labels: group.origin_labels.clone(),
                transform_labels: group.labels.clone(),
                root: false,
                inherit_scale: group.inherit_scale.unwrap_or(false),
            })
            .collect();
        Ok(descriptors)
    }
}

// ============================================================================
// Decoding
// ============================================================================

#[derive(Deserialize)]
struct RawRig {
    bones: Option<Vec<RigBone>>,
    vertex_groups: Option<Vec<VertexGroupEntry>>,
    #[serde(default)]
    face_groups: Vec<serde_json::Value>,
}

/// Decoded rig: the schema it was read from plus its bones in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRig {
    pub schema: RigSchema,
    pub bones: Vec<BoneDescriptor>,
}

/// Parse a rig document in either schema.
///
/// `bones` takes precedence when both keys are present. A document with
/// neither reports the v1 key as missing.
pub fn decode_rig(bytes: &[u8]) -> FormatResult<DecodedRig> {
    let raw: RawRig = serde_json::from_slice(bytes)?;

    let decoded = if let Some(bones) = raw.bones {
        DecodedRig {
            schema: RigSchema::V1Bones,
            bones: bones.into_iter().map(BoneDescriptor::from).collect(),
        }
    } else if let Some(vertex_groups) = raw.vertex_groups {
        let document = RigDocument {
            vertex_groups,
            face_groups: raw.face_groups,
        };
        DecodedRig {
            schema: RigSchema::V2VertexGroups,
            bones: document.to_descriptors()?,
        }
    } else {
        return Err(FormatError::MissingField("bones"));
    };

    validate_descriptors(&decoded.bones)?;
    Ok(decoded)
}

/// Check that bone names are unique and non-empty and that parent links
/// do not loop. Parent names that match no bone are allowed.
pub fn validate_descriptors(bones: &[BoneDescriptor]) -> FormatResult<()> {
    let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(bones.len());
    for bone in bones {
        if bone.name.is_empty() {
            return Err(FormatError::malformed("bone with empty name"));
        }
        // ROOT never has a parent, whatever the document says
        let parent = bone.parent.as_deref().filter(|_| !bone.is_root_bone());
        if parents.insert(bone.name.as_str(), parent).is_some()
        {
            return Err(FormatError::malformed(format!(
                "duplicate bone name '{}'",
                bone.name
            )));
        }
    }

    for bone in bones {
        let mut current = parents.get(bone.name.as_str()).copied().flatten();
        let mut steps = 0;
        while let Some(name) = current {
            if name == bone.name || steps > bones.len() {
                return Err(FormatError::malformed(format!(
                    "parent chain of bone '{}' loops",
                    bone.name
                )));
            }
            current = parents.get(name).copied().flatten();
            steps += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1: &str = r#"{
        "bones": [
            { "name": "ROOT", "parent": null, "origins": [1], "rotates": [1] },
            { "name": "spine", "parent": "ROOT", "origins": [2], "rotates": [2, 3] },
            { "name": "hips", "parent": "", "origins": [4], "rotates": [4], "root": true }
        ]
    }"#;

    #[test]
    fn test_decode_v1() {
        let rig = decode_rig(V1.as_bytes()).unwrap();
        assert_eq!(rig.schema, RigSchema::V1Bones);
        assert_eq!(rig.bones.len(), 3);

        assert!(rig.bones[0].is_root_bone());
        assert_eq!(rig.bones[0].parent, None);
        assert_eq!(rig.bones[1].parent.as_deref(), Some("ROOT"));
        assert_eq!(rig.bones[1].transform_labels, vec![2, 3]);
        // Empty parent name means no parent
        assert_eq!(rig.bones[2].parent, None);
        assert!(rig.bones[2].root);
    }

    #[test]
    fn test_decode_v2() {
        let json = r#"{
            "vertex_groups": [
                { "name": "ROOT", "origin_labels": [255], "labels": [0], "children": ["arm"] },
                { "name": "arm", "origin_labels": [254], "labels": [1], "children": [],
                  "inherit_scale": true }
            ],
            "face_groups": []
        }"#;
        let rig = decode_rig(json.as_bytes()).unwrap();
        assert_eq!(rig.schema, RigSchema::V2VertexGroups);
        assert_eq!(rig.bones[0].parent, None);
        assert_eq!(rig.bones[1].parent.as_deref(), Some("ROOT"));
        assert_eq!(rig.bones[1].origin_labels, vec![254]);
        assert!(rig.bones[1].inherit_scale);
        assert!(!rig.bones[0].inherit_scale);
    }

    #[test]
    fn test_missing_bones() {
        assert!(matches!(
            decode_rig(br#"{ "something": [] }"#),
            Err(FormatError::MissingField("bones"))
        ));
    }

    #[test]
    fn test_duplicate_names() {
        let json = r#"{ "bones": [
            { "name": "a", "origins": [1], "rotates": [1] },
            { "name": "a", "origins": [2], "rotates": [2] }
        ] }"#;
        assert!(matches!(
            decode_rig(json.as_bytes()),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_parent_cycle() {
        let json = r#"{ "bones": [
            { "name": "a", "parent": "b", "origins": [1], "rotates": [1] },
            { "name": "b", "parent": "a", "origins": [2], "rotates": [2] }
        ] }"#;
        assert!(matches!(
            decode_rig(json.as_bytes()),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_root_parent_is_ignored() {
        let json = r#"{ "bones": [
            { "name": "ROOT", "parent": "spine", "origins": [1], "rotates": [1] },
            { "name": "spine", "parent": "ROOT", "origins": [2], "rotates": [2] }
        ] }"#;
        let rig = decode_rig(json.as_bytes()).unwrap();
        assert_eq!(rig.bones.len(), 2);

        let json = r#"{ "bones": [
            { "name": "ROOT", "parent": "ROOT", "origins": [1], "rotates": [1] }
        ] }"#;
        assert!(decode_rig(json.as_bytes()).is_ok());
    }

    #[test]
    fn test_unknown_parent_is_allowed() {
        let json = r#"{ "bones": [
            { "name": "a", "parent": "missing", "origins": [1], "rotates": [1] }
        ] }"#;
        let rig = decode_rig(json.as_bytes()).unwrap();
        assert_eq!(rig.bones[0].parent.as_deref(), Some("missing"));
    }

    #[test]
    fn test_v2_child_with_two_parents() {
        let json = r#"{ "vertex_groups": [
            { "name": "a", "origin_labels": [], "labels": [], "children": ["c"] },
            { "name": "b", "origin_labels": [], "labels": [], "children": ["c"] },
            { "name": "c", "origin_labels": [], "labels": [], "children": [] }
        ] }"#;
        assert!(matches!(
            decode_rig(json.as_bytes()),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_v2_unknown_child() {
        let json = r#"{ "vertex_groups": [
            { "name": "a", "origin_labels": [], "labels": [], "children": ["ghost"] }
        ] }"#;
        assert!(matches!(
            decode_rig(json.as_bytes()),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_document_serialization_omits_absent_inherit_scale() {
        let document = RigDocument {
            vertex_groups: vec![VertexGroupEntry {
                name: "ROOT".into(),
                origin_labels: vec![255],
                labels: vec![0],
                children: vec![],
                inherit_scale: None,
            }],
            face_groups: vec![],
        };
        let json = document.to_json().unwrap();
        assert!(!json.contains("inherit_scale"));
        assert!(json.contains("\"face_groups\":[]"));
    }
}
