//! `.mdl` model record
//!
//! A single JSON object of parallel arrays. Per-face attributes are NOT
//! embedded in the face entries; each lives in its own array indexed by face
//! position.
//!
//! # Layout
//! ```text
//! vertices       [[x, y, z], ...]   position, Y-up; floats round half up
//! vertex_label   [label, ...]       one per vertex
//! faces          [[a, b, c], ...]   vertex indices, winding defines facing
//! face_type      [type, ...]        0 = smooth, 1 = flat
//! face_color     [color, ...]       packed palette id (128 × 512 grid)
//! face_alpha     [alpha, ...]       0 = opaque, 255 = fully transparent
//! face_label     [label, ...]       group label, carried through unchanged
//! face_layer     [layer, ...]       reserved, written as 0
//! texture_faces  []                 reserved, written empty
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// `face_type` value for smooth-shaded faces
pub const FACE_TYPE_SMOOTH: u8 = 0;
/// `face_type` value for flat-shaded faces
pub const FACE_TYPE_FLAT: u8 = 1;

/// Vertex label of unlabeled mesh vertices
pub const LABEL_NONE: u8 = 0;
/// Highest label; bone-origin markers count down from here
pub const LABEL_MAX: u8 = 255;

/// Decoded `.mdl` record.
///
/// Every face-attribute array has the same length as `faces` and
/// `vertex_label` has the same length as `vertices` once [`Model::validate`]
/// has passed. Values returned by [`Model::from_json`] are always valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Model {
    pub vertices: Vec<[i32; 3]>,
    pub vertex_label: Vec<u8>,
    pub faces: Vec<[u32; 3]>,
    pub face_type: Vec<u8>,
    pub face_color: Vec<u16>,
    pub face_alpha: Vec<u8>,
    pub face_label: Vec<u8>,
    pub face_layer: Vec<u8>,
    pub texture_faces: Vec<[u32; 3]>,
}

/// One face with its attributes gathered from the parallel arrays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceRecord {
    pub indices: [u32; 3],
    pub face_type: u8,
    pub color: u16,
    pub alpha: u8,
    pub label: u8,
    pub layer: u8,
}

impl FaceRecord {
    /// The same face seen from behind: winding reversed, attributes copied.
    pub fn mirrored(&self) -> Self {
        let [a, b, c] = self.indices;
        Self {
            indices: [c, b, a],
            ..*self
        }
    }
}

/// Wire shape with every key optional so absent keys can be reported by name
#[derive(Deserialize)]
struct RawModel {
    /// Integer-valued floats such as `1.0` are accepted and rounded
    vertices: Option<Vec<[f64; 3]>>,
    vertex_label: Option<Vec<u8>>,
    faces: Option<Vec<[u32; 3]>>,
    face_type: Option<Vec<u8>>,
    face_color: Option<Vec<u16>>,
    face_alpha: Option<Vec<u8>>,
    face_label: Option<Vec<u8>>,
    face_layer: Option<Vec<u8>>,
    #[serde(default)]
    texture_faces: Vec<[u32; 3]>,
}

fn required<T>(field: Option<T>, name: &'static str) -> FormatResult<T> {
    field.ok_or(FormatError::MissingField(name))
}

/// Round half up, the same rule the encoder applies to host positions
fn round_vertex(vertex: [f64; 3]) -> [i32; 3] {
    vertex.map(|v| (v + 0.5).floor() as i32)
}

impl Model {
    /// Parse and validate a model from JSON text
    pub fn from_json(json: &str) -> FormatResult<Self> {
        Self::from_raw(serde_json::from_str(json)?)
    }

    /// Parse and validate a model from UTF-8 JSON bytes
    pub fn from_slice(bytes: &[u8]) -> FormatResult<Self> {
        Self::from_raw(serde_json::from_slice(bytes)?)
    }

    fn from_raw(raw: RawModel) -> FormatResult<Self> {
        let model = Self {
            vertices: required(raw.vertices, "vertices")?
                .into_iter()
                .map(round_vertex)
                .collect(),
            vertex_label: required(raw.vertex_label, "vertex_label")?,
            faces: required(raw.faces, "faces")?,
            face_type: required(raw.face_type, "face_type")?,
            face_color: required(raw.face_color, "face_color")?,
            face_alpha: required(raw.face_alpha, "face_alpha")?,
            face_label: required(raw.face_label, "face_label")?,
            face_layer: required(raw.face_layer, "face_layer")?,
            texture_faces: raw.texture_faces,
        };
        model.validate()?;
        Ok(model)
    }

    /// Serialize to compact JSON. Fails if the record is not valid.
    pub fn to_json(&self) -> FormatResult<String> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Check the parallel-array invariants and face index ranges
    pub fn validate(&self) -> FormatResult<()> {
        if self.vertex_label.len() != self.vertices.len() {
            return Err(FormatError::malformed(format!(
                "vertex_label has {} entries, expected {} (one per vertex)",
                self.vertex_label.len(),
                self.vertices.len()
            )));
        }

        let face_count = self.faces.len();
        let attributes = [
            ("face_type", self.face_type.len()),
            ("face_color", self.face_color.len()),
            ("face_alpha", self.face_alpha.len()),
            ("face_label", self.face_label.len()),
            ("face_layer", self.face_layer.len()),
        ];
        for (name, len) in attributes {
            if len != face_count {
                return Err(FormatError::malformed(format!(
                    "{} has {} entries, expected {} (one per face)",
                    name, len, face_count
                )));
            }
        }

        let vertex_count = self.vertices.len();
        for (face, indices) in self.faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(FormatError::malformed(format!(
                    "face {} references vertex {}, but the model has {} vertices",
                    face, index, vertex_count
                )));
            }
        }

        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Append a vertex and its label
    pub fn push_vertex(&mut self, position: [i32; 3], label: u8) {
        self.vertices.push(position);
        self.vertex_label.push(label);
    }

    /// Append a face to every per-face array in lockstep
    pub fn push_face(&mut self, face: FaceRecord) {
        self.faces.push(face.indices);
        self.face_type.push(face.face_type);
        self.face_color.push(face.color);
        self.face_alpha.push(face.alpha);
        self.face_label.push(face.label);
        self.face_layer.push(face.layer);
    }

    /// Gather the attributes of face `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range or the record has not been validated.
    pub fn face(&self, index: usize) -> FaceRecord {
        FaceRecord {
            indices: self.faces[index],
            face_type: self.face_type[index],
            color: self.face_color[index],
            alpha: self.face_alpha[index],
            label: self.face_label[index],
            layer: self.face_layer[index],
        }
    }

    /// Iterate all faces with their attributes
    pub fn face_records(&self) -> impl Iterator<Item = FaceRecord> + '_ {
        (0..self.faces.len()).map(|i| self.face(i))
    }
}
