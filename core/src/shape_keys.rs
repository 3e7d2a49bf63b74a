//! Mesh and shape-key store
//!
//! A mesh owns its basis positions, its vertex-group weights and its shape keys.
//! Shape keys store per-vertex deltas relative to the basis.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ConversionError;

/// Default name of the basis shape
pub const DEFAULT_BASIS_NAME: &str = "Basis";

/// One bone influence on a vertex
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    /// Index into the mesh's vertex groups
    pub group: u32,
    pub weight: f32,
}

/// Influences of a single vertex (usually at most four)
pub type VertexWeights = SmallVec<[Influence; 4]>;

/// Named morph target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeKey {
    pub name: String,
    /// Blend value the host shows for this key; kept across conversions
    #[serde(default)]
    pub value: f32,
    /// Per-vertex offset from the basis
    pub deltas: Vec<Vec3>,
}

impl ShapeKey {
    pub fn new(name: impl Into<String>, deltas: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            deltas,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.deltas.len()
    }
}

/// Skinned mesh bound to an armature
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    /// Armature the mesh deforms with
    #[serde(default)]
    pub armature: Option<String>,
    #[serde(default = "default_basis_name")]
    pub basis_name: String,
    /// Vertex group names; a group deforms with the bone of the same name
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    /// Basis positions
    pub positions: Vec<Vec3>,
    /// Per-vertex influences; empty means the mesh is not weighted at all
    #[serde(default)]
    pub weights: Vec<VertexWeights>,
    #[serde(default)]
    pub shape_keys: Vec<ShapeKey>,
}

fn default_basis_name() -> String {
    DEFAULT_BASIS_NAME.to_string()
}

impl Mesh {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            armature: None,
            basis_name: default_basis_name(),
            vertex_groups: Vec::new(),
            positions,
            weights: Vec::new(),
            shape_keys: Vec::new(),
        }
    }

    /// Bind to an armature by name
    pub fn bound_to(mut self, armature: impl Into<String>) -> Self {
        self.armature = Some(armature.into());
        self
    }

    pub fn is_bound_to(&self, armature: &str) -> bool {
        self.armature.as_deref() == Some(armature)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Index of the named vertex group, creating it if needed
    pub fn vertex_group(&mut self, name: &str) -> u32 {
        if let Some(index) = self.vertex_groups.iter().position(|g| g == name) {
            return index as u32;
        }
        self.vertex_groups.push(name.to_string());
        (self.vertex_groups.len() - 1) as u32
    }

    /// Add `weight` of the named group to a vertex
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is not below [`Mesh::vertex_count`].
    pub fn assign(&mut self, vertex: usize, group: &str, weight: f32) {
        let group = self.vertex_group(group);
        if self.weights.len() < self.positions.len() {
            self.weights.resize(self.positions.len(), VertexWeights::new());
        }
        assert!(
            vertex < self.positions.len(),
            "vertex {} out of range for mesh '{}' with {} vertices",
            vertex,
            self.name,
            self.positions.len()
        );
        let influences = &mut self.weights[vertex];
        match influences.iter_mut().find(|i| i.group == group) {
            Some(existing) => existing.weight = weight,
            None => influences.push(Influence { group, weight }),
        }
    }

    /// Influences of a vertex (empty when the mesh carries no weights)
    pub fn influences(&self, vertex: usize) -> &[Influence] {
        self.weights
            .get(vertex)
            .map(|w| w.as_slice())
            .unwrap_or(&[])
    }

    pub fn add_shape_key(&mut self, key: ShapeKey) {
        self.shape_keys.push(key);
    }

    pub fn shape_key(&self, name: &str) -> Option<&ShapeKey> {
        self.shape_keys.iter().find(|k| k.name == name)
    }

    /// Basis with one key applied at full weight
    pub fn key_positions(&self, key: &ShapeKey) -> Vec<Vec3> {
        self.positions
            .iter()
            .zip(&key.deltas)
            .map(|(p, d)| *p + *d)
            .collect()
    }

    /// Basis with every key applied at its current value
    pub fn mixed_positions(&self) -> Vec<Vec3> {
        let mut positions = self.positions.clone();
        for key in self.shape_keys.iter().filter(|k| k.value != 0.0) {
            for (p, d) in positions.iter_mut().zip(&key.deltas) {
                *p += *d * key.value;
            }
        }
        positions
    }

    /// Check weights and shape keys against the basis topology
    pub fn validate(&self) -> Result<(), ConversionError> {
        let vertex_count = self.vertex_count();

        if !self.weights.is_empty() && self.weights.len() != vertex_count {
            return Err(self.invalid(format!(
                "{} weight entries for {} vertices",
                self.weights.len(),
                vertex_count
            )));
        }

        if let Some(vertex) = self.positions.iter().position(|p| !p.is_finite()) {
            return Err(self.invalid(format!("vertex {} has a non-finite position", vertex)));
        }

        for (vertex, influences) in self.weights.iter().enumerate() {
            if let Some(bad) = influences.iter().find(|i| !i.weight.is_finite()) {
                return Err(self.invalid(format!(
                    "vertex {} has a non-finite weight {} for group {}",
                    vertex, bad.weight, bad.group
                )));
            }
            if let Some(bad) = influences
                .iter()
                .find(|i| i.group as usize >= self.vertex_groups.len())
            {
                return Err(self.invalid(format!(
                    "vertex {} references vertex group {} but only {} exist",
                    vertex,
                    bad.group,
                    self.vertex_groups.len()
                )));
            }
        }

        for key in &self.shape_keys {
            if key.vertex_count() != vertex_count {
                return Err(ConversionError::UnsupportedShapeKey {
                    mesh: self.name.clone(),
                    key: key.name.clone(),
                    key_vertices: key.vertex_count(),
                    mesh_vertices: vertex_count,
                });
            }
            if let Some(vertex) = key.deltas.iter().position(|d| !d.is_finite()) {
                return Err(self.invalid(format!(
                    "shape key '{}' has a non-finite delta at vertex {}",
                    key.name, vertex
                )));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> ConversionError {
        ConversionError::InvalidMesh {
            mesh: self.name.clone(),
            reason,
        }
    }
}

/// Indices of the meshes bound to `armature`
pub fn find_bound_meshes(armature: &str, meshes: &[Mesh]) -> Vec<usize> {
    meshes
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_bound_to(armature))
        .map(|(i, _)| i)
        .collect()
}
