//! Linear blend skinning
//!
//! Vertex groups resolve to bones by name. Per-bone skinning matrices are
//! computed once per skeleton state, per-vertex blend matrices once per mesh,
//! and both are reused for every shape that gets deformed.

use glam::{Mat4, Vec3};

use crate::error::ConversionError;
use crate::shape_keys::{Influence, Mesh};
use crate::skeleton::{BoneId, Skeleton};

/// Determinant below which a blend matrix counts as singular
const SINGULAR_EPSILON: f32 = 1e-8;

/// Bone driving each vertex group of a mesh (`None` for groups with no bone)
pub fn resolve_groups(mesh: &Mesh, skeleton: &Skeleton) -> Vec<Option<BoneId>> {
    mesh.vertex_groups
        .iter()
        .map(|group| skeleton.find(group))
        .collect()
}

/// Normalized weighted sum of bone matrices, `None` when the vertex does not move
fn blend(
    influences: &[Influence],
    groups: &[Option<BoneId>],
    bone_matrices: &[Mat4],
) -> Option<Mat4> {
    let mut total = 0.0;
    let mut moved = false;
    let mut sum = Mat4::ZERO;

    for influence in influences {
        let Some(bone) = groups[influence.group as usize] else {
            continue;
        };
        if influence.weight <= 0.0 {
            continue;
        }
        let matrix = bone_matrices[bone.index()];
        moved |= matrix != Mat4::IDENTITY;
        sum += matrix * influence.weight;
        total += influence.weight;
    }

    if !moved || total <= 0.0 {
        None
    } else {
        Some(sum * (1.0 / total))
    }
}

fn transform_all(positions: &[Vec3], matrices: &[Option<Mat4>]) -> Vec<Vec3> {
    positions
        .iter()
        .zip(matrices)
        .map(|(p, m)| match m {
            Some(m) => m.transform_point3(*p),
            None => *p,
        })
        .collect()
}

/// Forward skinning of one mesh against one skeleton state
#[derive(Clone, Debug)]
pub struct Skinner {
    mesh: String,
    blends: Vec<Option<Mat4>>,
}

impl Skinner {
    /// Precompute the blend matrix of every vertex
    ///
    /// The mesh must have passed [`Mesh::validate`].
    pub fn new(mesh: &Mesh, skeleton: &Skeleton) -> Self {
        Self::with_bone_matrices(mesh, skeleton, &skeleton.skinning_matrices())
    }

    /// Same as [`Skinner::new`] with bone matrices computed by the caller
    pub fn with_bone_matrices(mesh: &Mesh, skeleton: &Skeleton, bone_matrices: &[Mat4]) -> Self {
        let groups = resolve_groups(mesh, skeleton);
        let blends = (0..mesh.vertex_count())
            .map(|v| blend(mesh.influences(v), &groups, bone_matrices))
            .collect();
        Self {
            mesh: mesh.name.clone(),
            blends,
        }
    }

    /// Whether a vertex moves under this skeleton state
    pub fn moves(&self, vertex: usize) -> bool {
        self.blends[vertex].is_some()
    }

    /// Deform a full set of vertex positions
    pub fn deform(&self, positions: &[Vec3]) -> Vec<Vec3> {
        transform_all(positions, &self.blends)
    }

    /// Inverse of every blend matrix, for mapping deformed positions back to rest
    pub fn inverse(&self) -> Result<InverseSkinner, ConversionError> {
        let inverses = self
            .blends
            .iter()
            .enumerate()
            .map(|(vertex, blend)| match blend {
                Some(m) if m.determinant().abs() < SINGULAR_EPSILON => {
                    Err(ConversionError::DegenerateSkinning {
                        mesh: self.mesh.clone(),
                        vertex,
                    })
                }
                Some(m) => Ok(Some(m.inverse())),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InverseSkinner { inverses })
    }
}

/// Inverse skinning of one mesh against one skeleton state
#[derive(Clone, Debug)]
pub struct InverseSkinner {
    inverses: Vec<Option<Mat4>>,
}

impl InverseSkinner {
    pub fn moves(&self, vertex: usize) -> bool {
        self.inverses[vertex].is_some()
    }

    /// Map deformed positions back into the bind space of the skeleton
    pub fn apply(&self, deformed: &[Vec3]) -> Vec<Vec3> {
        transform_all(deformed, &self.inverses)
    }
}

/// Posed positions of the mesh with its shape keys mixed at their current values
pub fn deform_mesh(mesh: &Mesh, skeleton: &Skeleton) -> Vec<Vec3> {
    Skinner::new(mesh, skeleton).deform(&mesh.mixed_positions())
}

/// Posed positions of the mesh with a single shape key at full weight
///
/// `None` deforms the bare basis.
pub fn deform_shape(mesh: &Mesh, skeleton: &Skeleton, key: Option<&str>) -> Vec<Vec3> {
    let positions = match key.and_then(|name| mesh.shape_key(name)) {
        Some(key) => mesh.key_positions(key),
        None => mesh.positions.clone(),
    };
    Skinner::new(mesh, skeleton).deform(&positions)
}
