//! Shape-key rebuilder
//!
//! A conversion changes the rest pose, so the stored basis and key deltas
//! would no longer describe what the user saw. The rebuilder captures the
//! skinned geometry of the basis and of every key while the skeleton is still
//! posed, then maps those captures back through the committed skeleton.

use glam::{Mat4, Vec3};

use crate::error::ConversionError;
use crate::shape_keys::Mesh;
use crate::skeleton::Skeleton;
use crate::skinning::Skinner;

/// Posed geometry of one mesh, captured before the pose is committed
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Skinned basis
    pub basis: Vec<Vec3>,
    /// Skinned basis + key at full weight, in shape-key order
    pub keys: Vec<Vec<Vec3>>,
    /// Vertices the posed skeleton displaced
    pub moved: Vec<bool>,
}

/// Rebuilt geometry, ready to replace the mesh's basis and deltas
#[derive(Clone, Debug)]
pub struct RebuiltShapes {
    pub basis: Vec<Vec3>,
    pub deltas: Vec<Vec<Vec3>>,
}

impl RebuiltShapes {
    /// Write the rebuilt geometry into `mesh`
    ///
    /// Key names, values and order, and the basis name, are left as they were.
    pub fn apply(self, mesh: &mut Mesh) {
        mesh.positions = self.basis;
        for (key, deltas) in mesh.shape_keys.iter_mut().zip(self.deltas) {
            key.deltas = deltas;
        }
    }
}

/// Skin the basis and every key under the posed skeleton
pub fn pre_capture(mesh: &Mesh, posed: &Skeleton, bone_matrices: &[Mat4]) -> Snapshot {
    let skinner = Skinner::with_bone_matrices(mesh, posed, bone_matrices);
    let basis = skinner.deform(&mesh.positions);
    let keys = mesh
        .shape_keys
        .iter()
        .map(|key| skinner.deform(&mesh.key_positions(key)))
        .collect();
    let moved = (0..mesh.vertex_count()).map(|v| skinner.moves(v)).collect();

    tracing::debug!(
        "Captured '{}': basis + {} shape keys",
        mesh.name,
        mesh.shape_keys.len()
    );
    Snapshot { basis, keys, moved }
}

/// Map a snapshot back through the committed skeleton
///
/// Inverse blend matrices are built once per vertex and shared by the basis
/// and every key. A fully committed skeleton inverts to identity, so the
/// captures become the new rest geometry as-is. Vertices that moved in
/// neither direction keep their stored deltas bit for bit.
///
/// `DegenerateSkinning` can only come back when `committed` still carries a
/// pose whose blend collapses a vertex.
pub fn post_rebuild(
    mesh: &Mesh,
    committed: &Skeleton,
    snapshot: Snapshot,
) -> Result<RebuiltShapes, ConversionError> {
    let inverse = Skinner::new(mesh, committed).inverse()?;
    let untouched = |v: usize| !snapshot.moved[v] && !inverse.moves(v);

    let basis = inverse.apply(&snapshot.basis);
    let deltas = snapshot
        .keys
        .iter()
        .zip(&mesh.shape_keys)
        .map(|(captured, key)| {
            inverse
                .apply(captured)
                .into_iter()
                .enumerate()
                .map(|(v, k)| if untouched(v) { key.deltas[v] } else { k - basis[v] })
                .collect()
        })
        .collect();

    tracing::debug!("Rebuilt {} shape keys on '{}'", snapshot.keys.len(), mesh.name);
    Ok(RebuiltShapes { basis, deltas })
}
