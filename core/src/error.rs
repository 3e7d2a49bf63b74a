//! Error and warning types
//!
//! Every fallible operation reports to its immediate caller. Nothing is retried,
//! and a failed conversion never leaves skeleton or mesh data half-applied.

use crate::roles::BoneRole;

/// Errors raised while building or querying a skeleton
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkeletonError {
    #[error("bone '{0}' already exists in the skeleton")]
    DuplicateBone(String),

    #[error("bone '{bone}' references unknown parent '{parent}'")]
    UnknownParent { bone: String, parent: String },

    #[error("bone '{0}' not found in skeleton")]
    BoneNotFound(String),
}

/// Errors that abort a conversion before anything is applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// A role assignment names a bone the skeleton does not have
    #[error("bone '{bone}' assigned to {role} not found in armature '{armature}'")]
    BoneNotFound {
        armature: String,
        role: BoneRole,
        bone: String,
    },

    /// Another conversion of the same armature is still running
    #[error("a conversion of armature '{0}' is already in progress")]
    ConversionInProgress(String),

    /// A shape key does not match the mesh topology
    #[error(
        "shape key '{key}' on mesh '{mesh}' has {key_vertices} vertices, mesh has {mesh_vertices}"
    )]
    UnsupportedShapeKey {
        mesh: String,
        key: String,
        key_vertices: usize,
        mesh_vertices: usize,
    },

    /// Skinning data is inconsistent with the mesh
    #[error("mesh '{mesh}' is invalid: {reason}")]
    InvalidMesh { mesh: String, reason: String },

    /// Rotation settings cannot be applied
    #[error("invalid conversion config: {0}")]
    InvalidConfig(String),

    /// The blended skinning matrix of a vertex cannot be inverted
    ///
    /// Only raised by [`Skinner::inverse`](crate::skinning::Skinner::inverse) on a
    /// skeleton that still carries a pose, e.g. a direct
    /// [`post_rebuild`](crate::rebuild::post_rebuild) against a posed reference.
    /// [`PoseConverter`](crate::convert::PoseConverter) rebuilds against a fully
    /// committed skeleton and never returns it.
    #[error("vertex {vertex} of mesh '{mesh}' has a non-invertible skinning matrix")]
    DegenerateSkinning { mesh: String, vertex: usize },
}

/// Non-fatal conditions reported alongside a successful conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionWarning {
    /// Roles with no bone assigned; they were skipped
    PartialRoles(Vec<BoneRole>),

    /// A role pointed at a bone another role already rotated; it was skipped
    SharedBone { role: BoneRole, bone: String },

    /// No mesh was passed in, only the skeleton changed
    NoMeshes,
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionWarning::PartialRoles(roles) => {
                let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                write!(
                    f,
                    "{}/{} roles unresolved, skipped: {}",
                    roles.len(),
                    BoneRole::ALL.len(),
                    names.join(", ")
                )
            }
            ConversionWarning::SharedBone { role, bone } => {
                write!(f, "{} skipped: bone '{}' is already rotated by another role", role, bone)
            }
            ConversionWarning::NoMeshes => write!(f, "no meshes bound, only the skeleton was updated"),
        }
    }
}
