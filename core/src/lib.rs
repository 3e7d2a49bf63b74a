//! Restpose Core - T-pose / A-pose rest conversion
//!
//! Rotates the shoulder and upper-arm bones of an armature, bakes the result
//! as the new rest pose and rebuilds every shape key of the bound meshes so
//! each key keeps the deformation it had before the conversion.
//!
//! # Architecture
//!
//! - [`Skeleton`] - Bone hierarchy with rest and pose transforms
//! - [`Mesh`] - Basis positions, vertex-group weights and [`ShapeKey`]s
//! - [`PoseConverter`] - Rotation planning, rest commit and the rebuild pipeline
//! - [`detect_bone_roles`] - Name-based assignment of bones to [`BoneRole`]s
//! - [`RigDocument`] - JSON interchange format for a skeleton and its meshes

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod math;
pub mod rebuild;
pub mod roles;
pub mod shape_keys;
pub mod skeleton;
pub mod skinning;

pub use config::{ConversionConfig, ConversionMode, MirrorMode, RotationAxis, RotationSpace};
pub use convert::{
    AppliedRotation, ConversionReport, ConversionState, MeshReport, PoseConverter, convert_pose,
    set_current_pose_as_rest,
};
pub use document::{DocumentError, RigDocument};
pub use error::{ConversionError, ConversionWarning, SkeletonError};
pub use math::{Axis, LocalTransform};
pub use roles::{BoneRole, BoneRoleAssignment, detect_bone_roles};
pub use shape_keys::{Influence, Mesh, ShapeKey, find_bound_meshes};
pub use skeleton::{Bone, BoneId, Skeleton, Space};
