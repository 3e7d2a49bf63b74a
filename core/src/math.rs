//! Transform math
//!
//! Rotation, translation and matrix helpers shared by the skeleton model and the
//! pose converter. Everything here is pure and infallible.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Coordinate axis used for pose rotations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit vector along this axis
    pub const fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{}' (expected x, y or z)", other)),
        }
    }
}

/// Translation + rotation relative to a parent frame
///
/// Bones carry no scale; rest transforms produced by the host are rigid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    /// Offset of the bone head from the parent's frame origin
    #[serde(default)]
    pub translation: Vec3,
    /// Orientation relative to the parent's frame, quaternion [x, y, z, w]
    #[serde(default = "identity_rotation")]
    pub rotation: Quat,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalTransform {
    /// No offset, no rotation
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pure translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Affine matrix for this transform (rotation first, then translation)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

/// Compose local transforms ordered root-to-bone into a world matrix
pub fn compose<'a, I>(chain: I) -> Mat4
where
    I: IntoIterator<Item = &'a LocalTransform>,
{
    chain
        .into_iter()
        .fold(Mat4::IDENTITY, |world, local| world * local.to_matrix())
}

/// Rotation of `angle_degrees` about `axis`
pub fn rotate_about_axis(angle_degrees: f32, axis: Axis) -> Quat {
    Quat::from_axis_angle(axis.unit(), angle_degrees.to_radians())
}

/// Apply `incremental` on top of `existing` in the existing rotation's local frame
///
/// Right-multiplication: the increment's axis is read in the bone's own frame,
/// not in world space.
pub fn combine(existing: Quat, incremental: Quat) -> Quat {
    (existing * incremental).normalize()
}

/// Local pose rotation that turns a bone by a world-space `increment`
///
/// The pivot is the bone head, so only the orientation changes. `parent_world`
/// is the parent's posed world rotation (identity for roots), `rest_rotation`
/// the bone's rest rotation and `current_world` its posed world rotation.
pub fn rotate_in_world(
    parent_world: Quat,
    rest_rotation: Quat,
    current_world: Quat,
    increment: Quat,
) -> Quat {
    let target_world = increment * current_world;
    ((parent_world * rest_rotation).inverse() * target_world).normalize()
}

/// Signed rotation angle about `axis`, in degrees, of a rotation known to turn about it
pub fn angle_about_axis(rotation: Quat, axis: Axis) -> f32 {
    let (rotation_axis, angle) = rotation.to_axis_angle();
    let sign = rotation_axis.dot(axis.unit()).signum();
    let mut degrees = (angle * sign).to_degrees();
    if degrees > 180.0 {
        degrees -= 360.0;
    } else if degrees < -180.0 {
        degrees += 360.0;
    }
    degrees
}
