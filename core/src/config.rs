//! Conversion settings
//!
//! Deserializable from the `[conversion]` table of a settings file. Every field
//! has a default, so an empty table yields the stock A→T conversion.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConversionError;
use crate::math::Axis;
use crate::roles::RoleKind;

/// Direction of the conversion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMode {
    /// T-pose to A-pose: arms rotate down
    #[serde(rename = "T_TO_A", alias = "t_to_a", alias = "t2a")]
    TToA,
    /// A-pose to T-pose: arms rotate up
    #[default]
    #[serde(rename = "A_TO_T", alias = "a_to_t", alias = "a2t")]
    AToT,
}

impl ConversionMode {
    /// Sign applied to every configured angle
    pub fn sign(self) -> f32 {
        match self {
            ConversionMode::TToA => 1.0,
            ConversionMode::AToT => -1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            ConversionMode::TToA => ConversionMode::AToT,
            ConversionMode::AToT => ConversionMode::TToA,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::TToA => "T_TO_A",
            ConversionMode::AToT => "A_TO_T",
        }
    }
}

impl std::fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "t_to_a" | "t2a" => Ok(ConversionMode::TToA),
            "a_to_t" | "a2t" => Ok(ConversionMode::AToT),
            other => Err(format!("unknown conversion mode '{}' (expected T_TO_A or A_TO_T)", other)),
        }
    }
}

/// Axis the configured angles turn about
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
    /// The armature's front-to-back axis, pivoting at the bone head
    ///
    /// Positive angles lower a bone pointing along +X. With mirrored signs both
    /// arms swing toward the body on `T_TO_A`. Always read in armature space.
    #[default]
    Swing,
    /// Fixed X axis in the configured [`RotationSpace`]
    X,
    /// Fixed Y axis in the configured [`RotationSpace`]
    Y,
    /// Fixed Z axis in the configured [`RotationSpace`]
    Z,
}

impl RotationAxis {
    /// Armature-space direction of the swing axis (Y up, facing +Z)
    pub const SWING_DIRECTION: Vec3 = Vec3::NEG_Z;

    /// The coordinate axis, or `None` for the swing axis
    pub fn fixed(self) -> Option<Axis> {
        match self {
            RotationAxis::Swing => None,
            RotationAxis::X => Some(Axis::X),
            RotationAxis::Y => Some(Axis::Y),
            RotationAxis::Z => Some(Axis::Z),
        }
    }
}

impl From<Axis> for RotationAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::X => RotationAxis::X,
            Axis::Y => RotationAxis::Y,
            Axis::Z => RotationAxis::Z,
        }
    }
}

/// Frame a fixed rotation axis is read in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationSpace {
    /// The bone's own frame (right-multiplied onto its pose)
    #[default]
    Local,
    /// Armature space, pivoting at the bone head
    Armature,
}

/// How left and right bones get mirrored angles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorMode {
    /// From the side the bone points to at rest, falling back to the role's side
    #[default]
    BoneAxis,
    /// From the role name alone: left +, right -
    RoleSide,
}

/// Parameters of one conversion
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub mode: ConversionMode,
    /// Shoulder rotation in degrees
    pub shoulder_angle: f32,
    /// Upper arm rotation in degrees
    pub upper_arm_angle: f32,
    pub axis: RotationAxis,
    pub space: RotationSpace,
    pub mirror: MirrorMode,
}

/// Stock shoulder angle (degrees)
pub const DEFAULT_SHOULDER_ANGLE: f32 = 0.0;
/// Stock upper-arm angle (degrees)
pub const DEFAULT_UPPER_ARM_ANGLE: f32 = 30.0;

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::default(),
            shoulder_angle: DEFAULT_SHOULDER_ANGLE,
            upper_arm_angle: DEFAULT_UPPER_ARM_ANGLE,
            axis: RotationAxis::default(),
            space: RotationSpace::default(),
            mirror: MirrorMode::default(),
        }
    }
}

impl ConversionConfig {
    pub fn new(mode: ConversionMode, shoulder_angle: f32, upper_arm_angle: f32) -> Self {
        Self {
            mode,
            shoulder_angle,
            upper_arm_angle,
            ..Self::default()
        }
    }

    /// Same angles, opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            mode: self.mode.reversed(),
            ..*self
        }
    }

    /// Unsigned magnitude for a role kind
    pub fn angle_for(&self, kind: RoleKind) -> f32 {
        match kind {
            RoleKind::Shoulder => self.shoulder_angle,
            RoleKind::UpperArm => self.upper_arm_angle,
        }
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        for (label, angle) in [
            ("shoulder_angle", self.shoulder_angle),
            ("upper_arm_angle", self.upper_arm_angle),
        ] {
            if !angle.is_finite() {
                return Err(ConversionError::InvalidConfig(format!(
                    "{} must be a finite number of degrees, got {}",
                    label, angle
                )));
            }
        }
        Ok(())
    }
}
