//! Bone roles
//!
//! Maps the four logical joints the converter rotates to concrete bone names,
//! plus a keyword matcher that fills the mapping from common naming schemes.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::skeleton::{BoneId, Skeleton};

/// Side of the body a role belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Mirror sign used when the bone itself gives no lateral hint (left +, right -)
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// Which configured angle a role uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Shoulder,
    UpperArm,
}

/// Logical joint rotated during conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneRole {
    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
}

impl BoneRole {
    /// Every role, shoulders first
    pub const ALL: [BoneRole; 4] = [
        BoneRole::LeftShoulder,
        BoneRole::RightShoulder,
        BoneRole::LeftUpperArm,
        BoneRole::RightUpperArm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BoneRole::LeftShoulder => "left_shoulder",
            BoneRole::RightShoulder => "right_shoulder",
            BoneRole::LeftUpperArm => "left_upper_arm",
            BoneRole::RightUpperArm => "right_upper_arm",
        }
    }

    pub fn side(self) -> Side {
        match self {
            BoneRole::LeftShoulder | BoneRole::LeftUpperArm => Side::Left,
            BoneRole::RightShoulder | BoneRole::RightUpperArm => Side::Right,
        }
    }

    pub fn kind(self) -> RoleKind {
        match self {
            BoneRole::LeftShoulder | BoneRole::RightShoulder => RoleKind::Shoulder,
            BoneRole::LeftUpperArm | BoneRole::RightUpperArm => RoleKind::UpperArm,
        }
    }

    /// Lowercase substrings that identify this role in bone names
    ///
    /// Covers the common DCC/game exporters and Japanese (MMD/VRoid style) names.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            BoneRole::LeftShoulder => &[
                "shoulder_l", "leftshoulder", "肩_l", "shoulder.l", "l_shoulder", "shoulderl",
                "clavicle_l", "clavicle.l", "肩.l", "肩l", "左肩",
            ],
            BoneRole::RightShoulder => &[
                "shoulder_r", "rightshoulder", "肩_r", "shoulder.r", "r_shoulder", "shoulderr",
                "clavicle_r", "clavicle.r", "肩.r", "肩r", "右肩",
            ],
            BoneRole::LeftUpperArm => &[
                "upperarm_l", "leftupperarm", "上腕_l", "upperarm.l", "l_upperarm", "upperarml",
                "arm_l", "arm.l", "腕_l", "腕.l", "腕l", "左腕", "左上腕",
            ],
            BoneRole::RightUpperArm => &[
                "upperarm_r", "rightupperarm", "上腕_r", "upperarm.r", "r_upperarm", "upperarmr",
                "arm_r", "arm.r", "腕_r", "腕.r", "腕r", "右腕", "右上腕",
            ],
        }
    }
}

impl std::fmt::Display for BoneRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BoneRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoneRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown bone role '{}'", s))
    }
}

/// Role -> bone name mapping, possibly partial
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneRoleAssignment {
    bones: HashMap<BoneRole, String>,
}

impl BoneRoleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style assignment
    pub fn with(mut self, role: BoneRole, bone: impl Into<String>) -> Self {
        self.set(role, bone);
        self
    }

    /// Assign a bone to a role. An empty name clears the role.
    pub fn set(&mut self, role: BoneRole, bone: impl Into<String>) {
        let bone = bone.into();
        if bone.is_empty() {
            self.bones.remove(&role);
        } else {
            self.bones.insert(role, bone);
        }
    }

    /// Bone assigned to a role, if any
    pub fn get(&self, role: BoneRole) -> Option<&str> {
        self.bones
            .get(&role)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Assigned roles in `BoneRole::ALL` order
    pub fn assigned(&self) -> impl Iterator<Item = (BoneRole, &str)> {
        BoneRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|bone| (role, bone)))
    }

    /// Roles with no bone
    pub fn unassigned(&self) -> Vec<BoneRole> {
        BoneRole::ALL
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned().count()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count() == 0
    }

    /// Fill roles missing here from `other`, keeping existing assignments
    pub fn merge_missing(&mut self, other: &BoneRoleAssignment) {
        for (role, bone) in other.assigned() {
            if self.get(role).is_none() {
                self.set(role, bone);
            }
        }
    }
}

/// First bone, in skeleton order, whose lowercased name contains any keyword
pub fn find_bone_by_keywords(skeleton: &Skeleton, keywords: &[&str]) -> Option<BoneId> {
    skeleton.bones().find_map(|(id, bone)| {
        let name = bone.name().to_lowercase();
        keywords
            .iter()
            .find(|k| name.contains(*k))
            .map(|k| {
                tracing::debug!("Match found: {} contains {}", bone.name(), k);
                id
            })
    })
}

/// Guess the role assignment from bone names
///
/// May return a partial mapping; roles with no match are left unassigned.
pub fn detect_bone_roles(skeleton: &Skeleton) -> BoneRoleAssignment {
    let mut assignment = BoneRoleAssignment::new();
    for role in BoneRole::ALL {
        if let Some(id) = find_bone_by_keywords(skeleton, role.keywords()) {
            assignment.set(role, skeleton.bone(id).name());
        }
    }

    let detected = assignment.assigned_count();
    match detected {
        0 => tracing::warn!("No bones detected in '{}'", skeleton.name()),
        4 => tracing::info!("Bone detection complete: all roles found in '{}'", skeleton.name()),
        n => tracing::info!(
            "Partial detection in '{}': {}/{} roles found",
            skeleton.name(),
            n,
            BoneRole::ALL.len()
        ),
    }
    assignment
}
