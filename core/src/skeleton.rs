//! Skeleton model
//!
//! Bones are stored parent-before-child. `add_bone` only accepts parents that
//! already exist, so the hierarchy is always a forest and every top-down pass is
//! a plain forward iteration.

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;

use crate::error::SkeletonError;
use crate::math::{self, LocalTransform};

/// Lateral component below which a bone counts as pointing along the mid-plane
const LATERAL_EPSILON: f32 = 1e-4;

/// Index of a bone inside its skeleton
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub(crate) usize);

impl BoneId {
    /// Position of the bone in skeleton order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which set of local transforms to resolve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Space {
    /// Rest transforms only
    Rest,
    /// Rest transforms with the pose rotation applied on top
    Posed,
}

/// A single joint
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    name: String,
    parent: Option<BoneId>,
    rest: LocalTransform,
    pose: Quat,
}

impl Bone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    /// Rest transform relative to the parent bone
    pub fn rest(&self) -> &LocalTransform {
        &self.rest
    }

    /// Pose rotation applied on top of the rest rotation
    pub fn pose(&self) -> Quat {
        self.pose
    }

    /// Whether a pose rotation is currently applied
    pub fn is_posed(&self) -> bool {
        self.pose != Quat::IDENTITY
    }

    /// Local transform in the requested space
    pub fn local(&self, space: Space) -> LocalTransform {
        match space {
            Space::Rest => self.rest,
            Space::Posed if self.is_posed() => LocalTransform {
                translation: self.rest.translation,
                rotation: self.rest.rotation * self.pose,
            },
            Space::Posed => self.rest,
        }
    }
}

/// Bone hierarchy of one armature
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    name: String,
    bones: Vec<Bone>,
    by_name: HashMap<String, BoneId>,
}

impl PartialEq for Skeleton {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.bones == other.bones
    }
}

impl Skeleton {
    /// Create an empty skeleton for the named armature
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Armature name, used to bind meshes and to guard conversions
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Append a bone. The parent must already be part of the skeleton.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        rest: LocalTransform,
    ) -> Result<BoneId, SkeletonError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(SkeletonError::DuplicateBone(name));
        }

        let parent = match parent {
            Some(parent_name) => Some(self.find(parent_name).ok_or_else(|| {
                SkeletonError::UnknownParent {
                    bone: name.clone(),
                    parent: parent_name.to_string(),
                }
            })?),
            None => None,
        };

        let id = BoneId(self.bones.len());
        self.by_name.insert(name.clone(), id);
        self.bones.push(Bone {
            name,
            parent,
            rest,
            pose: Quat::IDENTITY,
        });
        Ok(id)
    }

    /// Bones in skeleton order (parents before children)
    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter().enumerate().map(|(i, b)| (BoneId(i), b))
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }

    /// Look up a bone by exact name
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    /// Look up a bone by exact name, failing with `BoneNotFound`
    pub fn require(&self, name: &str) -> Result<BoneId, SkeletonError> {
        self.find(name)
            .ok_or_else(|| SkeletonError::BoneNotFound(name.to_string()))
    }

    /// Bones without a parent
    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Bone ids from the root down to `id`, inclusive
    pub fn chain(&self, id: BoneId) -> Vec<BoneId> {
        let mut chain = vec![id];
        let mut current = self.bones[id.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.bones[parent.0].parent;
        }
        chain.reverse();
        chain
    }

    /// World matrix of one bone, O(depth)
    pub fn resolve_world_transform(&self, id: BoneId, space: Space) -> Mat4 {
        let locals: Vec<LocalTransform> = self
            .chain(id)
            .into_iter()
            .map(|b| self.bones[b.0].local(space))
            .collect();
        math::compose(&locals)
    }

    /// World rotation of one bone, O(depth)
    pub fn world_rotation(&self, id: BoneId, space: Space) -> Quat {
        self.chain(id)
            .into_iter()
            .fold(Quat::IDENTITY, |world, b| {
                world * self.bones[b.0].local(space).rotation
            })
    }

    /// World matrices for every bone in a single top-down pass
    pub fn world_transforms(&self, space: Space) -> Vec<Mat4> {
        let mut worlds: Vec<Mat4> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let local = bone.local(space).to_matrix();
            let world = match bone.parent {
                Some(parent) => worlds[parent.0] * local,
                None => local,
            };
            worlds.push(world);
        }
        worlds
    }

    /// Per-bone skinning matrices (`posed_world * rest_world⁻¹`)
    ///
    /// Bones whose whole chain is unposed get an exact identity so evaluating an
    /// unposed skeleton never perturbs vertex positions.
    pub fn skinning_matrices(&self) -> Vec<Mat4> {
        let rest = self.world_transforms(Space::Rest);
        let posed = self.world_transforms(Space::Posed);

        let mut moved = vec![false; self.bones.len()];
        let mut matrices = Vec::with_capacity(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            moved[i] = bone.is_posed() || bone.parent.is_some_and(|p| moved[p.0]);
            if moved[i] {
                matrices.push(posed[i] * rest[i].inverse());
            } else {
                matrices.push(Mat4::IDENTITY);
            }
        }
        matrices
    }

    /// Set the pose rotation of a bone. The rest transform is untouched.
    pub fn apply_pose_rotation(&mut self, id: BoneId, rotation: Quat) {
        self.bones[id.0].pose = rotation;
    }

    /// Whether any bone carries a pose rotation
    pub fn is_posed(&self) -> bool {
        self.bones.iter().any(Bone::is_posed)
    }

    /// Fold the pose of `id` (and, if `recursive`, of its whole subtree) into rest
    ///
    /// Walks the subtree top-down. Rest transforms are parent-relative, so once a
    /// parent's pose is folded its new rest frame equals its old posed frame, and
    /// each descendant's folded local transform is already expressed against it.
    /// Posed world transforms are unchanged; pose rotations return to identity.
    ///
    /// Returns the number of bones whose rest transform changed.
    pub fn commit_pose_as_rest(&mut self, id: BoneId, recursive: bool) -> usize {
        let mut in_subtree = vec![false; self.bones.len()];
        in_subtree[id.0] = true;

        let mut committed = 0;
        for i in id.0..self.bones.len() {
            if i != id.0 {
                if !recursive {
                    break;
                }
                in_subtree[i] = self.bones[i].parent.is_some_and(|p| in_subtree[p.0]);
                if !in_subtree[i] {
                    continue;
                }
            }

            let bone = &mut self.bones[i];
            if bone.is_posed() {
                bone.rest.rotation = math::combine(bone.rest.rotation, bone.pose);
                bone.pose = Quat::IDENTITY;
                committed += 1;
                tracing::debug!("Committed pose of bone '{}' as rest", bone.name);
            }
        }
        committed
    }

    /// Commit the pose of every root's subtree
    pub fn commit_all_poses_as_rest(&mut self) -> usize {
        let roots: Vec<BoneId> = self.roots().collect();
        roots
            .into_iter()
            .map(|root| self.commit_pose_as_rest(root, true))
            .sum()
    }

    /// Which side of the armature's mid-plane the bone points to at rest
    ///
    /// Returns the sign of the X component of the bone's rest Y axis in armature
    /// space, or `None` when the bone runs along the mid-plane.
    pub fn lateral_sign(&self, id: BoneId) -> Option<f32> {
        let direction = self.world_rotation(id, Space::Rest) * Vec3::Y;
        if direction.x.abs() < LATERAL_EPSILON {
            None
        } else {
            Some(direction.x.signum())
        }
    }
}
