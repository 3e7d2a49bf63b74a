//! Pose converter
//!
//! Runs the whole T↔A pipeline for one armature:
//!
//! 1. Resolve roles to bones and compute a signed angle per bone
//! 2. Apply the rotations as pose offsets, ancestors first
//! 3. Capture the posed geometry of every bound mesh
//! 4. Commit the pose as the new rest pose
//! 5. Rebuild basis and shape keys from the captures
//!
//! Everything happens on a working copy of the skeleton and on fresh geometry
//! buffers. The caller's data is only replaced once every step succeeded.

use std::sync::{Mutex, OnceLock};

use glam::Quat;
use hashbrown::HashMap;

use crate::config::{ConversionConfig, ConversionMode, MirrorMode, RotationAxis, RotationSpace};
use crate::error::{ConversionError, ConversionWarning};
use crate::math::{self, rotate_about_axis};
use crate::rebuild::{self, RebuiltShapes};
use crate::roles::{BoneRole, BoneRoleAssignment};
use crate::shape_keys::Mesh;
use crate::skeleton::{BoneId, Skeleton, Space};

// ============================================================================
// State tracking
// ============================================================================

/// Stage of an in-flight conversion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversionState {
    #[default]
    Idle,
    Rotating,
    Committing,
    RebuildingShapeKeys,
}

/// Marks an armature as busy until dropped
pub struct ConversionGuard<'a> {
    converter: &'a PoseConverter,
    armature: String,
}

impl ConversionGuard<'_> {
    pub fn armature(&self) -> &str {
        &self.armature
    }

    fn advance(&self, state: ConversionState) {
        tracing::debug!("'{}': {:?}", self.armature, state);
        self.converter
            .lock()
            .insert(self.armature.clone(), state);
    }
}

impl Drop for ConversionGuard<'_> {
    fn drop(&mut self) {
        self.converter.lock().remove(&self.armature);
    }
}

// ============================================================================
// Report
// ============================================================================

/// Rotation applied to one bone
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedRotation {
    pub role: BoneRole,
    pub bone: String,
    /// Signed angle about the configured axis, in degrees
    pub angle_degrees: f32,
}

/// Per-mesh outcome
#[derive(Clone, Debug, PartialEq)]
pub struct MeshReport {
    pub name: String,
    pub vertices: usize,
    pub shape_keys: usize,
}

/// Outcome of a successful conversion
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionReport {
    pub armature: String,
    /// `None` for a plain rest-pose commit
    pub mode: Option<ConversionMode>,
    pub rotations: Vec<AppliedRotation>,
    /// Bones whose rest transform changed
    pub committed_bones: usize,
    pub meshes: Vec<MeshReport>,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    /// Shape keys rebuilt across all meshes
    pub fn rebuilt_shape_keys(&self) -> usize {
        self.meshes.iter().map(|m| m.shape_keys).sum()
    }
}

// ============================================================================
// Converter
// ============================================================================

/// One bone rotation, planned before anything is touched
struct PlannedRotation {
    role: BoneRole,
    bone: BoneId,
    angle_degrees: f32,
}

/// Converts armatures between rest-pose conventions
///
/// Tracks in-flight armatures so a shared converter refuses to start a second
/// conversion of the same armature. Different armatures are independent.
#[derive(Default)]
pub struct PoseConverter {
    in_flight: Mutex<HashMap<String, ConversionState>>,
}

impl PoseConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ConversionState>> {
        self.in_flight.lock().unwrap_or_else(|e| {
            tracing::warn!("Conversion state mutex poisoned; continuing");
            e.into_inner()
        })
    }

    /// Claim an armature for the lifetime of the returned guard
    pub fn begin(&self, armature: &str) -> Result<ConversionGuard<'_>, ConversionError> {
        let mut in_flight = self.lock();
        if in_flight.contains_key(armature) {
            return Err(ConversionError::ConversionInProgress(armature.to_string()));
        }
        in_flight.insert(armature.to_string(), ConversionState::Idle);
        Ok(ConversionGuard {
            converter: self,
            armature: armature.to_string(),
        })
    }

    /// Current stage for an armature (`Idle` when nothing is running)
    pub fn state(&self, armature: &str) -> ConversionState {
        self.lock().get(armature).copied().unwrap_or_default()
    }

    /// Rotate the assigned bones, bake the result as rest pose and rebuild shape keys
    pub fn convert<'m>(
        &self,
        skeleton: &mut Skeleton,
        meshes: impl IntoIterator<Item = &'m mut Mesh>,
        roles: &BoneRoleAssignment,
        config: &ConversionConfig,
    ) -> Result<ConversionReport, ConversionError> {
        let guard = self.begin(skeleton.name())?;
        config.validate()?;

        let mut warnings = Vec::new();
        let plan = plan_rotations(skeleton, roles, config, &mut warnings)?;

        tracing::info!(
            "Converting '{}' ({}): {} bone rotations",
            skeleton.name(),
            config.mode,
            plan.len()
        );
        self.run(&guard, skeleton, meshes, plan, Some(config), warnings)
    }

    /// Bake the skeleton's current pose as rest pose and rebuild shape keys
    pub fn set_current_pose_as_rest<'m>(
        &self,
        skeleton: &mut Skeleton,
        meshes: impl IntoIterator<Item = &'m mut Mesh>,
    ) -> Result<ConversionReport, ConversionError> {
        let guard = self.begin(skeleton.name())?;
        tracing::info!("Setting current pose of '{}' as rest", skeleton.name());
        self.run(&guard, skeleton, meshes, Vec::new(), None, Vec::new())
    }

    fn run<'m>(
        &self,
        guard: &ConversionGuard<'_>,
        skeleton: &mut Skeleton,
        meshes: impl IntoIterator<Item = &'m mut Mesh>,
        plan: Vec<PlannedRotation>,
        config: Option<&ConversionConfig>,
        mut warnings: Vec<ConversionWarning>,
    ) -> Result<ConversionReport, ConversionError> {
        let mut meshes: Vec<&mut Mesh> = meshes.into_iter().collect();
        for mesh in &meshes {
            mesh.validate()?;
        }
        if meshes.is_empty() {
            warnings.push(ConversionWarning::NoMeshes);
        }

        // 1-2: pose the working copy
        guard.advance(ConversionState::Rotating);
        let mut working = skeleton.clone();
        let mut rotations = Vec::with_capacity(plan.len());
        if let Some(config) = config {
            for step in &plan {
                apply_rotation(&mut working, step, config);
                rotations.push(AppliedRotation {
                    role: step.role,
                    bone: working.bone(step.bone).name().to_string(),
                    angle_degrees: step.angle_degrees,
                });
            }
        }

        // 3: capture the posed geometry
        let bone_matrices = working.skinning_matrices();
        let snapshots: Vec<_> = meshes
            .iter()
            .map(|mesh| rebuild::pre_capture(mesh, &working, &bone_matrices))
            .collect();

        // 4: bake
        guard.advance(ConversionState::Committing);
        let committed_bones = working.commit_all_poses_as_rest();

        // 5: rebuild against the committed skeleton
        guard.advance(ConversionState::RebuildingShapeKeys);
        let rebuilt = meshes
            .iter()
            .zip(snapshots)
            .map(|(mesh, snapshot)| rebuild::post_rebuild(mesh, &working, snapshot))
            .collect::<Result<Vec<RebuiltShapes>, _>>()?;

        // Every step succeeded, publish
        *skeleton = working;
        let mut mesh_reports = Vec::with_capacity(meshes.len());
        for (mesh, shapes) in meshes.iter_mut().zip(rebuilt) {
            shapes.apply(mesh);
            mesh_reports.push(MeshReport {
                name: mesh.name.clone(),
                vertices: mesh.vertex_count(),
                shape_keys: mesh.shape_keys.len(),
            });
        }

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            "'{}' done: {} bones committed, {} meshes, {} shape keys rebuilt",
            skeleton.name(),
            committed_bones,
            mesh_reports.len(),
            mesh_reports.iter().map(|m| m.shape_keys).sum::<usize>()
        );

        Ok(ConversionReport {
            armature: skeleton.name().to_string(),
            mode: config.map(|c| c.mode),
            rotations,
            committed_bones,
            meshes: mesh_reports,
            warnings,
        })
    }
}

/// Resolve roles and compute every signed angle against the unmodified skeleton
fn plan_rotations(
    skeleton: &Skeleton,
    roles: &BoneRoleAssignment,
    config: &ConversionConfig,
    warnings: &mut Vec<ConversionWarning>,
) -> Result<Vec<PlannedRotation>, ConversionError> {
    let unassigned = roles.unassigned();
    if !unassigned.is_empty() {
        warnings.push(ConversionWarning::PartialRoles(unassigned));
    }

    let mut plan: Vec<PlannedRotation> = Vec::new();
    for (role, name) in roles.assigned() {
        let bone = skeleton
            .find(name)
            .ok_or_else(|| ConversionError::BoneNotFound {
                armature: skeleton.name().to_string(),
                role,
                bone: name.to_string(),
            })?;

        if plan.iter().any(|p| p.bone == bone) {
            warnings.push(ConversionWarning::SharedBone {
                role,
                bone: name.to_string(),
            });
            continue;
        }

        let mirror = match config.mirror {
            MirrorMode::BoneAxis => skeleton
                .lateral_sign(bone)
                .unwrap_or_else(|| role.side().sign()),
            MirrorMode::RoleSide => role.side().sign(),
        };
        let mut angle_degrees = config.mode.sign() * mirror * config.angle_for(role.kind());
        if angle_degrees == 0.0 {
            // no -0.0 in reports
            angle_degrees = 0.0;
        }
        tracing::debug!("{} -> '{}': {:.3}°", role, name, angle_degrees);

        plan.push(PlannedRotation {
            role,
            bone,
            angle_degrees,
        });
    }

    // Ancestors before descendants
    plan.sort_by_key(|p| p.bone);
    Ok(plan)
}

fn apply_rotation(skeleton: &mut Skeleton, step: &PlannedRotation, config: &ConversionConfig) {
    if step.angle_degrees == 0.0 {
        return;
    }
    let bone = skeleton.bone(step.bone);

    let pose = match (config.axis.fixed(), config.space) {
        (Some(axis), RotationSpace::Local) => {
            math::combine(bone.pose(), rotate_about_axis(step.angle_degrees, axis))
        }
        (fixed, _) => {
            let increment = match fixed {
                Some(axis) => rotate_about_axis(step.angle_degrees, axis),
                None => Quat::from_axis_angle(
                    RotationAxis::SWING_DIRECTION,
                    step.angle_degrees.to_radians(),
                ),
            };
            let parent_world = bone
                .parent()
                .map(|p| skeleton.world_rotation(p, Space::Posed))
                .unwrap_or(Quat::IDENTITY);
            let current_world = skeleton.world_rotation(step.bone, Space::Posed);
            math::rotate_in_world(parent_world, bone.rest().rotation, current_world, increment)
        }
    };
    skeleton.apply_pose_rotation(step.bone, pose);
}

// ============================================================================
// Free functions
// ============================================================================

fn shared_converter() -> &'static PoseConverter {
    static CONVERTER: OnceLock<PoseConverter> = OnceLock::new();
    CONVERTER.get_or_init(PoseConverter::new)
}

/// Convert one skeleton and mesh through the process-wide converter
pub fn convert_pose(
    skeleton: &mut Skeleton,
    mesh: &mut Mesh,
    roles: &BoneRoleAssignment,
    config: &ConversionConfig,
) -> Result<ConversionReport, ConversionError> {
    shared_converter().convert(skeleton, std::iter::once(mesh), roles, config)
}

/// Commit the current pose of one skeleton and mesh through the process-wide converter
pub fn set_current_pose_as_rest(
    skeleton: &mut Skeleton,
    mesh: &mut Mesh,
) -> Result<ConversionReport, ConversionError> {
    shared_converter().set_current_pose_as_rest(skeleton, std::iter::once(mesh))
}
