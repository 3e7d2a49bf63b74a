//! Subcommand implementations

use anyhow::{Context, Result, bail};
use restpose_core::{
    BoneRole, BoneRoleAssignment, ConversionMode, ConversionReport, PoseConverter, RigDocument,
    Skeleton, detect_bone_roles, find_bound_meshes,
};
use std::path::{Path, PathBuf};

use crate::settings::PoseSettings;

/// Command-line values that take precedence over pose.toml
pub struct ConvertOverrides {
    pub mode: Option<ConversionMode>,
    pub shoulder_angle: Option<f32>,
    pub upper_arm_angle: Option<f32>,
    pub bones: Vec<(BoneRole, String)>,
    pub detect: bool,
}

/// `rig.json` -> `rig.converted.json`
pub fn default_output(rig: &Path) -> PathBuf {
    rig.with_extension("converted.json")
}

fn load_rig(path: &Path) -> Result<(RigDocument, Skeleton)> {
    let document = RigDocument::load(path)
        .with_context(|| format!("Failed to load rig: {}", path.display()))?;
    let skeleton = document
        .to_skeleton()
        .with_context(|| format!("Invalid skeleton in {}", path.display()))?;
    Ok((document, skeleton))
}

fn save_rig(mut document: RigDocument, skeleton: &Skeleton, path: &Path) -> Result<()> {
    document.set_skeleton(skeleton);
    document
        .save(path)
        .with_context(|| format!("Failed to write rig: {}", path.display()))
}

fn print_roles(roles: &BoneRoleAssignment) {
    for role in BoneRole::ALL {
        match roles.get(role) {
            Some(bone) => println!("  {:<16} {}", role, bone),
            None => println!("  {:<16} (not found)", role),
        }
    }
}

fn log_report(report: &ConversionReport) {
    for rotation in &report.rotations {
        tracing::info!(
            "  {} '{}': {:+.1}°",
            rotation.role,
            rotation.bone,
            rotation.angle_degrees
        );
    }
    for mesh in &report.meshes {
        tracing::info!(
            "  mesh '{}': {} vertices, {} shape keys",
            mesh.name,
            mesh.vertices,
            mesh.shape_keys
        );
    }
}

/// Print detected roles
pub fn detect(rig: &Path) -> Result<()> {
    let (_, skeleton) = load_rig(rig)?;
    let roles = detect_bone_roles(&skeleton);
    println!(
        "Armature '{}' ({} bones): {}/{} roles found",
        skeleton.name(),
        skeleton.len(),
        roles.assigned_count(),
        BoneRole::ALL.len()
    );
    print_roles(&roles);
    Ok(())
}

/// Resolve roles from settings, flags and detection
fn resolve_roles(
    skeleton: &Skeleton,
    settings: &PoseSettings,
    overrides: &ConvertOverrides,
) -> BoneRoleAssignment {
    let mut roles = if overrides.detect {
        BoneRoleAssignment::new()
    } else {
        settings.bones.clone()
    };
    for (role, bone) in &overrides.bones {
        roles.set(*role, bone.clone());
    }
    if overrides.detect || settings.detect.fill_missing {
        roles.merge_missing(&detect_bone_roles(skeleton));
    }
    roles
}

/// Convert a rig and write the result
pub fn convert(
    rig: &Path,
    output: &Path,
    settings: Option<&Path>,
    overrides: ConvertOverrides,
) -> Result<()> {
    let settings = PoseSettings::load_or_default(settings)?;
    let (mut document, mut skeleton) = load_rig(rig)?;

    let mut config = settings.conversion;
    if let Some(mode) = overrides.mode {
        config.mode = mode;
    }
    if let Some(angle) = overrides.shoulder_angle {
        config.shoulder_angle = angle;
    }
    if let Some(angle) = overrides.upper_arm_angle {
        config.upper_arm_angle = angle;
    }

    let roles = resolve_roles(&skeleton, &settings, &overrides);
    let report = PoseConverter::new()
        .convert(&mut skeleton, document.bound_meshes_mut(), &roles, &config)
        .with_context(|| format!("Failed to convert {}", rig.display()))?;
    log_report(&report);

    save_rig(document, &skeleton, output)
}

/// Bake the stored pose of a rig and write the result
pub fn set_rest(rig: &Path, output: &Path) -> Result<()> {
    let (mut document, mut skeleton) = load_rig(rig)?;
    let report = PoseConverter::new()
        .set_current_pose_as_rest(&mut skeleton, document.bound_meshes_mut())
        .with_context(|| format!("Failed to set rest pose of {}", rig.display()))?;
    log_report(&report);

    save_rig(document, &skeleton, output)
}

/// Validate skeleton, meshes and bindings
pub fn check(rig: &Path) -> Result<()> {
    let (document, skeleton) = load_rig(rig)?;

    let bound = find_bound_meshes(skeleton.name(), &document.meshes);
    for (_, mesh) in document
        .meshes
        .iter()
        .enumerate()
        .filter(|(i, _)| !bound.contains(i))
    {
        tracing::warn!(
            "Mesh '{}' is bound to {:?}, not '{}'; it will be left alone",
            mesh.name,
            mesh.armature,
            skeleton.name()
        );
    }

    let mut errors = Vec::new();
    for mesh in bound.iter().map(|&i| &document.meshes[i]) {
        if let Err(e) = mesh.validate() {
            errors.push(e.to_string());
        }
        let unmatched: Vec<&str> = mesh
            .vertex_groups
            .iter()
            .filter(|g| skeleton.find(g).is_none())
            .map(String::as_str)
            .collect();
        if !unmatched.is_empty() {
            tracing::warn!(
                "Mesh '{}': vertex groups without a bone do not deform: {}",
                mesh.name,
                unmatched.join(", ")
            );
        }
    }

    let roles = detect_bone_roles(&skeleton);
    tracing::info!(
        "Armature '{}': {} bones, {} bound meshes, {}/{} roles detected",
        skeleton.name(),
        skeleton.len(),
        bound.len(),
        roles.assigned_count(),
        BoneRole::ALL.len()
    );
    if skeleton.is_posed() {
        tracing::info!("Armature carries a pose; `set-rest` will bake it");
    }

    if !errors.is_empty() {
        for error in &errors {
            tracing::error!("{}", error);
        }
        bail!("{} invalid mesh(es) in {}", errors.len(), rig.display());
    }
    Ok(())
}
