//! Integration tests for restpose
//!
//! Tests the full pipeline: write a rig document -> run the binary -> verify output

use glam::{Quat, Vec3};
use restpose_core::math::angle_about_axis;
use restpose_core::{Axis, LocalTransform, Mesh, RigDocument, ShapeKey, Skeleton};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

/// Two-armed rig with one weighted mesh and one shape key
fn test_rig() -> RigDocument {
    let mut skeleton = Skeleton::new("Armature");
    skeleton.add_bone("hips", None, LocalTransform::from_translation(Vec3::Y)).unwrap();
    for (suffix, sign) in [("L", 1.0f32), ("R", -1.0f32)] {
        let outward = Quat::from_rotation_z(-sign * 90f32.to_radians());
        skeleton
            .add_bone(
                format!("Shoulder.{suffix}"),
                Some("hips"),
                LocalTransform::new(Vec3::new(sign * 0.05, 0.4, 0.0), outward),
            )
            .unwrap();
        skeleton
            .add_bone(
                format!("UpperArm.{suffix}"),
                Some(format!("Shoulder.{suffix}").as_str()),
                LocalTransform::from_translation(Vec3::new(0.0, 0.15, 0.0)),
            )
            .unwrap();
    }

    let mut mesh = Mesh::new(
        "Body",
        vec![
            Vec3::new(0.0, 1.2, 0.1),
            Vec3::new(0.4, 1.4, 0.05),
            Vec3::new(-0.4, 1.4, 0.05),
        ],
    );
    mesh.assign(0, "hips", 1.0);
    mesh.assign(1, "UpperArm.L", 1.0);
    mesh.assign(2, "UpperArm.R", 1.0);
    let mut key = ShapeKey::new("Flex", vec![Vec3::ZERO, Vec3::Y * 0.02, Vec3::Y * 0.02]);
    key.value = 0.25;
    mesh.add_shape_key(key);

    RigDocument::new(&skeleton, vec![mesh])
}

fn write_rig(document: &RigDocument, path: &Path) {
    document.save(path).expect("Failed to write rig");
}

// Helper to run restpose with arguments
fn restpose(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_restpose"))
        .args(args)
        .output()
        .expect("Failed to run restpose")
}

fn rest_angle(document: &RigDocument, bone: &str, axis: Axis) -> f32 {
    let skeleton = document.to_skeleton().expect("Invalid skeleton");
    let id = skeleton.require(bone).expect("Bone missing");
    angle_about_axis(skeleton.bone(id).rest().rotation, axis)
}

/// Test that detect prints all four roles
#[test]
fn test_detect() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rig_path = dir.path().join("rig.json");
    write_rig(&test_rig(), &rig_path);

    let output = restpose(&["detect", rig_path.to_str().unwrap()]);
    assert!(output.status.success(), "restpose detect failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4/4 roles found"), "Unexpected output: {}", stdout);
    assert!(stdout.contains("UpperArm.R"));
}

/// Test T -> A conversion and the reverse through a settings file
#[test]
fn test_convert_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rig_path = dir.path().join("rig.json");
    let a_pose_path = dir.path().join("a_pose.json");
    let t_pose_path = dir.path().join("t_pose.json");
    let settings_path = dir.path().join("pose.toml");
    write_rig(&test_rig(), &rig_path);

    let output = restpose(&[
        "convert",
        rig_path.to_str().unwrap(),
        "-o",
        a_pose_path.to_str().unwrap(),
        "--mode",
        "T_TO_A",
        "--upper-arm-angle",
        "30",
    ]);
    assert!(output.status.success(), "restpose convert T_TO_A failed");

    let a_pose = RigDocument::load(&a_pose_path).expect("Failed to load converted rig");
    // Arms swing down about the front-to-back axis, mirrored per side
    assert!((rest_angle(&a_pose, "UpperArm.L", Axis::Z) + 30.0).abs() < 1e-3);
    assert!((rest_angle(&a_pose, "UpperArm.R", Axis::Z) - 30.0).abs() < 1e-3);
    assert!(a_pose.meshes[0].positions[1].y < 1.4, "Left hand did not drop");
    assert!(a_pose.meshes[0].positions[2].y < 1.4, "Right hand did not drop");
    let key = &a_pose.meshes[0].shape_keys[0];
    assert_eq!(key.name, "Flex");
    assert_eq!(key.value, 0.25);

    std::fs::write(
        &settings_path,
        "[conversion]\nmode = \"A_TO_T\"\nupper_arm_angle = 30.0\n",
    )
    .expect("Failed to write settings");
    let output = restpose(&[
        "convert",
        a_pose_path.to_str().unwrap(),
        "-o",
        t_pose_path.to_str().unwrap(),
        "--settings",
        settings_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "restpose convert A_TO_T failed");

    let t_pose = RigDocument::load(&t_pose_path).expect("Failed to load converted rig");
    assert!(rest_angle(&t_pose, "UpperArm.L", Axis::Z).abs() < 1e-3);
    assert!(rest_angle(&t_pose, "UpperArm.R", Axis::Z).abs() < 1e-3);
}

/// Test that the default output path sits next to the input
#[test]
fn test_convert_default_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rig_path = dir.path().join("hero.json");
    write_rig(&test_rig(), &rig_path);

    let output = restpose(&["convert", rig_path.to_str().unwrap()]);
    assert!(output.status.success(), "restpose convert failed");
    assert!(dir.path().join("hero.converted.json").exists());
}

/// Test that an unknown bone fails without writing anything
#[test]
fn test_convert_unknown_bone() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rig_path = dir.path().join("rig.json");
    let out_path = dir.path().join("out.json");
    write_rig(&test_rig(), &rig_path);

    let output = restpose(&[
        "convert",
        rig_path.to_str().unwrap(),
        "-o",
        out_path.to_str().unwrap(),
        "--bone",
        "left_shoulder=Clavicle.L",
    ]);
    assert!(!output.status.success(), "Unknown bone should fail");
    assert!(!out_path.exists(), "No output should be written on failure");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Clavicle.L"), "Unexpected error: {}", stderr);
}

/// Test that set-rest bakes a stored pose
#[test]
fn test_set_rest() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rig_path = dir.path().join("rig.json");
    let out_path = dir.path().join("out.json");

    let mut document = test_rig();
    document.skeleton.bones[2].pose = Quat::from_rotation_y(0.5);
    write_rig(&document, &rig_path);

    let output = restpose(&[
        "set-rest",
        rig_path.to_str().unwrap(),
        "-o",
        out_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "restpose set-rest failed");

    let baked = RigDocument::load(&out_path).expect("Failed to load baked rig");
    let skeleton = baked.to_skeleton().expect("Invalid skeleton");
    assert!(!skeleton.is_posed());
    assert!((rest_angle(&baked, "UpperArm.L", Axis::Y) - 0.5f32.to_degrees()).abs() < 1e-2);
}

/// Test that check accepts a good rig and rejects a broken shape key
#[test]
fn test_check() {
    let dir = tempdir().expect("Failed to create temp dir");
    let good_path = dir.path().join("good.json");
    let bad_path = dir.path().join("bad.json");

    write_rig(&test_rig(), &good_path);
    let output = restpose(&["check", good_path.to_str().unwrap()]);
    assert!(output.status.success(), "restpose check failed on a valid rig");

    let mut broken = test_rig();
    broken.meshes[0].add_shape_key(ShapeKey::new("Short", vec![Vec3::ZERO]));
    write_rig(&broken, &bad_path);
    let output = restpose(&["check", bad_path.to_str().unwrap()]);
    assert!(!output.status.success(), "restpose check should fail");
}
