//! Programmatic humanoid rig for integration tests.
//!
//! Builds a small armature with both arm chains and a weighted body mesh:
//! - hips → spine → chest, Y up
//! - shoulder / upper arm / forearm per side, arms along ±X
//! - three shape keys touching the torso, the arms and the shoulders

use glam::{Quat, Vec3};
use restpose_core::{LocalTransform, Mesh, ShapeKey, Skeleton};

/// Armature name shared by skeleton and mesh binding
pub const ARMATURE: &str = "Armature";

/// Vertices per arm side
const ARM_VERTICES: usize = 5;

/// Create the skeleton at rest (no pose)
pub fn skeleton() -> Skeleton {
    skeleton_named(ARMATURE)
}

/// Same rig under another armature name
///
/// Tests going through the process-wide converter run in parallel and need
/// distinct armatures.
pub fn skeleton_named(name: &str) -> Skeleton {
    let mut skeleton = Skeleton::new(name);
    let add = |skeleton: &mut Skeleton, name: &str, parent: Option<&str>, t: Vec3, r: Quat| {
        skeleton
            .add_bone(name, parent, LocalTransform::new(t, r))
            .expect("Failed to add bone");
    };

    add(&mut skeleton, "hips", None, Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
    add(&mut skeleton, "spine", Some("hips"), Vec3::new(0.0, 0.2, 0.0), Quat::IDENTITY);
    add(&mut skeleton, "chest", Some("spine"), Vec3::new(0.0, 0.2, 0.0), Quat::IDENTITY);

    for (suffix, sign) in [("L", 1.0f32), ("R", -1.0f32)] {
        // +Y bone axis turned onto ±X
        let outward = Quat::from_rotation_z(-sign * 90f32.to_radians());
        let shoulder = format!("shoulder.{suffix}");
        let upper_arm = format!("upper_arm.{suffix}");
        let forearm = format!("forearm.{suffix}");
        add(&mut skeleton, &shoulder, Some("chest"), Vec3::new(sign * 0.05, 0.15, 0.0), outward);
        add(&mut skeleton, &upper_arm, Some(&shoulder), Vec3::new(0.0, 0.15, 0.0), Quat::IDENTITY);
        add(&mut skeleton, &forearm, Some(&upper_arm), Vec3::new(0.0, 0.3, 0.0), Quat::IDENTITY);
    }
    skeleton
}

/// Create the body mesh bound to [`skeleton`]
pub fn body_mesh() -> Mesh {
    let mut positions = vec![
        Vec3::new(0.0, 1.0, 0.1),
        Vec3::new(0.0, 1.3, 0.1),
        Vec3::new(0.0, 1.5, 0.1),
    ];
    for sign in [1.0f32, -1.0f32] {
        positions.extend([
            Vec3::new(sign * 0.12, 1.58, 0.0),
            Vec3::new(sign * 0.2, 1.55, 0.05),
            Vec3::new(sign * 0.35, 1.55, 0.05),
            Vec3::new(sign * 0.5, 1.55, 0.05),
            Vec3::new(sign * 0.7, 1.55, 0.0),
        ]);
    }
    let mut mesh = Mesh::new("Body", positions).bound_to(ARMATURE);

    mesh.assign(0, "hips", 1.0);
    mesh.assign(1, "spine", 0.5);
    mesh.assign(1, "chest", 0.5);
    mesh.assign(2, "chest", 1.0);
    for (side, suffix) in ["L", "R"].into_iter().enumerate() {
        let base = 3 + side * ARM_VERTICES;
        let shoulder = format!("shoulder.{suffix}");
        let upper_arm = format!("upper_arm.{suffix}");
        let forearm = format!("forearm.{suffix}");
        mesh.assign(base, &shoulder, 1.0);
        mesh.assign(base + 1, &shoulder, 0.5);
        mesh.assign(base + 1, &upper_arm, 0.5);
        mesh.assign(base + 2, &upper_arm, 1.0);
        mesh.assign(base + 3, &upper_arm, 0.5);
        mesh.assign(base + 3, &forearm, 0.5);
        mesh.assign(base + 4, &forearm, 1.0);
    }

    let count = mesh.vertex_count();
    let key = |name: &str, value: f32, moved: &[(usize, Vec3)]| {
        let mut deltas = vec![Vec3::ZERO; count];
        for (vertex, delta) in moved {
            deltas[*vertex] = *delta;
        }
        let mut key = ShapeKey::new(name, deltas);
        key.value = value;
        key
    };
    mesh.add_shape_key(key("breathe", 0.0, &[(1, Vec3::Z * 0.02), (2, Vec3::Z * 0.03)]));
    mesh.add_shape_key(key(
        "flex",
        0.5,
        &[
            (5, Vec3::Y * 0.03),
            (6, Vec3::new(0.0, 0.02, 0.01)),
            (10, Vec3::Y * 0.03),
            (11, Vec3::new(0.0, 0.02, 0.01)),
        ],
    ));
    mesh.add_shape_key(key("shrug", 1.0, &[(3, Vec3::Y * 0.05), (8, Vec3::Y * 0.05)]));
    mesh
}

/// Whether two quaternions describe the same rotation
pub fn same_rotation(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-6
}

/// Largest per-vertex distance between two position sets
pub fn max_distance(a: &[Vec3], b: &[Vec3]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vertex count mismatch");
    a.iter()
        .zip(b)
        .map(|(p, q)| p.distance(*q))
        .fold(0.0, f32::max)
}
