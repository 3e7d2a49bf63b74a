//! Rig documents
//!
//! JSON interchange format holding one armature and the meshes bound to it.
//! Bones are listed parent-before-child and reference their parent by name.

use std::path::Path;

use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::error::SkeletonError;
use crate::math::LocalTransform;
use crate::shape_keys::{Mesh, find_bound_meshes};
use crate::skeleton::Skeleton;

/// Errors raised while reading or writing a rig document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rig document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid skeleton: {0}")]
    Skeleton(#[from] SkeletonError),
}

/// One bone entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub rest: LocalTransform,
    /// Pending pose rotation, omitted when identity
    #[serde(default = "identity_pose", skip_serializing_if = "is_identity")]
    pub pose: Quat,
}

fn identity_pose() -> Quat {
    Quat::IDENTITY
}

fn is_identity(q: &Quat) -> bool {
    *q == Quat::IDENTITY
}

/// Armature section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDoc {
    pub name: String,
    pub bones: Vec<BoneDoc>,
}

impl SkeletonDoc {
    /// Build the runtime skeleton, applying stored poses
    pub fn to_skeleton(&self) -> Result<Skeleton, SkeletonError> {
        let mut skeleton = Skeleton::new(self.name.clone());
        for bone in &self.bones {
            let id = skeleton.add_bone(bone.name.clone(), bone.parent.as_deref(), bone.rest)?;
            if !is_identity(&bone.pose) {
                skeleton.apply_pose_rotation(id, bone.pose);
            }
        }
        Ok(skeleton)
    }

    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        let bones = skeleton
            .bones()
            .map(|(_, bone)| BoneDoc {
                name: bone.name().to_string(),
                parent: bone.parent().map(|p| skeleton.bone(p).name().to_string()),
                rest: *bone.rest(),
                pose: bone.pose(),
            })
            .collect();
        Self {
            name: skeleton.name().to_string(),
            bones,
        }
    }
}

/// A skeleton plus its meshes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigDocument {
    pub skeleton: SkeletonDoc,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
}

impl RigDocument {
    pub fn new(skeleton: &Skeleton, meshes: Vec<Mesh>) -> Self {
        Self {
            skeleton: SkeletonDoc::from_skeleton(skeleton),
            meshes,
        }
    }

    /// Load a document from a JSON file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a document from JSON text
    ///
    /// Meshes without an armature binding are bound to the document's skeleton.
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        let mut document: RigDocument = serde_json::from_str(content)?;
        for mesh in &mut document.meshes {
            if mesh.armature.is_none() {
                mesh.armature = Some(document.skeleton.name.clone());
            }
        }
        Ok(document)
    }

    /// Write the document as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn to_skeleton(&self) -> Result<Skeleton, SkeletonError> {
        self.skeleton.to_skeleton()
    }

    /// Replace the skeleton section with the state of `skeleton`
    pub fn set_skeleton(&mut self, skeleton: &Skeleton) {
        self.skeleton = SkeletonDoc::from_skeleton(skeleton);
    }

    /// Meshes bound to this document's skeleton
    pub fn bound_meshes_mut(&mut self) -> impl Iterator<Item = &mut Mesh> {
        let bound = find_bound_meshes(&self.skeleton.name, &self.meshes);
        self.meshes
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| bound.contains(i))
            .map(|(_, mesh)| mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "skeleton": {
            "name": "Armature",
            "bones": [
                { "name": "hips", "rest": { "translation": [0.0, 0.0, 1.0] } },
                { "name": "upper_arm.L", "parent": "hips",
                  "rest": { "translation": [0.2, 0.5, 0.0], "rotation": [0.0, 0.0, -0.70710677, 0.70710677] },
                  "pose": [0.0, 0.25881905, 0.0, 0.9659258] }
            ]
        },
        "meshes": [
            { "name": "Body", "positions": [[0.0, 1.0, 0.0]] },
            { "name": "Prop", "armature": "Other", "positions": [] }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let document = RigDocument::parse(SAMPLE).unwrap();
        assert_eq!(document.meshes[0].armature.as_deref(), Some("Armature"));
        assert_eq!(document.meshes[0].basis_name, "Basis");
        assert_eq!(document.meshes[1].armature.as_deref(), Some("Other"));

        let skeleton = document.to_skeleton().unwrap();
        assert_eq!(skeleton.len(), 2);
        let arm = skeleton.require("upper_arm.L").unwrap();
        assert!(skeleton.bone(arm).is_posed());
        assert_eq!(skeleton.bone(arm).rest().translation, Vec3::new(0.2, 0.5, 0.0));
    }

    #[test]
    fn test_bound_meshes() {
        let mut document = RigDocument::parse(SAMPLE).unwrap();
        let names: Vec<String> = document.bound_meshes_mut().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["Body".to_string()]);
    }

    #[test]
    fn test_unknown_parent_is_reported() {
        let json = r#"{ "skeleton": { "name": "A", "bones": [ { "name": "arm", "parent": "spine" } ] } }"#;
        let document = RigDocument::parse(json).unwrap();
        assert!(matches!(
            document.to_skeleton(),
            Err(SkeletonError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rig.json");

        let document = RigDocument::parse(SAMPLE).unwrap();
        document.save(&path).unwrap();
        let loaded = RigDocument::load(&path).unwrap();
        assert_eq!(loaded, document);

        let written = std::fs::read_to_string(&path).unwrap();
        // unposed bones carry no pose entry
        assert_eq!(written.matches("\"pose\"").count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = RigDocument::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }
}
