//! pose.toml settings parsing
//!
//! Optional file next to a rig describing how to convert it. Every section
//! may be omitted; command-line flags override what the file says.

use anyhow::{Context, Result};
use restpose_core::{BoneRole, BoneRoleAssignment, ConversionConfig};
use serde::Deserialize;
use std::path::Path;

/// pose.toml structure
#[derive(Debug, Default, Deserialize)]
pub struct PoseSettings {
    /// Rotation parameters
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Explicit role -> bone name assignments
    #[serde(default)]
    pub bones: BoneRoleAssignment,

    #[serde(default)]
    pub detect: DetectSection,
}

/// Bone detection section
#[derive(Debug, Deserialize)]
pub struct DetectSection {
    /// Fill roles missing from `[bones]` by matching bone names.
    /// Default: true
    #[serde(default = "default_fill_missing")]
    pub fill_missing: bool,
}

fn default_fill_missing() -> bool {
    true
}

impl Default for DetectSection {
    fn default() -> Self {
        Self {
            fill_missing: default_fill_missing(),
        }
    }
}

impl PoseSettings {
    /// Load settings from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse settings from string
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("Failed to parse pose.toml")?;
        settings.conversion.validate()?;
        Ok(settings)
    }

    /// Load from `path` when given, stock settings otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Parse a `role=bone` command-line assignment
pub fn parse_bone_override(arg: &str) -> Result<(BoneRole, String), String> {
    let (role, bone) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=BONE, got '{}'", arg))?;
    let role: BoneRole = role.trim().parse()?;
    Ok((role, bone.trim().to_string()))
}
