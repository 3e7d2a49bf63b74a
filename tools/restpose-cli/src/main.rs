//! restpose - T-pose / A-pose rest conversion tool
//!
//! Reads rig documents (.json), rotates the arm bones, bakes the result as
//! the new rest pose and rebuilds the shape keys of every bound mesh.

use anyhow::Result;
use clap::{Parser, Subcommand};
use restpose_core::{BoneRole, ConversionMode};
use std::path::PathBuf;

mod commands;
mod settings;

#[derive(Parser)]
#[command(name = "restpose")]
#[command(about = "T-pose / A-pose rest conversion tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the bone roles found by name matching
    Detect {
        /// Input rig document
        rig: PathBuf,
    },

    /// Rotate the arms and bake the result as rest pose
    Convert {
        /// Input rig document
        rig: PathBuf,

        /// Output rig document (default: <rig>.converted.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to pose.toml settings
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Conversion direction (T_TO_A or A_TO_T)
        #[arg(short, long)]
        mode: Option<ConversionMode>,

        /// Shoulder rotation in degrees
        #[arg(long)]
        shoulder_angle: Option<f32>,

        /// Upper arm rotation in degrees
        #[arg(long)]
        upper_arm_angle: Option<f32>,

        /// Assign a bone to a role (e.g. left_shoulder=Shoulder.L), repeatable
        #[arg(short, long = "bone", value_parser = settings::parse_bone_override)]
        bones: Vec<(BoneRole, String)>,

        /// Ignore configured bone names and use detected ones
        #[arg(long)]
        detect: bool,
    },

    /// Bake the stored pose as rest pose
    SetRest {
        /// Input rig document
        rig: PathBuf,

        /// Output rig document (default: <rig>.converted.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a rig document without converting it
    Check {
        /// Input rig document
        rig: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { rig } => {
            commands::detect(&rig)?;
        }

        Commands::Convert {
            rig,
            output,
            settings,
            mode,
            shoulder_angle,
            upper_arm_angle,
            bones,
            detect,
        } => {
            let output = output.unwrap_or_else(|| commands::default_output(&rig));
            let overrides = commands::ConvertOverrides {
                mode,
                shoulder_angle,
                upper_arm_angle,
                bones,
                detect,
            };
            tracing::info!("Converting {:?} -> {:?}", rig, output);
            commands::convert(&rig, &output, settings.as_deref(), overrides)?;
            tracing::info!("Done!");
        }

        Commands::SetRest { rig, output } => {
            let output = output.unwrap_or_else(|| commands::default_output(&rig));
            tracing::info!("Setting rest pose {:?} -> {:?}", rig, output);
            commands::set_rest(&rig, &output)?;
            tracing::info!("Done!");
        }

        Commands::Check { rig } => {
            tracing::info!("Checking rig {:?}", rig);
            commands::check(&rig)?;
            tracing::info!("Rig is valid!");
        }
    }

    Ok(())
}
