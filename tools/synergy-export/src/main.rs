//! synergy-export - Rune Synergy asset tool
//!
//! Validates and re-encodes .mdl models, infers skeletons from .rig files,
//! and bakes bone labels into models.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

// Use modules from library
use synergy_export::{MODEL_EXT, RIG_EXT, manifest, mesh, skeleton};

#[derive(Parser)]
#[command(name = "synergy-export")]
#[command(about = "Rune Synergy asset tool")]
#[command(version)]
struct Cli {
    /// Path to a synergy.toml config (default: ./synergy.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a .mdl or .rig file and print its counts
    Check {
        /// Input .mdl or .rig file
        input: PathBuf,
    },

    /// Decode a model and encode it again
    Model {
        /// Input .mdl file
        input: PathBuf,

        /// Output .mdl file (default: <input>.out.mdl)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Infer a skeleton from a model's labels
    Rig {
        /// Labeled .mdl file
        model: PathBuf,

        /// Input .rig file
        rig: PathBuf,

        /// Output skeleton JSON (default: <rig>.skeleton.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the skeleton as a .rig document
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Infer a rig and write the model with bone labels and origin markers
    Bake {
        /// Labeled .mdl file
        model: PathBuf,

        /// Input .rig file
        rig: PathBuf,

        /// Output .mdl file (default: <model>.baked.mdl)
        #[arg(short, long)]
        output: Option<PathBuf>,
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
    let config = manifest::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { input } => check(&input)?,

        Commands::Model { input, output } => {
            let output =
                output.unwrap_or_else(|| input.with_extension(format!("out.{}", MODEL_EXT)));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            mesh::convert_model(&input, &output, &config.model)?;
            tracing::info!("Done!");
        }

        Commands::Rig {
            model,
            rig,
            output,
            export,
        } => {
            let output = output.unwrap_or_else(|| rig.with_extension("skeleton.json"));
            tracing::info!("Inferring skeleton {:?} + {:?} -> {:?}", model, rig, output);
            let result = skeleton::convert_rig(
                &model,
                &rig,
                &output,
                export.as_deref(),
                &config.model,
                &config.rig,
            )?;
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            tracing::info!("Done!");
        }

        Commands::Bake { model, rig, output } => {
            let output =
                output.unwrap_or_else(|| model.with_extension(format!("baked.{}", MODEL_EXT)));
            tracing::info!("Baking {:?} + {:?} -> {:?}", model, rig, output);
            let result = skeleton::bake_model(&model, &rig, &output, &config.model, &config.rig)?;
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            tracing::info!("Done!");
        }
    }

    Ok(())
}

/// Validate a file by its extension and print a summary
fn check(input: &Path) -> Result<()> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        MODEL_EXT => {
            let model = mesh::read_model(input)?;
            println!(
                "{}: {} vertices, {} faces",
                input.display(),
                model.vertex_count(),
                model.face_count()
            );
        }
        RIG_EXT => {
            let rig = skeleton::read_rig(input)?;
            println!(
                "{}: {} bones ({:?})",
                input.display(),
                rig.bones.len(),
                rig.schema
            );
        }
        _ => anyhow::bail!(
            "Unsupported file: {:?} (use .{} or .{})",
            input,
            MODEL_EXT,
            RIG_EXT
        ),
    }
    Ok(())
}
