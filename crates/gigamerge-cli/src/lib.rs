//! # GigaMerge CLI
//!
//! Command-line interface for building and inspecting GigaMeshes.
//!
//! ## Commands
//! - `merge` - Merge actors from a scene file into a GigaMesh
//! - `inspect` - Print the batches of a saved GigaMesh

pub mod scene;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use gigamerge_assets::package::object_path_to_package_name;
use gigamerge_assets::{AssetStore, ContentDirectory, GigaMesh};
use gigamerge_core::MergeSettings;
use gigamerge_editor::{LayoutMergeService, MergeTool};

use crate::scene::SceneFile;

/// GigaMerge CLI
#[derive(Parser)]
#[command(name = "gigamerge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Content directory mounted at /Game
    #[arg(short, long, default_value = "content")]
    pub content: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Merge actors from a scene file into a GigaMesh
    Merge {
        /// Scene description (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Package of the merged static mesh
        #[arg(short, long)]
        package: Option<String>,

        /// Merge settings (JSON), defaults for missing fields
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Only merge these actors
        #[arg(long = "select")]
        select: Vec<String>,
    },

    /// Print the batches of a saved GigaMesh
    Inspect {
        /// Package or object path of the GigaMesh
        package: String,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Merge { scene, package, settings, select } => {
            let settings = load_settings(settings.as_deref())?;
            log::debug!("Settings: {:?}", settings);

            let selection = SceneFile::load(&scene)?.into_selection(&select)?;
            let store = ContentDirectory::open(&cli.content)?;
            let mut tool = MergeTool::new(settings, LayoutMergeService, store);
            *tool.selection_mut() = selection;

            if !tool.can_merge() {
                bail!(
                    "need at least two components to merge, scene selects {}",
                    tool.selection().num_selected()
                );
            }

            let package = package.unwrap_or_else(|| tool.default_package_name());
            log::info!("Merging into {}...", package);
            let giga = tool.run_merge(&package)?;
            print_batches(&giga);
        }

        Commands::Inspect { package } => {
            let store = ContentDirectory::open(&cli.content)?;
            let giga = store.load_giga_mesh(object_path_to_package_name(&package))?;
            print_batches(&giga);
            match giga.verify() {
                Ok(()) => println!("batches cover every section"),
                Err(e) => println!("inconsistent batches: {e}"),
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<MergeSettings> {
    let Some(path) = path else {
        return Ok(MergeSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
}

fn print_batches(giga: &GigaMesh) {
    println!("{} ({})", giga.package, giga.id);
    for ((lod, section), batch) in giga.batches.iter() {
        let material = giga
            .mesh
            .section_material(lod, section)
            .map_or("<none>", |m| m.name());
        println!(
            "  LOD {lod} section {section} [{material}]: {} elements, {} triangles",
            batch.len(),
            batch.total_triangles()
        );
        for element in &batch.elements {
            let o = element.bounds.origin;
            println!(
                "    source {:>3}  triangles {:>8}..{:<8}  origin ({:.2}, {:.2}, {:.2})  radius {:.2}",
                element.source_index,
                element.first_index,
                element.end_index(),
                o.x,
                o.y,
                o.z,
                element.bounds.sphere_radius
            );
        }
    }
}
