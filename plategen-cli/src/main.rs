//! Plategen CLI - Command-line interface
//!
//! This binary cuts georeferenced rasters into tile pyramids using the
//! plategen library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::{EncodingArg, ProjectionArg};
use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;
use commands::inspect::InspectArgs;

#[derive(Parser)]
#[command(name = "plategen")]
#[command(version, about = "Cut georeferenced rasters into packed tile pyramids", long_about = None)]
struct Cli {
    /// Enable debug-level logging for plategen
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a tile pyramid, plate files, thumbnail and descriptor
    Generate {
        /// Source raster (any format the image crate decodes)
        source: PathBuf,

        /// Bounding box: TOP LEFT BOTTOM RIGHT in decimal degrees
        #[arg(
            long,
            required = true,
            num_args = 4,
            value_names = ["TOP", "LEFT", "BOTTOM", "RIGHT"],
            allow_negative_numbers = true
        )]
        bounds: Vec<f64>,

        /// Projection of the generated pyramid
        #[arg(long, value_enum, default_value = "equirectangular")]
        projection: ProjectionArg,

        /// Projection of the source raster (defaults to --projection)
        #[arg(long, value_enum)]
        source_projection: Option<ProjectionArg>,

        /// Directory that receives the output folder
        #[arg(long, short, default_value = ".")]
        output: PathBuf,

        /// Base name of the output folder (defaults to the source file stem)
        #[arg(long)]
        name: Option<String>,

        /// Worker threads for tile rendering (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Tile encoding inside plate files
        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,

        /// Longer edge of the thumbnail in pixels
        #[arg(long)]
        thumbnail_edge: Option<u32>,

        /// Print progress snapshots and the result as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show and validate the contents of a plate file
    Inspect {
        /// Plate file to inspect
        plate: PathBuf,

        /// Extract one tile, given as ROW,COL
        #[arg(long, value_name = "ROW,COL", requires = "out")]
        extract: Option<String>,

        /// Destination PNG for --extract
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            source,
            bounds,
            projection,
            source_projection,
            output,
            name,
            threads,
            encoding,
            thumbnail_edge,
            json,
        } => commands::generate::run(
            GenerateArgs {
                source,
                bounds,
                projection,
                source_projection,
                output,
                name,
                threads,
                encoding,
                thumbnail_edge,
                json,
            },
            cli.debug,
        ),
        Commands::Inspect {
            plate,
            extract,
            out,
        } => commands::inspect::run(InspectArgs {
            plate,
            extract,
            out,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
