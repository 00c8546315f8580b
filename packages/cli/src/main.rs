#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the hotspot analysis pipeline.
//!
//! Runs the full analysis over a set of period files and prints the
//! resulting cluster feature collections as JSON, or just the fitted
//! centroids for quick inspection.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hotspot_map_pipeline::PipelineConfig;

#[derive(Parser)]
#[command(name = "hotspot_map", about = "Crime incident hotspot analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and emit cluster feature collections
    Analyze {
        /// Period files in chronological order, oldest first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Cluster count; 0 derives one cluster per named area
        #[arg(long, default_value_t = 0)]
        clusters: usize,

        /// Write the JSON output here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Run the analysis and print only the fitted cluster centroids
    Centroids {
        /// Period files in chronological order, oldest first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Cluster count; 0 derives one cluster per named area
        #[arg(long, default_value_t = 0)]
        clusters: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            files,
            clusters,
            output,
            pretty,
        } => analyze(&files, clusters, output.as_deref(), pretty)?,
        Commands::Centroids { files, clusters } => centroids(&files, clusters)?,
    }

    Ok(())
}

fn analyze(
    files: &[PathBuf],
    clusters: usize,
    output: Option<&std::path::Path>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = hotspot_map_pipeline::run(files, &PipelineConfig::with_clusters(clusters))?;

    if let Some(err) = &analysis.boundary_error {
        log::warn!("Boundaries omitted: {err}");
    }

    let json = if pretty {
        serde_json::to_string_pretty(&analysis.collections)?
    } else {
        serde_json::to_string(&analysis.collections)?
    };

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(json.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            log::info!("Wrote {} collections to {}", analysis.collections.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn centroids(files: &[PathBuf], clusters: usize) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = hotspot_map_pipeline::run(files, &PipelineConfig::with_clusters(clusters))?;
    let counts = analysis.clustering.counts();

    for (cluster, centroid) in analysis.clustering.centroids.iter().enumerate() {
        let hotspot = analysis
            .labels
            .is_hotspot(u32::try_from(cluster).unwrap_or(u32::MAX));
        println!(
            "{cluster}\t{:.6}\t{:.6}\t{}\t{}",
            centroid.latitude,
            centroid.longitude,
            counts[cluster],
            if hotspot { "hotspot" } else { "-" }
        );
    }

    Ok(())
}
