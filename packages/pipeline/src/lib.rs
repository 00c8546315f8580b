#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot analysis pipeline orchestrator.
//!
//! Composes the five pure stages in strict sequence: ingestion, cluster
//! fitting, trend classification, boundary construction, and result
//! assembly. Each stage consumes only the prior stage's output plus
//! static configuration. The run is synchronous and one-shot, with no
//! retries. The one softened failure is the boundary stage: clusters and
//! labels remain valid without boundaries, so its error is recorded on
//! the result instead of aborting the run.

use std::path::Path;
use std::time::Instant;

use geojson::FeatureCollection;
use hotspot_map_boundary::{BoundaryConfig, BoundaryError};
use hotspot_map_cluster::{ClusterConfig, ClusterError};
use hotspot_map_ingest::IngestError;
use hotspot_map_models::{Clustering, HotspotLabels};
use hotspot_map_trend::{PeriodCountTable, TrendError};
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ingestion failed structurally (encoding, missing column, I/O).
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The cleaned incident set was empty; clustering cannot proceed.
    #[error("No incidents survived cleaning; cannot cluster an empty dataset")]
    EmptyDataset,

    /// Cluster fitting failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Trend classification failed.
    #[error(transparent)]
    Trend(#[from] TrendError),
}

/// Static configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    /// Cluster engine configuration; `clusters == 0` auto-seeds from
    /// named-area groups.
    pub cluster: ClusterConfig,
    /// Boundary construction configuration.
    pub boundary: BoundaryConfig,
}

impl PipelineConfig {
    /// Configuration with an explicit cluster count and default tuning.
    #[must_use]
    pub fn with_clusters(clusters: usize) -> Self {
        Self {
            cluster: ClusterConfig::with_clusters(clusters),
            boundary: BoundaryConfig::default(),
        }
    }
}

/// The completed analysis for one run.
#[derive(Debug)]
pub struct HotspotAnalysis {
    /// One feature collection per cluster, in cluster-id order. This is
    /// the sole externally consumed artifact.
    pub collections: Vec<FeatureCollection>,
    /// The fitted cluster partition.
    pub clustering: Clustering,
    /// Hotspot flag per cluster, exactly K entries.
    pub labels: HotspotLabels,
    /// Set when boundary construction was skipped; collections then carry
    /// no boundary features but stay otherwise complete.
    pub boundary_error: Option<BoundaryError>,
}

/// Runs the full pipeline over the given source files.
///
/// The 1-based file position becomes each row's period index.
///
/// # Errors
///
/// Returns an error if ingestion fails, the cleaned dataset is empty, or
/// cluster fitting / trend classification fail. A boundary failure does
/// not abort the run; it is recorded on the result instead.
pub fn run<P: AsRef<Path>>(
    paths: &[P],
    config: &PipelineConfig,
) -> Result<HotspotAnalysis, PipelineError> {
    let start = Instant::now();

    let stage = Instant::now();
    let incidents = hotspot_map_ingest::ingest(paths)?;
    log::debug!("Ingestion finished in {:?}", stage.elapsed());
    if incidents.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let stage = Instant::now();
    let clustering = hotspot_map_cluster::fit(&incidents, &config.cluster)?;
    log::debug!("Clustering finished in {:?}", stage.elapsed());

    let stage = Instant::now();
    let periods = u32::try_from(paths.len()).unwrap_or(u32::MAX);
    let table = PeriodCountTable::aggregate(&clustering, &incidents, periods);
    let labels = hotspot_map_trend::classify(&table)?;
    log::debug!("Trend classification finished in {:?}", stage.elapsed());

    let stage = Instant::now();
    let boundaries = match hotspot_map_boundary::build(&clustering.centroids, &config.boundary) {
        Ok(boundaries) => Some(boundaries),
        Err(err) => {
            log::warn!("Boundary computation skipped: {err}");
            return Ok(finish(incidents, clustering, labels, None, Some(err), start));
        }
    };
    log::debug!("Boundary construction finished in {:?}", stage.elapsed());

    Ok(finish(incidents, clustering, labels, boundaries, None, start))
}

fn finish(
    incidents: Vec<hotspot_map_models::Incident>,
    clustering: Clustering,
    labels: HotspotLabels,
    boundaries: Option<hotspot_map_models::Boundaries>,
    boundary_error: Option<BoundaryError>,
    start: Instant,
) -> HotspotAnalysis {
    let collections =
        hotspot_map_output::assemble(&incidents, &clustering, &labels, boundaries.as_ref());

    log::info!(
        "Pipeline complete: {} incidents, {} clusters in {:?}",
        incidents.len(),
        clustering.k(),
        start.elapsed()
    );

    HotspotAnalysis {
        collections,
        clustering,
        labels,
        boundary_error,
    }
}
