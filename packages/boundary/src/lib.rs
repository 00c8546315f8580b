#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Voronoi boundary construction with infinite-region clipping.
//!
//! Computes the Voronoi diagram of the fitted cluster centroids and turns
//! every region into a finite, simple closed polygon. Bounded regions keep
//! their Voronoi vertices; unbounded regions get one synthesized far point
//! per open ridge, extended along the ridge normal away from the centroid
//! mean. Each region's vertices are then sorted by angle about the
//! cluster's own centroid, which is what keeps the polygon from
//! self-intersecting.
//!
//! The result depends only on centroid positions, never on incident order.

mod voronoi;

use hotspot_map_models::{Boundaries, GeoPoint};
use thiserror::Error;

use voronoi::VoronoiDual;

/// Errors that can occur during boundary construction.
///
/// All of these are fatal to the boundary stage only: clustering and
/// hotspot labels remain valid and usable without boundaries.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Fewer than 3 distinct centroids; a 2D tessellation is degenerate.
    #[error("Insufficient clusters for boundary computation: {distinct} distinct centroids")]
    InsufficientCentroids {
        /// Number of pairwise-distinct centroids seen.
        distinct: usize,
    },

    /// Two clusters share the same centroid; regions would be ambiguous.
    #[error("Duplicate cluster centroids")]
    DuplicateCentroids,

    /// The centroids admit no triangulation (e.g. all collinear).
    #[error("Degenerate tessellation: centroids admit no triangulation")]
    DegenerateTessellation,
}

/// Boundary construction configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConfig {
    /// Multiplier on the maximum coordinate spread of the centroid set
    /// used as the clipping radius for open ridges. Large enough to
    /// enclose all data; tunable so rendering scale can be adjusted
    /// without touching the tessellation.
    pub extension_factor: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            extension_factor: 2.0,
        }
    }
}

/// Builds one closed boundary polygon per cluster centroid.
///
/// The returned [`Boundaries`] is indexed by cluster id: ring `i` encloses
/// centroid `i`.
///
/// # Errors
///
/// Returns an error if fewer than 3 distinct centroids were supplied, if
/// any two centroids coincide, or if the centroid set admits no 2D
/// triangulation.
pub fn build(centroids: &[GeoPoint], config: &BoundaryConfig) -> Result<Boundaries, BoundaryError> {
    let distinct = distinct_count(centroids);
    if distinct < 3 {
        return Err(BoundaryError::InsufficientCentroids { distinct });
    }
    if distinct < centroids.len() {
        return Err(BoundaryError::DuplicateCentroids);
    }

    let dual = VoronoiDual::compute(centroids)?;
    let radius = config.extension_factor * spread(centroids);
    let regions = dual.clipped_regions(radius);

    let rings = regions
        .into_iter()
        .enumerate()
        .map(|(cluster, vertices)| order_by_angle(vertices, centroids[cluster]))
        .collect();

    log::info!("Built {} cluster boundaries", centroids.len());

    Ok(Boundaries::new(rings))
}

/// Number of pairwise-distinct centroids (exact coordinate equality).
fn distinct_count(centroids: &[GeoPoint]) -> usize {
    let mut distinct = 0;
    for (i, a) in centroids.iter().enumerate() {
        if !centroids[..i].iter().any(|b| b == a) {
            distinct += 1;
        }
    }
    distinct
}

/// Maximum coordinate spread of the centroid set across either axis.
fn spread(centroids: &[GeoPoint]) -> f64 {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for point in centroids {
        min_lat = min_lat.min(point.latitude);
        max_lat = max_lat.max(point.latitude);
        min_lng = min_lng.min(point.longitude);
        max_lng = max_lng.max(point.longitude);
    }

    (max_lat - min_lat).max(max_lng - min_lng)
}

/// Sorts region vertices by angle about the cluster's own centroid.
///
/// This ordering is the correctness property of the whole stage: without
/// it the polygon traversal self-intersects.
fn order_by_angle(mut vertices: Vec<GeoPoint>, centroid: GeoPoint) -> Vec<GeoPoint> {
    vertices.sort_by(|a, b| {
        let angle_a = (a.longitude - centroid.longitude).atan2(a.latitude - centroid.latitude);
        let angle_b = (b.longitude - centroid.longitude).atan2(b.latitude - centroid.latitude);
        angle_a.total_cmp(&angle_b)
    });
    vertices
}
