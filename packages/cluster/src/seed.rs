//! Initial-centroid seeding strategies.
//!
//! The engine never reaches for a random number generator: farthest-point
//! seeding is deterministic given the configured seed, and the named-area
//! policy is deterministic by construction. Reproducible runs fall out for
//! free.

use std::collections::BTreeMap;

use hotspot_map_models::{GeoPoint, Incident};

use crate::ClusterError;

/// How the engine chooses its initial centroids.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedStrategy {
    /// Greedy farthest-point seeding for an explicit cluster count. The
    /// first centroid index is derived from `seed`; each further centroid
    /// is the point farthest from all chosen so far.
    FarthestPoint {
        /// Target cluster count, >= 1.
        clusters: usize,
        /// Controls which point seeds the greedy selection.
        seed: u64,
    },
    /// One centroid per named-area group, placed at the group's mean
    /// coordinate. K becomes the number of groups.
    AreaMeans,
    /// Caller-supplied centroids, used verbatim.
    Explicit(Vec<GeoPoint>),
}

/// Produces the initial centroids for the given strategy.
///
/// # Errors
///
/// Returns an error if the strategy cannot yield at least one centroid.
pub fn initial_centroids(
    strategy: &SeedStrategy,
    incidents: &[Incident],
) -> Result<Vec<GeoPoint>, ClusterError> {
    match strategy {
        SeedStrategy::FarthestPoint { clusters, seed } => {
            if incidents.is_empty() || *clusters == 0 {
                return Err(ClusterError::NoSeeds);
            }
            let points: Vec<GeoPoint> = incidents.iter().map(Incident::location).collect();
            Ok(farthest_point(&points, *clusters, *seed))
        }
        SeedStrategy::AreaMeans => area_means(incidents),
        SeedStrategy::Explicit(centroids) => {
            if centroids.is_empty() {
                return Err(ClusterError::NoSeeds);
            }
            Ok(centroids.clone())
        }
    }
}

/// Deterministic greedy farthest-point seeding.
///
/// Duplicate coordinates are skipped while distinct points remain; once
/// they run out, the farthest (zero-distance) point is reused so the
/// requested K is always honored, at the cost of degenerate clusters.
fn farthest_point(points: &[GeoPoint], clusters: usize, seed: u64) -> Vec<GeoPoint> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(clusters);

    #[allow(clippy::cast_possible_truncation)]
    let start = (seed % n as u64) as usize;
    centroids.push(points[start]);

    let mut min_distances: Vec<f64> = points
        .iter()
        .map(|p| p.distance_squared(&points[start]))
        .collect();

    while centroids.len() < clusters {
        let farthest = min_distances
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map_or(0, |(i, _)| i);

        centroids.push(points[farthest]);

        for (distance, point) in min_distances.iter_mut().zip(points) {
            let candidate = point.distance_squared(&points[farthest]);
            if candidate < *distance {
                *distance = candidate;
            }
        }
    }

    centroids
}

/// One centroid per named-area group, at the group's mean coordinate.
///
/// Groups are keyed by `(city, neighborhood)`; rows missing either name are
/// excluded. A `BTreeMap` keeps group order (and therefore cluster ids)
/// stable across runs.
fn area_means(incidents: &[Incident]) -> Result<Vec<GeoPoint>, ClusterError> {
    let mut groups: BTreeMap<(String, String), (f64, f64, usize)> = BTreeMap::new();

    for incident in incidents {
        let (Some(city), Some(neighborhood)) = (&incident.city, &incident.neighborhood) else {
            continue;
        };
        if city.is_empty() || neighborhood.is_empty() {
            continue;
        }

        let entry = groups
            .entry((city.clone(), neighborhood.clone()))
            .or_insert((0.0, 0.0, 0));
        entry.0 += incident.latitude;
        entry.1 += incident.longitude;
        entry.2 += 1;
    }

    if groups.is_empty() {
        return Err(ClusterError::NoAreaGroups);
    }

    log::info!("Auto-seeded {} clusters from named-area groups", groups.len());

    #[allow(clippy::cast_precision_loss)]
    Ok(groups
        .into_values()
        .map(|(lat_sum, lng_sum, count)| {
            GeoPoint::new(lat_sum / count as f64, lng_sum / count as f64)
        })
        .collect())
}
