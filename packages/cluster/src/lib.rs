#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial K-means cluster engine.
//!
//! Partitions incident coordinates into K clusters with Lloyd's iteration
//! over the full incident batch. Initial centroids come from a pluggable
//! seeding strategy: deterministic farthest-point seeding for an explicit
//! K, or named-area group means when the caller has no a-priori K
//! (`clusters == 0` in the configuration).

pub mod seed;

use hotspot_map_models::{Clustering, GeoPoint, Incident};
use thiserror::Error;

pub use seed::SeedStrategy;

/// Errors that can occur while fitting the cluster partition.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No incidents were provided; there is nothing to partition.
    #[error("Cannot cluster an empty incident set")]
    EmptyDataset,

    /// Auto-seeding was requested but the data carried no usable area names.
    #[error("Auto-seeding requires area-name columns with at least one named group")]
    NoAreaGroups,

    /// An explicit seeding strategy produced no centroids.
    #[error("Seeding produced no initial centroids")]
    NoSeeds,
}

/// Cluster engine configuration.
///
/// `clusters == 0` selects the auto-seed policy: K and the initial
/// centroids are derived from the mean coordinate of each named-area group
/// present in the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Target cluster count; 0 selects auto-seeding.
    pub clusters: usize,
    /// Upper bound on Lloyd iterations.
    pub max_iterations: usize,
    /// Iteration stops once the largest centroid movement falls below this.
    pub convergence_threshold: f64,
    /// Seed controlling farthest-point initialization, for reproducibility.
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            clusters: 0,
            max_iterations: 300,
            convergence_threshold: 1e-9,
            seed: 0,
        }
    }
}

impl ClusterConfig {
    /// Configuration for an explicit cluster count with default iteration
    /// limits.
    #[must_use]
    pub fn with_clusters(clusters: usize) -> Self {
        Self {
            clusters,
            ..Self::default()
        }
    }

    /// The seeding strategy this configuration selects.
    #[must_use]
    pub const fn strategy(&self) -> SeedStrategy {
        if self.clusters == 0 {
            SeedStrategy::AreaMeans
        } else {
            SeedStrategy::FarthestPoint {
                clusters: self.clusters,
                seed: self.seed,
            }
        }
    }
}

/// Fits the cluster partition over the full incident set.
///
/// Every incident receives a cluster id in `[0, K)`; the fitted centroid
/// per cluster is returned alongside. When K exceeds the number of
/// distinct coordinate points, surplus clusters keep their seed position
/// and end up empty; that is a documented limitation, not corrected here.
///
/// # Errors
///
/// Returns an error if the incident set is empty or the selected seeding
/// strategy cannot produce initial centroids.
pub fn fit(incidents: &[Incident], config: &ClusterConfig) -> Result<Clustering, ClusterError> {
    if incidents.is_empty() {
        return Err(ClusterError::EmptyDataset);
    }

    let points: Vec<GeoPoint> = incidents.iter().map(Incident::location).collect();
    let centroids = seed::initial_centroids(&config.strategy(), incidents)?;

    log::info!(
        "Fitting K-means: k={}, n={}, max_iterations={}",
        centroids.len(),
        points.len(),
        config.max_iterations
    );

    Ok(lloyd(
        &points,
        centroids,
        config.max_iterations,
        config.convergence_threshold,
    ))
}

/// Runs Lloyd's iteration to convergence from the given seed centroids.
fn lloyd(
    points: &[GeoPoint],
    mut centroids: Vec<GeoPoint>,
    max_iterations: usize,
    convergence_threshold: f64,
) -> Clustering {
    let k = centroids.len();
    let mut assignments = vec![0u32; points.len()];

    for iteration in 0..max_iterations {
        for (i, point) in points.iter().enumerate() {
            assignments[i] = nearest_centroid(point, &centroids);
        }

        let updated = recompute_centroids(points, &assignments, &centroids);

        let movement = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| old.distance_squared(new).sqrt())
            .fold(0.0f64, f64::max);

        centroids = updated;

        if movement < convergence_threshold {
            log::debug!("K-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    // Final assignment against the settled centroids.
    for (i, point) in points.iter().enumerate() {
        assignments[i] = nearest_centroid(point, &centroids);
    }

    debug_assert_eq!(centroids.len(), k);

    Clustering {
        centroids,
        assignments,
    }
}

/// Index of the closest centroid; ties break toward the lower cluster id.
fn nearest_centroid(point: &GeoPoint, centroids: &[GeoPoint]) -> u32 {
    let mut best = 0usize;
    let mut best_distance = f64::MAX;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = point.distance_squared(centroid);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }

    u32::try_from(best).unwrap_or(u32::MAX)
}

/// Mean of assigned points per cluster; empty clusters keep their previous
/// centroid.
fn recompute_centroids(
    points: &[GeoPoint],
    assignments: &[u32],
    previous: &[GeoPoint],
) -> Vec<GeoPoint> {
    let k = previous.len();
    let mut lat_sums = vec![0.0f64; k];
    let mut lng_sums = vec![0.0f64; k];
    let mut counts = vec![0usize; k];

    for (point, &cluster) in points.iter().zip(assignments) {
        let cluster = cluster as usize;
        lat_sums[cluster] += point.latitude;
        lng_sums[cluster] += point.longitude;
        counts[cluster] += 1;
    }

    (0..k)
        .map(|cluster| {
            if counts[cluster] == 0 {
                previous[cluster]
            } else {
                #[allow(clippy::cast_precision_loss)]
                let count = counts[cluster] as f64;
                GeoPoint::new(lat_sums[cluster] / count, lng_sums[cluster] / count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use hotspot_map_models::Incident;

    use super::*;

    fn incident(latitude: f64, longitude: f64) -> Incident {
        Incident {
            latitude,
            longitude,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time: "12:00".to_string(),
            city: None,
            neighborhood: None,
            period: 1,
        }
    }

    fn named_incident(latitude: f64, longitude: f64, city: &str, neighborhood: &str) -> Incident {
        Incident {
            city: Some(city.to_string()),
            neighborhood: Some(neighborhood.to_string()),
            ..incident(latitude, longitude)
        }
    }

    /// Two tight groups far apart, easy to separate.
    fn two_groups() -> Vec<Incident> {
        vec![
            incident(-23.50, -46.60),
            incident(-23.51, -46.61),
            incident(-23.52, -46.62),
            incident(-22.00, -45.00),
            incident(-22.01, -45.01),
            incident(-22.02, -45.02),
        ]
    }

    #[test]
    fn empty_incident_set_fails() {
        let result = fit(&[], &ClusterConfig::with_clusters(2));
        assert!(matches!(result, Err(ClusterError::EmptyDataset)));
    }

    #[test]
    fn every_incident_gets_exactly_one_cluster_id() {
        let incidents = two_groups();
        let clustering = fit(&incidents, &ClusterConfig::with_clusters(2)).unwrap();

        assert_eq!(clustering.assignments.len(), incidents.len());
        assert!(clustering.assignments.iter().all(|&c| (c as usize) < 2));
        assert_eq!(clustering.counts().iter().sum::<u64>(), 6);
    }

    #[test]
    fn separates_well_separated_groups() {
        let incidents = two_groups();
        let clustering = fit(&incidents, &ClusterConfig::with_clusters(2)).unwrap();

        let first = clustering.assignments[0];
        assert!(clustering.assignments[..3].iter().all(|&c| c == first));
        assert!(clustering.assignments[3..].iter().all(|&c| c != first));
    }

    #[test]
    fn k_one_puts_all_incidents_in_one_cluster() {
        let incidents = two_groups();
        let clustering = fit(&incidents, &ClusterConfig::with_clusters(1)).unwrap();

        assert_eq!(clustering.k(), 1);
        assert!(clustering.assignments.iter().all(|&c| c == 0));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let incidents = two_groups();
        let config = ClusterConfig::with_clusters(3);

        let a = fit(&incidents, &config).unwrap();
        let b = fit(&incidents, &config).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn k_beyond_distinct_points_yields_empty_clusters() {
        let incidents = vec![
            incident(-23.50, -46.60),
            incident(-23.50, -46.60),
            incident(-22.00, -45.00),
        ];
        let clustering = fit(&incidents, &ClusterConfig::with_clusters(3)).unwrap();

        assert_eq!(clustering.k(), 3);
        let counts = clustering.counts();
        assert_eq!(counts.iter().sum::<u64>(), 3);
        assert!(counts.contains(&0));
    }

    #[test]
    fn auto_seed_derives_k_from_area_groups() {
        let incidents = vec![
            named_incident(-23.50, -46.60, "Sao Paulo", "Centro"),
            named_incident(-23.51, -46.61, "Sao Paulo", "Centro"),
            named_incident(-22.00, -45.00, "Sao Paulo", "Lapa"),
            named_incident(-22.01, -45.01, "Sao Paulo", "Lapa"),
        ];
        let clustering = fit(&incidents, &ClusterConfig::default()).unwrap();

        assert_eq!(clustering.k(), 2);
        assert_eq!(clustering.counts().iter().sum::<u64>(), 4);
    }

    #[test]
    fn auto_seed_without_area_columns_fails() {
        let incidents = two_groups();
        let result = fit(&incidents, &ClusterConfig::default());
        assert!(matches!(result, Err(ClusterError::NoAreaGroups)));
    }

    #[test]
    fn centroids_land_on_group_means() {
        let incidents = vec![
            incident(0.0, 0.0),
            incident(0.0, 2.0),
            incident(10.0, 10.0),
            incident(10.0, 12.0),
        ];
        let clustering = fit(&incidents, &ClusterConfig::with_clusters(2)).unwrap();

        let mut centroids = clustering.centroids.clone();
        centroids.sort_by(|a, b| a.latitude.total_cmp(&b.latitude));

        assert!((centroids[0].latitude - 0.0).abs() < 1e-9);
        assert!((centroids[0].longitude - 1.0).abs() < 1e-9);
        assert!((centroids[1].latitude - 10.0).abs() < 1e-9);
        assert!((centroids[1].longitude - 11.0).abs() < 1e-9);
    }
}
