#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared typed records for the hotspot analysis pipeline.
//!
//! Each pipeline stage consumes the previous stage's output type and
//! produces a new one; nothing here is mutated after its producing stage
//! completes. The types replace the free-form nested mappings the data
//! originally flowed through.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A 2D coordinate in the clustering feature space.
///
/// The feature space is `(latitude, longitude)`, matching the column order
/// of the source files. Both components are finite by construction: rows
/// with non-numeric coordinates are dropped during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Squared Euclidean distance to another point in feature space.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlng = self.longitude - other.longitude;
        dlat.mul_add(dlat, dlng * dlng)
    }
}

/// One cleaned incident record.
///
/// `period` is the 1-based position of the source file the row came from.
/// The area-name fields are optional; they are only consumed by the
/// auto-seed clustering policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Occurrence date, parsed day-first.
    pub date: NaiveDate,
    /// Occurrence time, carried through verbatim.
    pub time: String,
    /// City name, when the source file carried an area column.
    pub city: Option<String>,
    /// Neighborhood name, when the source file carried an area column.
    pub neighborhood: Option<String>,
    /// 1-based index of the source period.
    pub period: u32,
}

impl Incident {
    /// The incident's position in clustering feature space.
    #[must_use]
    pub const fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// The fitted cluster partition.
///
/// `assignments[i]` is the cluster id of the `i`-th incident in the slice
/// the engine was fitted on. Cluster ids are dense in `[0, K)`; `centroids`
/// is indexed by cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clustering {
    /// Fitted centroid per cluster, indexed by cluster id.
    pub centroids: Vec<GeoPoint>,
    /// Cluster id per incident, parallel to the fitted incident slice.
    pub assignments: Vec<u32>,
}

impl Clustering {
    /// Number of clusters (K).
    #[must_use]
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Incident count per cluster, indexed by cluster id.
    ///
    /// Clusters that attracted no incidents report zero; downstream stages
    /// tolerate them.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        let mut counts = vec![0; self.k()];
        for &cluster in &self.assignments {
            counts[cluster as usize] += 1;
        }
        counts
    }
}

/// One cell of the per-cluster, per-period contingency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCount {
    /// Cluster id in `[0, K)`.
    pub cluster: u32,
    /// 1-based period index.
    pub period: u32,
    /// Number of incidents observed in that cluster and period.
    pub count: u64,
}

/// Hotspot classification per cluster.
///
/// Always holds exactly K entries, cluster-id indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotLabels {
    labels: Vec<bool>,
}

impl HotspotLabels {
    /// Wraps a cluster-id-indexed label vector.
    #[must_use]
    pub const fn new(labels: Vec<bool>) -> Self {
        Self { labels }
    }

    /// Number of labelled clusters (K).
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` when no clusters were labelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether the given cluster was classified as a hotspot.
    #[must_use]
    pub fn is_hotspot(&self, cluster: u32) -> bool {
        self.labels.get(cluster as usize).copied().unwrap_or(false)
    }

    /// Iterator over `(cluster_id, hotspot)` pairs in cluster-id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, &hot)| (u32::try_from(i).unwrap_or(u32::MAX), hot))
    }
}

/// Closed polygonal boundary per cluster.
///
/// Each ring is an ordered vertex sequence sorted by angle about the
/// cluster's own centroid, so traversing it in order yields a simple
/// (non-self-intersecting) polygon. Rings are indexed by cluster id and
/// cover every cluster when boundary computation succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundaries {
    rings: Vec<Vec<GeoPoint>>,
}

impl Boundaries {
    /// Wraps a cluster-id-indexed ring vector.
    #[must_use]
    pub const fn new(rings: Vec<Vec<GeoPoint>>) -> Self {
        Self { rings }
    }

    /// Number of boundary rings (K).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    /// `true` when no rings were computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// The boundary ring for a cluster, if one was computed.
    #[must_use]
    pub fn ring(&self, cluster: u32) -> Option<&[GeoPoint]> {
        self.rings.get(cluster as usize).map(Vec::as_slice)
    }
}
