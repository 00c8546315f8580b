#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-cluster trend classification.
//!
//! Aggregates incidents into a per-cluster, per-period contingency table,
//! fits a single ordinary-least-squares model of count on (one-hot cluster
//! id, raw period index), extrapolates every cluster one period ahead, and
//! labels a cluster a hotspot when its predicted count meets or exceeds
//! the median historical count. Deterministic given the aggregated table.

use hotspot_map_models::{Clustering, HotspotLabels, Incident, PeriodCount};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that can occur during trend classification.
#[derive(Debug, Error)]
pub enum TrendError {
    /// The aggregated table has no clusters or no periods.
    #[error("Cannot fit a trend over an empty contingency table")]
    EmptyTable,

    /// The least-squares solve failed to converge.
    #[error("Least-squares solve failed: {0}")]
    Solve(String),
}

/// Dense per-cluster, per-period contingency table.
///
/// Every `(cluster, period)` cell is materialized, zero-filled when no
/// incidents were observed, so clusters and periods with no activity still
/// weigh into the fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCountTable {
    clusters: usize,
    periods: u32,
    counts: Vec<u64>,
}

impl PeriodCountTable {
    /// Builds the table by counting incidents per `(cluster, period)`.
    ///
    /// `periods` is the number of input periods for the run; it is passed
    /// explicitly so trailing periods with no surviving incidents still
    /// appear as zero-filled columns.
    #[must_use]
    pub fn aggregate(clustering: &Clustering, incidents: &[Incident], periods: u32) -> Self {
        let clusters = clustering.k();
        let mut counts = vec![0u64; clusters * periods as usize];

        for (incident, &cluster) in incidents.iter().zip(&clustering.assignments) {
            if incident.period >= 1 && incident.period <= periods {
                counts[cluster as usize * periods as usize + (incident.period as usize - 1)] += 1;
            }
        }

        Self {
            clusters,
            periods,
            counts,
        }
    }

    /// Number of clusters (K).
    #[must_use]
    pub const fn clusters(&self) -> usize {
        self.clusters
    }

    /// Number of periods (P).
    #[must_use]
    pub const fn periods(&self) -> u32 {
        self.periods
    }

    /// The count for one `(cluster, period)` cell.
    ///
    /// Periods are 1-based; `None` for a cluster or period outside the
    /// table.
    #[must_use]
    pub fn get(&self, cluster: u32, period: u32) -> Option<u64> {
        if (cluster as usize) >= self.clusters || period < 1 || period > self.periods {
            return None;
        }
        self.counts
            .get(cluster as usize * self.periods as usize + (period as usize - 1))
            .copied()
    }

    /// Iterator over all cells in `(cluster, period)` order.
    pub fn cells(&self) -> impl Iterator<Item = PeriodCount> + '_ {
        self.counts.iter().enumerate().map(|(i, &count)| {
            let periods = self.periods as usize;
            PeriodCount {
                cluster: u32::try_from(i / periods).unwrap_or(u32::MAX),
                period: u32::try_from(i % periods + 1).unwrap_or(u32::MAX),
                count,
            }
        })
    }

    /// Median count across all cells (mean of the two middle values for an
    /// even cell count).
    #[must_use]
    pub fn median(&self) -> f64 {
        let mut sorted = self.counts.clone();
        sorted.sort_unstable();
        let n = sorted.len();

        #[allow(clippy::cast_precision_loss)]
        if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        }
    }
}

/// Fitted linear trend model: one intercept weight per cluster plus a
/// shared period slope.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendModel {
    clusters: usize,
    weights: DVector<f64>,
}

impl TrendModel {
    /// Fits count on (one-hot cluster id, raw period index) by ordinary
    /// least squares over every cell of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or the SVD solve fails.
    pub fn fit(table: &PeriodCountTable) -> Result<Self, TrendError> {
        if table.clusters() == 0 || table.periods() == 0 {
            return Err(TrendError::EmptyTable);
        }

        let clusters = table.clusters();
        let rows = clusters * table.periods() as usize;
        let cols = clusters + 1;

        let mut x = DMatrix::<f64>::zeros(rows, cols);
        let mut y = DVector::<f64>::zeros(rows);

        for (row, cell) in table.cells().enumerate() {
            x[(row, cell.cluster as usize)] = 1.0;
            x[(row, clusters)] = f64::from(cell.period);
            #[allow(clippy::cast_precision_loss)]
            {
                y[row] = cell.count as f64;
            }
        }

        let svd = x.svd(true, true);
        let weights = svd
            .solve(&y, 1e-12)
            .map_err(|e| TrendError::Solve(e.to_string()))?;

        Ok(Self { clusters, weights })
    }

    /// Predicted count for a cluster at the given period.
    ///
    /// `None` for a cluster id the model was not fitted on.
    #[must_use]
    pub fn predict(&self, cluster: u32, period: u32) -> Option<f64> {
        if (cluster as usize) >= self.clusters {
            return None;
        }
        Some(self.weights[cluster as usize] + self.weights[self.clusters] * f64::from(period))
    }
}

/// Classifies every cluster as hotspot or not.
///
/// The threshold is the median count across all table cells; a cluster is
/// a hotspot iff its predicted count at period P+1 meets or exceeds it.
/// The returned mapping has exactly K entries.
///
/// # Errors
///
/// Returns an error if the table is empty or the model cannot be fitted.
pub fn classify(table: &PeriodCountTable) -> Result<HotspotLabels, TrendError> {
    let model = TrendModel::fit(table)?;
    let threshold = table.median();
    let next_period = table.periods() + 1;

    let labels: Vec<bool> = (0..table.clusters())
        .map(|cluster| {
            let cluster = u32::try_from(cluster).unwrap_or(u32::MAX);
            model
                .predict(cluster, next_period)
                .is_some_and(|prediction| prediction >= threshold)
        })
        .collect();

    log::info!(
        "Classified {} clusters against median threshold {threshold} ({} hotspots)",
        labels.len(),
        labels.iter().filter(|&&hot| hot).count()
    );

    Ok(HotspotLabels::new(labels))
}
