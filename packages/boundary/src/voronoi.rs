//! Voronoi diagram as the dual of the Delaunay triangulation.
//!
//! Voronoi vertices are the circumcenters of the Delaunay triangles; the
//! ridge between two centroids is dual to the Delaunay edge connecting
//! them. A ridge dual to a hull edge has one vertex at infinity and gets
//! clipped to a synthesized far point.

use delaunator::{EMPTY, Point, Triangulation, triangulate};
use hotspot_map_models::GeoPoint;

use crate::BoundaryError;

/// The computed dual structure for one centroid set.
pub struct VoronoiDual {
    points: Vec<GeoPoint>,
    triangulation: Triangulation,
    circumcenters: Vec<GeoPoint>,
}

impl VoronoiDual {
    /// Triangulates the centroid set and derives the Voronoi vertices.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::DegenerateTessellation`] when the set
    /// admits no triangle (all centroids collinear).
    pub fn compute(centroids: &[GeoPoint]) -> Result<Self, BoundaryError> {
        let sites: Vec<Point> = centroids
            .iter()
            .map(|c| Point {
                x: c.latitude,
                y: c.longitude,
            })
            .collect();

        let triangulation = triangulate(&sites);
        if triangulation.triangles.is_empty() {
            return Err(BoundaryError::DegenerateTessellation);
        }

        let circumcenters = (0..triangulation.triangles.len() / 3)
            .map(|t| {
                circumcenter(
                    centroids[triangulation.triangles[3 * t]],
                    centroids[triangulation.triangles[3 * t + 1]],
                    centroids[triangulation.triangles[3 * t + 2]],
                )
            })
            .collect();

        Ok(Self {
            points: centroids.to_vec(),
            triangulation,
            circumcenters,
        })
    }

    /// One finite vertex set per centroid, unordered.
    ///
    /// Bounded regions carry only circumcenters. For each open ridge (dual
    /// to a hull edge between centroids `p` and `q`) a far point is
    /// synthesized: the ridge's finite circumcenter extended by `radius`
    /// along the ridge normal, signed to point away from the centroid-set
    /// mean. The far point is shared by both regions the ridge separates.
    pub fn clipped_regions(&self, radius: f64) -> Vec<Vec<GeoPoint>> {
        let mut regions: Vec<Vec<GeoPoint>> = vec![Vec::new(); self.points.len()];

        for (t, circumcenter) in self.circumcenters.iter().enumerate() {
            for corner in &self.triangulation.triangles[3 * t..3 * t + 3] {
                regions[*corner].push(*circumcenter);
            }
        }

        let center = self.mean_point();

        for edge in 0..self.triangulation.halfedges.len() {
            if self.triangulation.halfedges[edge] != EMPTY {
                continue;
            }

            let p1 = self.triangulation.triangles[edge];
            let p2 = self.triangulation.triangles[next_halfedge(edge)];
            let finite = self.circumcenters[edge / 3];

            let far = far_point(self.points[p1], self.points[p2], finite, center, radius);
            regions[p1].push(far);
            regions[p2].push(far);
        }

        let epsilon = radius.max(1.0) * 1e-12;
        for region in &mut regions {
            dedup_vertices(region, epsilon);
        }

        regions
    }

    /// Mean of the centroid set, used to orient open ridge normals.
    fn mean_point(&self) -> GeoPoint {
        let mut lat = 0.0;
        let mut lng = 0.0;
        for point in &self.points {
            lat += point.latitude;
            lng += point.longitude;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.points.len() as f64;
        GeoPoint::new(lat / n, lng / n)
    }
}

/// The halfedge following `edge` within its triangle.
const fn next_halfedge(edge: usize) -> usize {
    if edge % 3 == 2 { edge - 2 } else { edge + 1 }
}

/// Circumcenter of the triangle `(a, b, c)`.
fn circumcenter(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> GeoPoint {
    let d = 2.0
        * (a.latitude * (b.longitude - c.longitude)
            + b.latitude * (c.longitude - a.longitude)
            + c.latitude * (a.longitude - b.longitude));

    let a2 = a.latitude.mul_add(a.latitude, a.longitude * a.longitude);
    let b2 = b.latitude.mul_add(b.latitude, b.longitude * b.longitude);
    let c2 = c.latitude.mul_add(c.latitude, c.longitude * c.longitude);

    let lat = (a2 * (b.longitude - c.longitude)
        + b2 * (c.longitude - a.longitude)
        + c2 * (a.longitude - b.longitude))
        / d;
    let lng = (a2 * (c.latitude - b.latitude)
        + b2 * (a.latitude - c.latitude)
        + c2 * (b.latitude - a.latitude))
        / d;

    GeoPoint::new(lat, lng)
}

/// Synthesizes the finite replacement for an open ridge's infinite vertex.
///
/// `p1` and `p2` are the centroids sharing the ridge, `finite` is the
/// ridge's known Voronoi vertex, and `center` is the centroid-set mean.
fn far_point(p1: GeoPoint, p2: GeoPoint, finite: GeoPoint, center: GeoPoint, radius: f64) -> GeoPoint {
    let dlat = p2.latitude - p1.latitude;
    let dlng = p2.longitude - p1.longitude;
    let length = dlat.hypot(dlng);

    // Ridge normal: the tangent between the two centroids, rotated 90
    // degrees.
    let normal_lat = -dlng / length;
    let normal_lng = dlat / length;

    let mid_lat = f64::midpoint(p1.latitude, p2.latitude);
    let mid_lng = f64::midpoint(p1.longitude, p2.longitude);

    let outward = (mid_lat - center.latitude)
        .mul_add(normal_lat, (mid_lng - center.longitude) * normal_lng)
        .signum();

    GeoPoint::new(
        (outward * normal_lat).mul_add(radius, finite.latitude),
        (outward * normal_lng).mul_add(radius, finite.longitude),
    )
}

/// Removes geometric duplicates (cocircular centroid sets make distinct
/// triangles share a circumcenter).
fn dedup_vertices(vertices: &mut Vec<GeoPoint>, epsilon: f64) {
    let mut unique: Vec<GeoPoint> = Vec::with_capacity(vertices.len());
    for vertex in vertices.drain(..) {
        let duplicate = unique.iter().any(|seen| {
            (seen.latitude - vertex.latitude).abs() <= epsilon
                && (seen.longitude - vertex.longitude).abs() <= epsilon
        });
        if !duplicate {
            unique.push(vertex);
        }
    }
    *vertices = unique;
}
