#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! GeoJSON result assembly.
//!
//! Pure transformation of the pipeline's analytical outputs into one
//! typed feature collection per cluster: a point feature per incident
//! plus the cluster's boundary polygon, each tagged with the cluster id
//! and hotspot flag as foreign members. This is the system's sole output
//! contract; map rendering and persistence live elsewhere.
//!
//! Coordinates are emitted as `[latitude, longitude]`, matching the
//! clustering feature space the boundaries were computed in.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use hotspot_map_models::{Boundaries, Clustering, HotspotLabels, Incident};

/// Date format used for point feature properties (source convention).
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Assembles one feature collection per cluster, in cluster-id order.
///
/// `boundaries` is `None` when the boundary stage failed its
/// insufficient-centroids precondition; collections are then emitted
/// without boundary features, keeping clusters and labels usable.
#[must_use]
pub fn assemble(
    incidents: &[Incident],
    clustering: &Clustering,
    labels: &HotspotLabels,
    boundaries: Option<&Boundaries>,
) -> Vec<FeatureCollection> {
    let k = clustering.k();
    let mut collections = Vec::with_capacity(k);

    for cluster in 0..k {
        let cluster = u32::try_from(cluster).unwrap_or(u32::MAX);
        let hotspot = labels.is_hotspot(cluster);

        let mut features: Vec<Feature> = incidents
            .iter()
            .zip(&clustering.assignments)
            .filter(|&(_, &assigned)| assigned == cluster)
            .map(|(incident, _)| point_feature(incident, cluster, hotspot))
            .collect();

        if let Some(ring) = boundaries.and_then(|b| b.ring(cluster)) {
            features.push(boundary_feature(ring, cluster, hotspot));
        }

        collections.push(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(tags(cluster, hotspot)),
        });
    }

    log::info!("Assembled {k} cluster feature collections");

    collections
}

/// Cluster-id and hotspot foreign members shared by every output object.
fn tags(cluster: u32, hotspot: bool) -> JsonObject {
    let mut members = JsonObject::new();
    members.insert("hotspot".to_string(), hotspot.into());
    members.insert("cluster".to_string(), cluster.into());
    members
}

/// One point feature per incident, carrying its date and time.
fn point_feature(incident: &Incident, cluster: u32, hotspot: bool) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
        "date".to_string(),
        incident.date.format(DATE_FORMAT).to_string().into(),
    );
    properties.insert("time".to_string(), incident.time.clone().into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            incident.latitude,
            incident.longitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: Some(tags(cluster, hotspot)),
    }
}

/// The cluster's boundary polygon as a single closed ring.
fn boundary_feature(ring: &[hotspot_map_models::GeoPoint], cluster: u32, hotspot: bool) -> Feature {
    let mut positions: Vec<Vec<f64>> = ring
        .iter()
        .map(|vertex| vec![vertex.latitude, vertex.longitude])
        .collect();

    // GeoJSON polygon rings are explicitly closed.
    if let Some(first) = positions.first().cloned() {
        positions.push(first);
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![positions]))),
        id: None,
        properties: None,
        foreign_members: Some(tags(cluster, hotspot)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use hotspot_map_models::GeoPoint;

    use super::*;

    fn incident(latitude: f64, longitude: f64, period: u32) -> Incident {
        Incident {
            latitude,
            longitude,
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            time: "22:30".to_string(),
            city: None,
            neighborhood: None,
            period,
        }
    }

    fn fixture() -> (Vec<Incident>, Clustering, HotspotLabels, Boundaries) {
        let incidents = vec![
            incident(-23.55, -46.63, 1),
            incident(-23.56, -46.64, 1),
            incident(-22.00, -45.00, 2),
        ];
        let clustering = Clustering {
            centroids: vec![GeoPoint::new(-23.555, -46.635), GeoPoint::new(-22.0, -45.0)],
            assignments: vec![0, 0, 1],
        };
        let labels = HotspotLabels::new(vec![true, false]);
        let boundaries = Boundaries::new(vec![
            vec![
                GeoPoint::new(-24.0, -47.0),
                GeoPoint::new(-24.0, -46.0),
                GeoPoint::new(-23.0, -46.0),
            ],
            vec![
                GeoPoint::new(-22.5, -45.5),
                GeoPoint::new(-22.5, -44.5),
                GeoPoint::new(-21.5, -44.5),
            ],
        ]);
        (incidents, clustering, labels, boundaries)
    }

    #[test]
    fn one_collection_per_cluster_in_id_order() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        assert_eq!(collections.len(), 2);
        for (cluster, collection) in collections.iter().enumerate() {
            let members = collection.foreign_members.as_ref().unwrap();
            assert_eq!(members["cluster"], cluster);
        }
    }

    #[test]
    fn point_features_plus_one_boundary_per_collection() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        assert_eq!(collections[0].features.len(), 3);
        assert_eq!(collections[1].features.len(), 2);

        let total_points: usize = collections.iter().map(|c| c.features.len() - 1).sum();
        assert_eq!(total_points, incidents.len());
    }

    #[test]
    fn hotspot_flag_is_carried_on_every_object() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        let hot = collections[0].foreign_members.as_ref().unwrap();
        assert_eq!(hot["hotspot"], true);
        for feature in &collections[0].features {
            assert_eq!(feature.foreign_members.as_ref().unwrap()["hotspot"], true);
        }

        let cold = collections[1].foreign_members.as_ref().unwrap();
        assert_eq!(cold["hotspot"], false);
    }

    #[test]
    fn point_features_keep_date_and_time_properties() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        let feature = &collections[0].features[0];
        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["date"], "05/03/2024");
        assert_eq!(properties["time"], "22:30");

        let Some(Geometry {
            value: Value::Point(position),
            ..
        }) = &feature.geometry
        else {
            panic!("expected a point geometry");
        };
        assert!((position[0] - -23.55).abs() < 1e-9);
    }

    #[test]
    fn boundary_rings_are_closed() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        let boundary = collections[0].features.last().unwrap();
        let Some(Geometry {
            value: Value::Polygon(rings),
            ..
        }) = &boundary.geometry
        else {
            panic!("expected a polygon geometry");
        };

        let ring = &rings[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn missing_boundaries_still_produce_collections() {
        let (incidents, clustering, labels, _) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, None);

        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].features.len(), 2);
        assert_eq!(collections[1].features.len(), 1);
    }

    #[test]
    fn output_serializes_to_plain_geojson() {
        let (incidents, clustering, labels, boundaries) = fixture();
        let collections = assemble(&incidents, &clustering, &labels, Some(&boundaries));

        let value = serde_json::to_value(&collections[0]).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["hotspot"], true);
        assert_eq!(value["cluster"], 0);
        assert_eq!(value["features"][0]["type"], "Feature");
    }
}
