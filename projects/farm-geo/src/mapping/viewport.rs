use crate::mapping::geometry::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use geo_types::{Coord, Rect};
use geojson::{FeatureCollection, Position, Value};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM: u8 = 13;
const MIN_ZOOM: i32 = 1;
const MAX_ZOOM: i32 = 20;

/// Map center and zoom level
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE,
            latitude: DEFAULT_LATITUDE,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Center the map on everything in the collection.
///
/// Every position of every geometry type contributes to the bounding box.
/// Zoom follows the larger side of the box; a box with no extent keeps the
/// default zoom.
pub fn calculate_center(collection: &FeatureCollection) -> Viewport {
    if collection.features.is_empty() {
        return Viewport::default();
    }

    let mut bounds = None;
    for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
        extend_with_geometry(&mut bounds, &geometry.value);
    }

    let Some(bounds) = bounds else {
        tracing::debug!(
            features = collection.features.len(),
            "No coordinates in collection, using default viewport"
        );
        return Viewport::default();
    };

    let center = bounds.center();
    let max_diff = bounds.width().max(bounds.height());
    let zoom = if max_diff > 0.0 {
        let level = round_half_up((360.0 / max_diff).log2()) as i32 + 1;
        level.clamp(MIN_ZOOM, MAX_ZOOM) as u8
    } else {
        DEFAULT_ZOOM
    };

    Viewport {
        longitude: center.x,
        latitude: center.y,
        zoom,
    }
}

/// Bounding box over all positions of a geometry, descending into collections
pub fn geometry_bounds(value: &Value) -> Option<Rect<f64>> {
    let mut bounds = None;
    extend_with_geometry(&mut bounds, value);
    bounds
}

fn extend_with_geometry(bounds: &mut Option<Rect<f64>>, value: &Value) {
    match value {
        Value::Point(position) => extend(bounds, position),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            extend_all(bounds, positions)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().for_each(|line| extend_all(bounds, line))
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .for_each(|ring| extend_all(bounds, ring)),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .for_each(|g| extend_with_geometry(bounds, &g.value)),
    }
}

fn extend_all(bounds: &mut Option<Rect<f64>>, positions: &[Position]) {
    positions.iter().for_each(|p| extend(bounds, p));
}

/// Positions with fewer than two numbers are not coordinates and are skipped.
fn extend(bounds: &mut Option<Rect<f64>>, position: &[f64]) {
    let [x, y, ..] = position else {
        return;
    };
    let c = Coord { x: *x, y: *y };

    *bounds = Some(match bounds.take() {
        Some(rect) => Rect::new(
            Coord {
                x: rect.min().x.min(c.x),
                y: rect.min().y.min(c.y),
            },
            Coord {
                x: rect.max().x.max(c.x),
                y: rect.max().y.max(c.y),
            },
        ),
        None => Rect::new(c, c),
    });
}

// Halves round toward +infinity, like JavaScript's Math.round
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry};

    fn feature(value: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn rect_polygon(min: [f64; 2], max: [f64; 2]) -> Value {
        Value::Polygon(vec![vec![
            vec![min[0], min[1]],
            vec![max[0], min[1]],
            vec![max[0], max[1]],
            vec![min[0], max[1]],
            vec![min[0], min[1]],
        ]])
    }

    #[test]
    fn test_empty_collection_uses_fallback() {
        let viewport = calculate_center(&collection(vec![]));
        assert_eq!(
            viewport,
            Viewport {
                longitude: -65.207,
                latitude: -26.832,
                zoom: 13
            }
        );
    }

    #[test]
    fn test_features_without_coordinates_use_fallback() {
        let no_geometry = Feature {
            geometry: None,
            ..feature(Value::Point(vec![]))
        };
        let short_position = feature(Value::Point(vec![1.0]));
        let viewport = calculate_center(&collection(vec![no_geometry, short_position]));
        assert_eq!(viewport, Viewport::default());
    }

    #[test]
    fn test_single_point_keeps_default_zoom() {
        let point = feature(Value::Point(vec![-64.5, -27.1]));
        let viewport = calculate_center(&collection(vec![point]));
        assert_eq!(viewport.longitude, -64.5);
        assert_eq!(viewport.latitude, -27.1);
        assert_eq!(viewport.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn test_zoom_from_larger_span() {
        // 1 degree wide: log2(360) = 8.49 -> 8 + 1
        let wide = feature(rect_polygon([0.0, 0.0], [1.0, 0.5]));
        let viewport = calculate_center(&collection(vec![wide]));
        assert_eq!(viewport.zoom, 9);
        assert_eq!(viewport.longitude, 0.5);
        assert_eq!(viewport.latitude, 0.25);

        // Taller than wide: span is 0.01 -> log2(36000) = 15.14 -> 15 + 1
        let tall = feature(rect_polygon([0.0, 0.0], [0.001, 0.01]));
        let viewport = calculate_center(&collection(vec![tall]));
        assert_eq!(viewport.zoom, 16);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let world = calculate_center(&collection(vec![feature(Value::LineString(vec![
            vec![-360.0, 0.0],
            vec![360.0, 0.0],
        ]))]));
        assert_eq!(world.zoom, 1);

        let tiny = calculate_center(&collection(vec![feature(Value::MultiPoint(vec![
            vec![0.0, 0.0],
            vec![1e-9, 0.0],
        ]))]));
        assert_eq!(tiny.zoom, 20);
    }

    #[test]
    fn test_walks_all_geometry_types() {
        let nested = Value::GeometryCollection(vec![
            Geometry::new(Value::Point(vec![10.0, 10.0])),
            Geometry::new(Value::MultiPolygon(vec![vec![vec![
                vec![-10.0, -4.0, 120.0],
                vec![-9.0, -4.0, 120.0],
                vec![-9.0, -3.0, 120.0],
            ]]])),
        ]);
        let fc = collection(vec![
            feature(nested),
            feature(Value::MultiLineString(vec![vec![vec![2.0, 14.0], vec![3.0, 15.0]]])),
        ]);

        let bounds = fc
            .features
            .iter()
            .filter_map(|f| geometry_bounds(&f.geometry.as_ref()?.value))
            .collect::<Vec<_>>();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[0].min(), Coord { x: -10.0, y: -4.0 });
        assert_eq!(bounds[0].max(), Coord { x: 10.0, y: 10.0 });

        let viewport = calculate_center(&fc);
        assert_eq!(viewport.longitude, 0.0);
        assert_eq!(viewport.latitude, 5.5);
        // 20 x 19 box: log2(18) = 4.17 -> 4 + 1
        assert_eq!(viewport.zoom, 5);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(2.4), 2.0);
    }
}
