use geo_types::Coord;
use geojson::{Geometry, Position, Value};
use std::f64::consts::PI;

/// Default map location (Tucumán) used when there is nothing to compute from
pub const DEFAULT_LONGITUDE: f64 = -65.207;
pub const DEFAULT_LATITUDE: f64 = -26.832;

/// WGS84 semi-major axis, used as the radius of a spherical earth
const EARTH_RADIUS_M: f64 = 6_378_137.0;
const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Convert GeoJSON positions to coords. Positions with fewer than two numbers are skipped.
pub fn to_coords<P: AsRef<[f64]>>(ring: &[P]) -> Vec<Coord<f64>> {
    ring.iter()
        .filter_map(|p| match p.as_ref() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect()
}

/// Exterior ring of a Polygon geometry. Other geometry types have none.
pub fn exterior_ring(geometry: &Geometry) -> Option<Vec<Coord<f64>>> {
    match &geometry.value {
        Value::Polygon(rings) => rings.first().map(|ring| to_coords(ring)),
        _ => None,
    }
}

/// Area-weighted centroid of a ring given as [lon, lat] coords.
///
/// Returns `[lat, lon]`, swapped relative to the input, which is the order map
/// widgets expect for a center. A closing point equal to the first one is
/// ignored. Zero-area rings fall back to the vertex mean, and an empty ring
/// yields the default map location.
pub fn ring_centroid(ring: &[Coord<f64>]) -> [f64; 2] {
    let Some((first, last)) = ring.first().zip(ring.last()) else {
        return [DEFAULT_LATITUDE, DEFAULT_LONGITUDE];
    };

    let m = if first == last { ring.len() - 1 } else { ring.len() };
    if m == 0 {
        return vertex_mean(ring);
    }
    let vertices = &ring[..m];

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in vertices.iter().enumerate() {
        let q = vertices[(i + 1) % m];
        let cross = p.x * q.y - q.x * p.y;
        twice_area += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }

    let area = twice_area / 2.0;
    if area == 0.0 {
        return vertex_mean(vertices);
    }

    [cy / (6.0 * area), cx / (6.0 * area)]
}

fn vertex_mean(points: &[Coord<f64>]) -> [f64; 2] {
    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    [sum_y / n, sum_x / n]
}

/// Geodesic area in hectares of the exterior ring (`coordinates[0]`).
///
/// Holes are ignored. Missing or short rings give 0.
pub fn polygon_area_hectares(coordinates: &[Vec<Position>]) -> f64 {
    match coordinates.first() {
        Some(exterior) => ring_area_hectares(&to_coords(exterior)),
        None => 0.0,
    }
}

/// Spherical-excess style area of a [lon, lat] ring, rounded to 4 decimals.
pub fn ring_area_hectares(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    // Wrapping the last edge makes open and closed rings sum identically
    let mut total = 0.0;
    for (i, p1) in ring.iter().enumerate() {
        let p2 = ring[(i + 1) % n];
        total += (radians(p2.x) - radians(p1.x))
            * (radians(p1.y).sin() + radians(p2.y).sin());
    }

    let square_meters = total.abs() * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0;
    round_to(square_meters / SQUARE_METERS_PER_HECTARE, 4)
}

/// Area in hectares of any geometry; only Polygons have one.
pub fn geometry_area_hectares(geometry: &Geometry) -> f64 {
    match &geometry.value {
        Value::Polygon(rings) => polygon_area_hectares(rings),
        _ => 0.0,
    }
}

fn radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
