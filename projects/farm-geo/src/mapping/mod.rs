// Polygon geometry and GeoJSON mapping for farm fields and plots

pub mod color;
pub mod convert;
pub mod geometry;
pub mod viewport;
