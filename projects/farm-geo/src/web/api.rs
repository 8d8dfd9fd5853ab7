use crate::entities::{Field, Plot, User};
use crate::mapping::color::ensure_field_colors;
use crate::mapping::convert::{
    feature_collection_to_fields, feature_collection_to_plots, fields_to_feature_collection,
    plots_to_feature_collection,
};
use crate::mapping::geometry::{polygon_area_hectares, ring_centroid, to_coords};
use crate::mapping::viewport::{calculate_center, Viewport};
use axum::{
    routing::{get, post},
    Json, Router,
};
use geojson::{FeatureCollection, Position};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct CentroidRequest {
    #[serde(default)]
    pub ring: Vec<Position>,
}

#[derive(Deserialize)]
pub struct AreaRequest {
    #[serde(default)]
    pub coordinates: Vec<Vec<Position>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AreaResponse {
    pub hectares: f64,
}

#[derive(Deserialize)]
pub struct FieldsToGeoJsonRequest {
    pub fields: Vec<Field>,
    #[serde(default)]
    pub users: Option<Vec<User>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotsFromGeoJsonRequest {
    pub feature_collection: FeatureCollection,
    #[serde(default)]
    pub existing: Vec<Plot>,
}

#[derive(Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/geometry/centroid", post(centroid_handler))
        .route("/api/geometry/area", post(area_handler))
        .route("/api/fields/to-geojson", post(fields_to_geojson_handler))
        .route("/api/fields/from-geojson", post(fields_from_geojson_handler))
        .route("/api/fields/colors", post(field_colors_handler))
        .route("/api/plots/to-geojson", post(plots_to_geojson_handler))
        .route("/api/plots/from-geojson", post(plots_from_geojson_handler))
        .route("/api/viewport", post(viewport_handler))
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler() -> Json<HealthInfo> {
    Json(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Returns `[lat, lon]`
pub async fn centroid_handler(Json(payload): Json<CentroidRequest>) -> Json<[f64; 2]> {
    Json(ring_centroid(&to_coords(&payload.ring)))
}

pub async fn area_handler(Json(payload): Json<AreaRequest>) -> Json<AreaResponse> {
    Json(AreaResponse {
        hectares: polygon_area_hectares(&payload.coordinates),
    })
}

pub async fn fields_to_geojson_handler(
    Json(payload): Json<FieldsToGeoJsonRequest>,
) -> Json<FeatureCollection> {
    Json(fields_to_feature_collection(
        &payload.fields,
        payload.users.as_deref(),
    ))
}

pub async fn fields_from_geojson_handler(
    Json(collection): Json<FeatureCollection>,
) -> Json<Vec<Field>> {
    Json(feature_collection_to_fields(&collection))
}

pub async fn field_colors_handler(Json(fields): Json<Vec<Field>>) -> Json<Vec<Field>> {
    Json(
        ensure_field_colors(&fields)
            .into_iter()
            .map(Cow::into_owned)
            .collect(),
    )
}

pub async fn plots_to_geojson_handler(Json(plots): Json<Vec<Plot>>) -> Json<FeatureCollection> {
    Json(plots_to_feature_collection(&plots))
}

pub async fn plots_from_geojson_handler(
    Json(payload): Json<PlotsFromGeoJsonRequest>,
) -> Json<Vec<Plot>> {
    Json(feature_collection_to_plots(
        &payload.feature_collection,
        &payload.existing,
    ))
}

pub async fn viewport_handler(Json(collection): Json<FeatureCollection>) -> Json<Viewport> {
    Json(calculate_center(&collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square_collection() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "f1",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-65.20, -26.83], [-65.19, -26.83], [-65.19, -26.82], [-65.20, -26.82], [-65.20, -26.83]]]
                },
                "properties": { "type": "field-boundary", "fieldId": "f1", "name": "Norte" }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_router_builds() {
        let _ = router();
    }

    #[tokio::test]
    async fn test_health() {
        let Json(info) = health_handler().await;
        assert_eq!(info.status, "ok");
    }

    #[tokio::test]
    async fn test_centroid_and_area_handlers() {
        let request: CentroidRequest = serde_json::from_value(json!({
            "ring": [[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]
        }))
        .unwrap();
        let Json(center) = centroid_handler(Json(request)).await;
        assert_eq!(center, [0.5, 0.5]);

        let request: AreaRequest = serde_json::from_value(json!({})).unwrap();
        let Json(area) = area_handler(Json(request)).await;
        assert_eq!(area, AreaResponse { hectares: 0.0 });
    }

    #[tokio::test]
    async fn test_fields_round_trip_through_handlers() {
        let Json(fields) = fields_from_geojson_handler(Json(square_collection())).await;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Norte");

        let request: FieldsToGeoJsonRequest = serde_json::from_value(json!({
            "fields": serde_json::to_value(&fields).unwrap(),
            "users": [{ "id": "u1", "name": "Ana" }]
        }))
        .unwrap();
        let Json(collection) = fields_to_geojson_handler(Json(request)).await;
        assert_eq!(collection.features.len(), 1);
        assert_eq!(
            collection.features[0].property("managerName"),
            Some(&json!("Sin asignar"))
        );
    }

    #[tokio::test]
    async fn test_field_colors_handler_fills_missing() {
        let Json(fields) = fields_from_geojson_handler(Json(square_collection())).await;
        let Json(colored) = field_colors_handler(Json(fields)).await;
        assert!(colored[0].boundary.as_ref().unwrap().color().is_some());
    }

    #[tokio::test]
    async fn test_plots_handlers() {
        let request: PlotsFromGeoJsonRequest = serde_json::from_value(json!({
            "featureCollection": serde_json::to_value(square_collection()).unwrap()
        }))
        .unwrap();
        let Json(plots) = plots_from_geojson_handler(Json(request)).await;
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].id, "f1");
        assert!(plots[0].area > 100.0);

        let Json(collection) = plots_to_geojson_handler(Json(plots)).await;
        assert_eq!(collection.features[0].property("type"), Some(&json!("plot")));
    }

    #[tokio::test]
    async fn test_viewport_handler() {
        let Json(viewport) = viewport_handler(Json(square_collection())).await;
        assert!((viewport.longitude - -65.195).abs() < 1e-9);
        assert!((viewport.latitude - -26.825).abs() < 1e-9);
        assert_eq!(viewport.zoom, 16);
    }
}
