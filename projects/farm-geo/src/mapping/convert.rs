// Field/Plot <-> GeoJSON conversion
//
// Conversion never fails. Anything that cannot be mapped is dropped with a
// debug log and every missing attribute has a fixed default, so a partially
// broken payload still renders on the map.

use crate::entities::{Boundary, BoundaryProperties, Field, Manager, Plot, User};
use crate::mapping::color::{DEFAULT_FIELD_COLOR, DEFAULT_PLOT_COLOR};
use crate::mapping::geometry::geometry_area_hectares;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use std::collections::HashMap;

pub const UNASSIGNED: &str = "Sin asignar";
pub const NEW_FIELD_NAME: &str = "Nuevo Campo";
pub const UNNAMED_PLOT: &str = "Parcela sin nombre";

pub const FIELD_BOUNDARY_TYPE: &str = "field-boundary";
pub const PLOT_TYPE: &str = "plot";

/// Properties added to boundary features for display only
const DISPLAY_KEYS: [&str; 5] = ["type", "fieldId", "area", "managerName", "plotCount"];

type ManagerSource = fn(&Field, &[User]) -> Option<String>;
type PlotCountSource = fn(&Field) -> Option<u64>;

/// Manager name sources, highest priority first
const MANAGER_SOURCES: [ManagerSource; 4] = [
    manager_from_directory,
    manager_from_embedded,
    manager_from_field,
    manager_from_properties,
];

/// Plot count sources, highest priority first
const PLOT_COUNT_SOURCES: [PlotCountSource; 4] = [
    plot_count_from_plots,
    plot_count_from_field,
    plot_count_from_relation,
    plot_count_from_properties,
];

fn manager_from_directory(field: &Field, users: &[User]) -> Option<String> {
    let manager_id = field.manager_id.as_deref()?;
    users
        .iter()
        .find(|u| u.id == manager_id)
        .map(User::display_name)
}

fn manager_from_embedded(field: &Field, _users: &[User]) -> Option<String> {
    field.manager.as_ref().map(Manager::display_name)
}

fn manager_from_field(field: &Field, _users: &[User]) -> Option<String> {
    field.manager_name.clone()
}

fn manager_from_properties(field: &Field, _users: &[User]) -> Option<String> {
    field
        .properties
        .as_ref()?
        .get("managerName")?
        .as_str()
        .map(str::to_string)
}

fn plot_count_from_plots(field: &Field) -> Option<u64> {
    Some(field.plots.len() as u64)
}

fn plot_count_from_field(field: &Field) -> Option<u64> {
    field.plots_count
}

fn plot_count_from_relation(field: &Field) -> Option<u64> {
    field.count.as_ref()?.plots
}

fn plot_count_from_properties(field: &Field) -> Option<u64> {
    field.properties.as_ref()?.get("plotCount")?.as_u64()
}

/// Display name of the field's manager, or "Sin asignar".
pub fn resolve_manager_name(field: &Field, users: &[User]) -> String {
    MANAGER_SOURCES
        .iter()
        .find_map(|source| source(field, users).filter(|name| !name.trim().is_empty()))
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

/// Number of plots in the field. Zero counts fall through to the next source.
pub fn resolve_plot_count(field: &Field) -> u64 {
    PLOT_COUNT_SOURCES
        .iter()
        .find_map(|source| source(field).filter(|count| *count > 0))
        .unwrap_or(0)
}

/// How an incoming feature is treated when rebuilding fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// Freshly drawn shape that has not been saved yet
    NewDrawing,
    FieldBoundary { field_id: String },
    Plot { field_id: String },
    /// No field id, or a type this converter does not know
    Unknown,
}

/// Classify a feature once, before any grouping happens.
pub fn classify_feature(feature: &Feature) -> FeatureKind {
    let feature_type = feature.property("type").filter(|v| is_truthy(v));
    let field_id = feature.property("fieldId").and_then(json_key);
    let flagged_new = feature.property("isNewPolygon").is_some_and(is_truthy);

    if flagged_new || (feature_type.is_none() && field_id.is_none()) {
        return FeatureKind::NewDrawing;
    }

    let Some(field_id) = field_id else {
        return FeatureKind::Unknown;
    };

    match feature_type.and_then(JsonValue::as_str) {
        Some(FIELD_BOUNDARY_TYPE) => FeatureKind::FieldBoundary { field_id },
        Some(PLOT_TYPE) => FeatureKind::Plot { field_id },
        _ => FeatureKind::Unknown,
    }
}

/// One boundary feature per field. Plots are not drawn.
pub fn fields_to_feature_collection(fields: &[Field], users: Option<&[User]>) -> FeatureCollection {
    let users = users.unwrap_or(&[]);
    let features: Vec<Feature> = fields
        .iter()
        .filter_map(|field| field_to_feature(field, users))
        .collect();

    tracing::debug!(
        fields = fields.len(),
        features = features.len(),
        "Converted fields to feature collection"
    );
    feature_collection(features)
}

fn field_to_feature(field: &Field, users: &[User]) -> Option<Feature> {
    let (geometry, mut properties) = match (&field.boundary, &field.location) {
        (Some(boundary), _) => (
            boundary.geometry.clone(),
            boundary_properties_to_json(&boundary.properties),
        ),
        (None, Some(location)) => (location.clone(), JsonObject::new()),
        (None, None) => {
            tracing::debug!(field_id = %field.id, "Skipping field without boundary or location");
            return None;
        }
    };

    let area = field
        .area
        .unwrap_or_else(|| geometry_area_hectares(&geometry));

    properties.insert("type".to_string(), FIELD_BOUNDARY_TYPE.into());
    properties.insert("fieldId".to_string(), field.id.clone().into());
    properties.insert("area".to_string(), area.into());
    properties.insert(
        "managerName".to_string(),
        resolve_manager_name(field, users).into(),
    );
    properties.insert("plotCount".to_string(), resolve_plot_count(field).into());

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(field.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Rebuild fields (and their plots) from a flat feature list.
///
/// Features are grouped by `fieldId`. A field only survives if its boundary
/// feature was seen. Features that cannot be placed are dropped.
pub fn feature_collection_to_fields(collection: &FeatureCollection) -> Vec<Field> {
    let stamp = chrono::Utc::now().timestamp_millis();
    let mut fields: Vec<Field> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (position, feature) in collection.features.iter().enumerate() {
        match classify_feature(feature) {
            FeatureKind::NewDrawing => {
                let Some(geometry) = feature.geometry.clone() else {
                    tracing::debug!(position, "Dropping new drawing without geometry");
                    continue;
                };
                let id = feature
                    .id
                    .as_ref()
                    .map(id_to_string)
                    .unwrap_or_else(|| temporary_id(stamp, position));

                let mut extra = JsonObject::new();
                extra.insert("isNewPolygon".to_string(), true.into());

                let field = field_group(&mut fields, &mut index, &id);
                field.name = NEW_FIELD_NAME.to_string();
                field.boundary = Some(Boundary {
                    geometry,
                    properties: BoundaryProperties {
                        name: Some(NEW_FIELD_NAME.to_string()),
                        color: Some(DEFAULT_FIELD_COLOR.to_string()),
                        extra,
                    },
                });
            }
            FeatureKind::FieldBoundary { field_id } => {
                let Some(geometry) = feature.geometry.clone() else {
                    tracing::debug!(%field_id, "Ignoring boundary feature without geometry");
                    continue;
                };
                let properties = json_to_boundary_properties(feature.properties.clone());

                let field = field_group(&mut fields, &mut index, &field_id);
                if let Some(name) = &properties.name {
                    field.name = name.clone();
                }
                field.boundary = Some(Boundary {
                    geometry,
                    properties,
                });
            }
            FeatureKind::Plot { field_id } => {
                let plot_id = feature_key(feature, "plotId")
                    .unwrap_or_else(|| temporary_id(stamp, position));

                let field = field_group(&mut fields, &mut index, &field_id);
                let existing = field.plots.iter().position(|p| p.id == plot_id);
                let previous = existing.map(|i| &field.plots[i]);

                match (plot_from_feature(feature, plot_id, previous), existing) {
                    (Some(plot), Some(i)) => field.plots[i] = plot,
                    (Some(plot), None) => field.plots.push(plot),
                    (None, _) => {
                        tracing::debug!(%field_id, position, "Dropping plot without geometry")
                    }
                }
            }
            FeatureKind::Unknown => {
                tracing::debug!(position, id = ?feature.id, "Ignoring unclassified feature");
            }
        }
    }

    let total = fields.len();
    let fields: Vec<Field> = fields
        .into_iter()
        .filter(|f| f.boundary.is_some())
        .collect();

    tracing::debug!(
        features = collection.features.len(),
        fields = fields.len(),
        without_boundary = total - fields.len(),
        "Rebuilt fields from feature collection"
    );
    fields
}

/// One feature per plot, with `area` recomputed from geometry.
pub fn plots_to_feature_collection(plots: &[Plot]) -> FeatureCollection {
    let features = plots
        .iter()
        .map(|plot| {
            let mut properties = JsonObject::new();
            properties.insert("type".to_string(), PLOT_TYPE.into());
            properties.insert("plotId".to_string(), plot.id.clone().into());
            properties.insert("name".to_string(), plot.name.clone().into());
            properties.insert("variety".to_string(), plot.variety.clone().into());
            properties.insert(
                "area".to_string(),
                geometry_area_hectares(&plot.geometry).into(),
            );
            properties.insert("color".to_string(), plot.color.clone().into());

            Feature {
                bbox: None,
                geometry: Some(plot.geometry.clone()),
                id: Some(Id::String(plot.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    feature_collection(features)
}

/// Rebuild plots from features, using `existing` plots for missing attributes.
///
/// `area` is always recomputed; a client-supplied value is ignored.
pub fn feature_collection_to_plots(collection: &FeatureCollection, existing: &[Plot]) -> Vec<Plot> {
    let stamp = chrono::Utc::now().timestamp_millis();

    collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(position, feature)| {
            let id = feature_key(feature, "plotId")
                .unwrap_or_else(|| temporary_id(stamp, position));
            let previous = existing.iter().find(|p| p.id == id);
            let plot = plot_from_feature(feature, id, previous);
            if plot.is_none() {
                tracing::debug!(position, "Dropping plot feature without geometry");
            }
            plot
        })
        .collect()
}

fn plot_from_feature(feature: &Feature, id: String, previous: Option<&Plot>) -> Option<Plot> {
    let geometry: Geometry = feature
        .geometry
        .clone()
        .or_else(|| previous.map(|p| p.geometry.clone()))?;

    let text = |key: &str, prior: Option<&String>, fallback: &str| {
        feature
            .property(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .or(prior.map(String::as_str).filter(|s| !s.is_empty()))
            .unwrap_or(fallback)
            .to_string()
    };

    Some(Plot {
        name: text("name", previous.map(|p| &p.name), UNNAMED_PLOT),
        variety: text("variety", previous.map(|p| &p.variety), UNASSIGNED),
        color: text("color", previous.map(|p| &p.color), DEFAULT_PLOT_COLOR),
        area: geometry_area_hectares(&geometry),
        id,
        geometry,
    })
}

fn field_group<'a>(
    fields: &'a mut Vec<Field>,
    index: &mut HashMap<String, usize>,
    field_id: &str,
) -> &'a mut Field {
    let i = *index.entry(field_id.to_string()).or_insert_with(|| {
        fields.push(Field {
            id: field_id.to_string(),
            ..Default::default()
        });
        fields.len() - 1
    });
    &mut fields[i]
}

fn boundary_properties_to_json(properties: &BoundaryProperties) -> JsonObject {
    let mut json = properties.extra.clone();
    if let Some(name) = &properties.name {
        json.insert("name".to_string(), name.clone().into());
    }
    if let Some(color) = &properties.color {
        json.insert("color".to_string(), color.clone().into());
    }
    json
}

fn json_to_boundary_properties(properties: Option<JsonObject>) -> BoundaryProperties {
    let mut extra = properties.unwrap_or_default();
    for key in DISPLAY_KEYS {
        extra.remove(key);
    }
    let name = take_string(&mut extra, "name");
    let color = take_string(&mut extra, "color");

    BoundaryProperties { name, color, extra }
}

fn take_string(object: &mut JsonObject, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(JsonValue::String(s)) => Some(s),
        _ => None,
    }
}

/// Feature id, falling back to a property holding the same key.
fn feature_key(feature: &Feature, property: &str) -> Option<String> {
    feature
        .id
        .as_ref()
        .map(id_to_string)
        .or_else(|| feature.property(property).and_then(json_key))
}

fn id_to_string(id: &Id) -> String {
    match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    }
}

/// Join keys may arrive as strings or numbers
fn json_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn temporary_id(stamp: i64, position: usize) -> String {
    format!("temp-{}-{}", stamp, position)
}

fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
