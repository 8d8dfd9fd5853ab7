// Farm entity definitions
//
// Fields and plots as they arrive from the farm-management backend. The
// backend is inconsistent about optional attributes (a manager may be an id,
// an embedded object or a bare name), so most of them are optional here and
// resolved later by the converter's lookup chains.

use geojson::{Geometry, JsonObject};
use serde::{Deserialize, Serialize};

/// A sub-parcel of a field with its own polygon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plot {
    pub id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variety: String,
    /// Hectares, derived from `geometry`
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub color: String,
}

/// Display properties of a field boundary. Unknown keys are kept in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BoundaryProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Boundary {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: BoundaryProperties,
}

impl Boundary {
    /// The boundary color, treating an empty string as unset.
    pub fn color(&self) -> Option<&str> {
        self.properties.color.as_deref().filter(|c| !c.is_empty())
    }
}

/// Manager object embedded directly on a field
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Manager {
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.last_name.as_deref())
    }
}

/// Relation counters as returned by the backend's `_count` include
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RelationCounts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plots: Option<u64>,
}

/// A farm parcel: one boundary polygon and zero or more plots
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Boundary>,
    /// Legacy geometry used when no boundary is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Geometry>,
    #[serde(default)]
    pub plots: Vec<Plot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<Manager>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plots_count: Option<u64>,
    #[serde(rename = "_count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<RelationCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
}

/// Entry from the user directory, used for manager names
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.last_name.as_deref())
    }
}

fn display_name(name: &str, last_name: Option<&str>) -> String {
    match last_name {
        Some(last) => format!("{} {}", name, last).trim().to_string(),
        None => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_deserializes_backend_shape() {
        let field: Field = serde_json::from_value(json!({
            "id": "f1",
            "name": "Lote Norte",
            "managerId": "u7",
            "_count": { "plots": 4 },
            "boundary": {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                },
                "properties": { "name": "Lote Norte", "color": "#2563eb", "crop": "lemon" }
            }
        }))
        .unwrap();

        assert_eq!(field.manager_id.as_deref(), Some("u7"));
        assert_eq!(field.count.and_then(|c| c.plots), Some(4));
        assert!(field.plots.is_empty());

        let boundary = field.boundary.unwrap();
        assert_eq!(boundary.color(), Some("#2563eb"));
        assert_eq!(boundary.properties.name.as_deref(), Some("Lote Norte"));
        assert_eq!(boundary.properties.extra.get("crop"), Some(&json!("lemon")));
    }

    #[test]
    fn test_empty_color_is_unset() {
        let boundary = Boundary {
            geometry: Geometry::new(geojson::Value::Polygon(vec![])),
            properties: BoundaryProperties {
                color: Some(String::new()),
                ..Default::default()
            },
        };
        assert_eq!(boundary.color(), None);
    }

    #[test]
    fn test_display_names() {
        let user = User {
            id: "1".to_string(),
            name: "Ana".to_string(),
            last_name: Some("Paz".to_string()),
        };
        assert_eq!(user.display_name(), "Ana Paz");

        let manager = Manager {
            name: "Luis ".to_string(),
            ..Default::default()
        };
        assert_eq!(manager.display_name(), "Luis");
    }
}
