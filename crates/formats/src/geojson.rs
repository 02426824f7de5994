//! GeoJSON to `DataSource`.
//!
//! Coordinates are kept as raw pairs. Which index holds longitude is the
//! layer's coordinate order, not the document's.

use scene::{DataSource, Feature, Geometry, Position};
use serde_json::{Map, Value};

#[derive(Debug)]
pub enum GeoJsonError {
    Json(serde_json::Error),
    /// The root is not a FeatureCollection, Feature, geometry or array
    /// of coordinate pairs.
    UnsupportedRoot(String),
    InvalidFeature { index: usize, reason: String },
    InvalidGeometry(String),
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::UnsupportedRoot(what) => write!(f, "unsupported GeoJSON root: {what}"),
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
            GeoJsonError::InvalidGeometry(reason) => write!(f, "invalid geometry: {reason}"),
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GeoJsonError {
    fn from(e: serde_json::Error) -> Self {
        GeoJsonError::Json(e)
    }
}

pub fn data_from_geojson_str(payload: &str) -> Result<DataSource, GeoJsonError> {
    let value: Value = serde_json::from_str(payload)?;
    data_from_geojson_value(&value)
}

/// Accepts every input shape a layer takes: a FeatureCollection, a single
/// Feature, a bare geometry, or an array of `[a, b]` pairs.
pub fn data_from_geojson_value(value: &Value) -> Result<DataSource, GeoJsonError> {
    if let Some(items) = value.as_array() {
        return parse_points(value)
            .map(DataSource::Positions)
            .map_err(|reason| GeoJsonError::UnsupportedRoot(format!("array of {} items: {reason}", items.len())));
    }

    let obj = value
        .as_object()
        .ok_or_else(|| GeoJsonError::UnsupportedRoot(kind_of(value).to_string()))?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GeoJsonError::UnsupportedRoot("object without type".to_string()))?;

    match ty {
        "FeatureCollection" => {
            let items = obj
                .get("features")
                .and_then(|v| v.as_array())
                .ok_or_else(|| GeoJsonError::UnsupportedRoot("FeatureCollection without features".to_string()))?;
            let mut features = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                features.push(parse_feature(item).map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?);
            }
            Ok(DataSource::FeatureCollection(features))
        }
        "Feature" => parse_feature(value)
            .map(DataSource::Feature)
            .map_err(|reason| GeoJsonError::InvalidFeature { index: 0, reason }),
        _ => parse_geometry(value)
            .map(DataSource::Geometry)
            .map_err(GeoJsonError::InvalidGeometry),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value.as_object().ok_or("feature must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("feature missing type".to_string())?;
    if ty != "Feature" {
        return Err(format!("unexpected feature type: {ty}"));
    }

    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    let geometry = parse_geometry(obj.get("geometry").ok_or("feature missing geometry".to_string())?)?;

    let feature = Feature::with_properties(geometry, properties);
    Ok(match obj.get("id") {
        Some(Value::String(s)) => feature.with_id(s.clone()),
        Some(Value::Number(n)) => feature.with_id(n.to_string()),
        _ => feature,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value.as_object().ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            polys.iter().map(parse_rings).collect::<Result<_, _>>().map(Geometry::MultiPolygon)
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

/// Extra ordinates (altitude) are dropped.
fn parse_position(coords: &Value) -> Result<Position, String> {
    let arr = coords.as_array().ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err(format!("position needs two numbers, got {}", arr.len()));
    }
    let a = arr[0].as_f64().ok_or("position values must be numbers".to_string())?;
    let b = arr[1].as_f64().ok_or("position values must be numbers".to_string())?;
    Ok([a, b])
}

fn parse_points(coords: &Value) -> Result<Vec<Position>, String> {
    let arr = coords.as_array().ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_position).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<Position>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of position arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

/// Emits a GeoJSON geometry object. Pairs are written in stored order.
pub fn geometry_to_geojson_value(geometry: &Geometry) -> Value {
    let coordinates = match geometry {
        Geometry::Point(p) => position_value(p),
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => points_value(ps),
        Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => rings_value(rings),
        Geometry::MultiPolygon(polys) => Value::Array(polys.iter().map(|p| rings_value(p)).collect()),
    };
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(geometry.type_name().to_string()));
    obj.insert("coordinates".to_string(), coordinates);
    Value::Object(obj)
}

pub fn feature_to_geojson_value(feature: &Feature) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String("Feature".to_string()));
    if let Some(id) = &feature.id {
        obj.insert("id".to_string(), Value::String(id.clone()));
    }
    obj.insert("properties".to_string(), Value::Object(feature.properties.clone()));
    obj.insert("geometry".to_string(), geometry_to_geojson_value(&feature.geometry));
    Value::Object(obj)
}

fn position_value(p: &Position) -> Value {
    Value::Array(vec![Value::from(p[0]), Value::from(p[1])])
}

fn points_value(ps: &[Position]) -> Value {
    Value::Array(ps.iter().map(position_value).collect())
}

fn rings_value(rings: &[Vec<Position>]) -> Value {
    Value::Array(rings.iter().map(|r| points_value(r)).collect())
}
