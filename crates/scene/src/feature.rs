use serde_json::{Map, Value};

/// A raw coordinate pair. Which index is longitude depends on the layer's
/// `CoordinateOrder`.
pub type Position = [f64; 2];

/// Identity of a feature within one `FeatureSet`.
///
/// Two features with equal geometry and properties are still different
/// features if their keys differ. Keys are assigned by the owning set and
/// are never reused by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FeatureKey(pub u32);

impl FeatureKey {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// The single position of a `Point`.
    pub fn point(&self) -> Option<Position> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Independent line parts. Polygons and points have none.
    pub fn line_parts(&self) -> Vec<&[Position]> {
        match self {
            Geometry::LineString(line) => vec![line.as_slice()],
            Geometry::MultiLineString(lines) => lines.iter().map(|l| l.as_slice()).collect(),
            _ => Vec::new(),
        }
    }

    /// Independent polygon parts, each an outer ring followed by its holes.
    pub fn polygon_parts(&self) -> Vec<&[Vec<Position>]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polys) => polys.iter().map(|p| p.as_slice()).collect(),
            _ => Vec::new(),
        }
    }

    /// Visits every position in document order.
    pub fn for_each_position<F: FnMut(Position)>(&self, mut f: F) {
        match self {
            Geometry::Point(p) => f(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().for_each(|p| f(*p)),
            Geometry::MultiLineString(parts) | Geometry::Polygon(parts) => {
                parts.iter().flatten().for_each(|p| f(*p))
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(|p| f(*p)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub(crate) key: FeatureKey,
    pub id: Option<String>,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            key: FeatureKey::default(),
            id: None,
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_properties(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            properties,
            ..Self::new(geometry)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identity assigned by the owning `FeatureSet`.
    pub fn key(&self) -> FeatureKey {
        self.key
    }
}
