use gpu::GpuError;
use scene::DataError;

use crate::layer::LayerId;
use crate::map::MapId;
use crate::settings::ConfigError;

/// Input geometry the pipeline cannot turn into vertices.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate with a NaN or infinite component.
    InvalidPosition { feature: usize, position: [f64; 2] },
    /// Triangulation failed for a polygon part.
    UnhandledPolygon { feature: usize, reason: String },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::InvalidPosition { feature, position } => write!(
                f,
                "feature {feature} has an invalid position [{}, {}]",
                position[0], position[1]
            ),
            GeometryError::UnhandledPolygon { feature, reason } => {
                write!(f, "unhandled polygon in feature {feature}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    Config(ConfigError),
    Gpu(GpuError),
    Geometry(GeometryError),
    Data(DataError),
    /// The layer was asked to work against a map it is not attached to.
    MapMismatch { expected: MapId, found: MapId },
    Removed(LayerId),
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::Config(e) => write!(f, "{e}"),
            LayerError::Gpu(e) => write!(f, "{e}"),
            LayerError::Geometry(e) => write!(f, "{e}"),
            LayerError::Data(e) => write!(f, "{e}"),
            LayerError::MapMismatch { expected, found } => {
                write!(f, "layer is attached to {expected}, not {found}")
            }
            LayerError::Removed(id) => write!(f, "{id} has been removed"),
        }
    }
}

impl std::error::Error for LayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayerError::Config(e) => Some(e),
            LayerError::Gpu(e) => Some(e),
            LayerError::Geometry(e) => Some(e),
            LayerError::Data(e) => Some(e),
            LayerError::MapMismatch { .. } | LayerError::Removed(_) => None,
        }
    }
}

impl From<ConfigError> for LayerError {
    fn from(e: ConfigError) -> Self {
        LayerError::Config(e)
    }
}

impl From<GpuError> for LayerError {
    fn from(e: GpuError) -> Self {
        LayerError::Gpu(e)
    }
}

impl From<GeometryError> for LayerError {
    fn from(e: GeometryError) -> Self {
        LayerError::Geometry(e)
    }
}

impl From<DataError> for LayerError {
    fn from(e: DataError) -> Self {
        LayerError::Data(e)
    }
}
