use foundation::math::UnknownCoordinateOrder;
use layers::LayerError;

use crate::registry::InstanceId;

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayError {
    UnknownInstance(InstanceId),
    CoordinateOrder(UnknownCoordinateOrder),
    Layer(LayerError),
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::UnknownInstance(id) => write!(f, "no layer instance {id}"),
            OverlayError::CoordinateOrder(e) => write!(f, "{e}"),
            OverlayError::Layer(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OverlayError::UnknownInstance(_) => None,
            OverlayError::CoordinateOrder(e) => Some(e),
            OverlayError::Layer(e) => Some(e),
        }
    }
}

impl From<LayerError> for OverlayError {
    fn from(e: LayerError) -> Self {
        OverlayError::Layer(e)
    }
}

impl From<UnknownCoordinateOrder> for OverlayError {
    fn from(e: UnknownCoordinateOrder) -> Self {
        OverlayError::CoordinateOrder(e)
    }
}
