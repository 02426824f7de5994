//! The orchestrator: owns every layer instance, hands out the global
//! coordinate-order default and routes pointer events to the right layers.

pub mod dispatch;
pub mod error;
pub mod overlay;
pub mod registry;

pub use error::OverlayError;
pub use overlay::Overlay;
pub use registry::{InstanceId, Member, Registry};
