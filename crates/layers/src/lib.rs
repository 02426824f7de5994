pub mod driver;
pub mod error;
pub mod flatten;
pub mod layer;
pub mod lines;
pub mod map;
pub mod pack;
pub mod points;
pub mod settings;
pub mod shapes;
pub mod surface;
pub mod symbology;
pub mod triangulate;

pub use driver::{Interaction, LayerCore, LayerState, Transition};
pub use error::*;
pub use layer::*;
pub use lines::Lines;
pub use map::*;
pub use points::Points;
pub use settings::*;
pub use shapes::Shapes;
pub use surface::{DrawEvent, DrawingSurface, SurfaceEvent, SurfaceTransform};
pub use symbology::*;
