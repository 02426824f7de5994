pub mod geojson;
pub mod loader;

pub use geojson::*;
pub use loader::*;
