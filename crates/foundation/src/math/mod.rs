pub mod geo;
pub mod matrix;
pub mod precision;
pub mod projection;
pub mod vec;

pub use geo::*;
pub use matrix::*;
pub use precision::*;
pub use projection::*;
pub use vec::*;
