pub mod bvh;
pub mod grid;
pub mod polygon_lookup;

pub use bvh::*;
pub use grid::*;
pub use polygon_lookup::*;
