pub mod data;
pub mod feature;
pub mod picking;
pub mod selection;
pub mod spatial;

pub use data::*;
pub use feature::*;
