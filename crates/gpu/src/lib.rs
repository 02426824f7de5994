pub mod buffers;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod recording;
pub mod shaders;

pub use buffers::*;
pub use context::*;
pub use error::*;
pub use pipeline::*;
pub use recording::*;
