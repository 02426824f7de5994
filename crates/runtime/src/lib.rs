pub mod debounce;
pub mod frame;
pub mod metrics;
pub mod scheduler;

pub use debounce::*;
pub use frame::*;
pub use metrics::*;
pub use scheduler::*;
