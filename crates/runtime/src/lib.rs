pub mod budget;
pub mod debounce;
pub mod metrics;

pub use budget::*;
pub use debounce::*;
pub use metrics::*;
