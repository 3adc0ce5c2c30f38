//! Analysis module - preprocessing, order statistics, pattern detection

mod preprocess;
mod patterns;
mod statistics;

pub use preprocess::*;
pub use patterns::*;
pub use statistics::*;
