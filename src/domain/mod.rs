pub mod opportunity;
pub mod statistics;
pub mod timeframe;

pub use opportunity::*;
pub use statistics::*;
pub use timeframe::*;
