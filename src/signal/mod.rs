//! Pure signal computation
//!
//! No I/O in this module; everything operates on in-memory bar slices.

mod detector;
mod estimator;

pub use detector::{detect, Detection, DEFAULT_WINDOW};
pub use estimator::estimate_sell_return;
