//! Order execution backends
//!
//! Live orders go straight to [`crate::api::UpwingoClient`]; this module
//! holds the simulated backend used in paper mode.

mod paper;

pub use paper::{PaperOrder, PaperTrade};
