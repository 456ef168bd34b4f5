//! Candle aggregation
//!
//! Decodes streamed candle rows and keeps a short rolling window of bars
//! for the decision engine.

mod store;
mod types;

pub use store::{CandleStore, DEFAULT_CAPACITY};
pub use types::{Candle, DecodeError};
