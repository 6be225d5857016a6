//! Token bucket state, refill and admission.

mod bucket;
mod clock;
mod tokens;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use tokens::Tokens;
