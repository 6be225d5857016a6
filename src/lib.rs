//! Tollgate - Embeddable Token Bucket Rate Limiter
//!
//! This crate implements a single-process token bucket that decides, per
//! request, whether to admit or reject it based on a replenishing budget of
//! tokens. It is meant to be embedded in a larger service as the admission
//! control primitive guarding a resource from overload.

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod simulate;

pub use error::{Result, TollgateError};
pub use ratelimit::{Clock, ManualClock, SystemClock, TokenBucket, Tokens};
