//! Token bucket implementation.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use super::clock::{Clock, SystemClock};
use super::tokens::Tokens;
use crate::error::{Result, TollgateError};

/// Fill rate resolution: the rate is stored in 10^-18 tokens per second.
const RATE_SCALE: f64 = 1e18;

/// Divisor turning `nanoseconds * scaled rate` into nano-tokens.
const REFILL_DIVISOR: u128 = 1_000_000_000_000_000_000;

/// A token bucket that admits or rejects requests against a replenishing
/// budget.
///
/// The bucket starts full. Every call to [`allow`](Self::allow) first tops the
/// bucket up for the time elapsed since the previous call, then deducts the
/// request's cost if enough tokens are available. Both steps happen under a
/// single lock, so concurrent callers can never overdraw the bucket.
///
/// This struct is thread-safe and can be shared across threads behind a
/// reference or an `Arc`.
#[derive(Debug)]
pub struct TokenBucket<C: Clock = SystemClock> {
    /// Maximum tokens the bucket can hold
    capacity: u64,
    /// `capacity` in fixed-point form
    max_tokens: Tokens,
    /// Configured fill rate in tokens per second
    fill_rate: f64,
    /// Fill rate in units of 10^-18 tokens per second
    rate_scaled: u128,
    /// Mutable state, guarded as one unit
    state: Mutex<BucketState>,
    /// Time source
    clock: C,
}

#[derive(Debug)]
struct BucketState {
    /// Tokens currently available
    tokens: Tokens,
    /// Clock reading at the most recent refill
    last_refill: Instant,
    /// Refill remainder below one nano-token, in units of `REFILL_DIVISOR`
    carry: u128,
}

impl TokenBucket<SystemClock> {
    /// Create a full bucket that reads the system monotonic clock.
    ///
    /// `capacity` is the maximum number of tokens and `fill_rate` the number
    /// of tokens added per second.
    pub fn new(capacity: u64, fill_rate: f64) -> Result<Self> {
        Self::with_clock(capacity, fill_rate, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a full bucket that reads the given clock.
    ///
    /// The fill rate is kept at a resolution of 10^-18 tokens per second. A
    /// positive rate below that resolution is rejected rather than silently
    /// treated as zero.
    pub fn with_clock(capacity: u64, fill_rate: f64, clock: C) -> Result<Self> {
        if capacity == 0 {
            return Err(TollgateError::InvalidConfiguration(
                "capacity must be greater than zero".to_string(),
            ));
        }

        let max_tokens = Tokens::from_whole(capacity).ok_or_else(|| {
            TollgateError::InvalidConfiguration(format!(
                "capacity {} exceeds maximum of {}",
                capacity,
                Tokens::MAX_WHOLE
            ))
        })?;

        if !fill_rate.is_finite() || fill_rate < 0.0 {
            return Err(TollgateError::InvalidConfiguration(format!(
                "fill rate must be a finite non-negative number, got {}",
                fill_rate
            )));
        }

        let scaled = (fill_rate * RATE_SCALE).round();
        if scaled >= u128::MAX as f64 {
            return Err(TollgateError::InvalidConfiguration(format!(
                "fill rate {} is too large",
                fill_rate
            )));
        }
        if fill_rate > 0.0 && scaled < 1.0 {
            return Err(TollgateError::InvalidConfiguration(format!(
                "fill rate {} is below the resolution of 1e-18 tokens per second",
                fill_rate
            )));
        }

        debug!(capacity, fill_rate, "Creating token bucket");

        let now = clock.now();
        Ok(Self {
            capacity,
            max_tokens,
            fill_rate,
            rate_scaled: scaled as u128,
            state: Mutex::new(BucketState {
                tokens: max_tokens,
                last_refill: now,
                carry: 0,
            }),
            clock,
        })
    }

    /// Try to consume `cost` tokens for one request.
    ///
    /// Returns `Ok(true)` if the request is admitted and `Ok(false)` if the
    /// bucket does not currently hold enough tokens. A rejected request
    /// leaves the balance untouched. A cost larger than the capacity can never
    /// be satisfied and is always rejected.
    ///
    /// Fails with [`TollgateError::InvalidRequest`] if `cost` is zero, without
    /// touching the bucket.
    pub fn allow(&self, cost: u64) -> Result<bool> {
        if cost == 0 {
            return Err(TollgateError::InvalidRequest(
                "cost must be greater than zero".to_string(),
            ));
        }
        let requested = Tokens::from_whole(cost);

        let (admitted, tokens) = {
            let mut state = self.state.lock();
            let now = self.clock.now();
            self.refill(&mut state, now);

            let current = state.tokens;
            match requested.and_then(|r| current.checked_sub(r)) {
                Some(rest) => {
                    state.tokens = rest;
                    (true, rest)
                }
                None => (false, current),
            }
        };

        if admitted {
            trace!(cost, remaining = %tokens, "Request admitted");
        } else {
            debug!(cost, available = %tokens, "Request rejected");
        }

        Ok(admitted)
    }

    /// Tokens that would be available to a request made right now.
    ///
    /// This projects the pending refill without recording it, so it never
    /// changes the bucket.
    pub fn available(&self) -> f64 {
        let state = self.state.lock();
        let elapsed = self.clock.now().saturating_duration_since(state.last_refill);
        let (tokens, _) = self.replenish(state.tokens, state.carry, elapsed);
        tokens.as_f64()
    }

    /// Maximum number of tokens the bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    /// The clock this bucket reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Bring the balance up to date with the clock.
    fn refill(&self, state: &mut BucketState, now: Instant) {
        if now < state.last_refill {
            // Keep the old baseline so the skipped interval is not counted twice
            let behind = state.last_refill - now;
            warn!(behind = ?behind, "Clock moved backward; skipping refill");
            return;
        }

        let elapsed = now - state.last_refill;
        let (tokens, carry) = self.replenish(state.tokens, state.carry, elapsed);
        state.tokens = tokens;
        state.carry = carry;
        state.last_refill = now;
    }

    /// Compute the balance and carry after `elapsed` time has passed.
    fn replenish(&self, tokens: Tokens, carry: u128, elapsed: Duration) -> (Tokens, u128) {
        let numerator = elapsed
            .as_nanos()
            .saturating_mul(self.rate_scaled)
            .saturating_add(carry);
        let added = u64::try_from(numerator / REFILL_DIVISOR).unwrap_or(u64::MAX);

        let refilled = tokens.saturating_add(Tokens::from_nanos(added));
        if refilled >= self.max_tokens {
            // Overflow past capacity is discarded, fractional carry included
            (self.max_tokens, 0)
        } else {
            (refilled, numerator % REFILL_DIVISOR)
        }
    }
}
