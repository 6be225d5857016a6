//! Fixed-point token amounts.

use std::fmt;

/// Number of nano-tokens in one whole token.
pub const NANOS_PER_TOKEN: u64 = 1_000_000_000;

/// A non-negative amount of tokens with nano-token resolution.
///
/// Stored as an integer count of nano-tokens so that long runs of tiny
/// refills add up exactly instead of drifting the way repeated floating point
/// additions do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tokens(u64);

impl Tokens {
    /// No tokens.
    pub const ZERO: Tokens = Tokens(0);

    /// Largest whole token count that can be represented.
    pub const MAX_WHOLE: u64 = u64::MAX / NANOS_PER_TOKEN;

    /// Create an amount from a whole number of tokens.
    ///
    /// Returns `None` if `whole` exceeds [`Tokens::MAX_WHOLE`].
    pub fn from_whole(whole: u64) -> Option<Self> {
        whole.checked_mul(NANOS_PER_TOKEN).map(Tokens)
    }

    /// Create an amount from a raw nano-token count.
    pub const fn from_nanos(nanos: u64) -> Self {
        Tokens(nanos)
    }

    /// Raw nano-token count.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Approximate value in tokens.
    pub fn as_f64(self) -> f64 {
        let whole = self.0 / NANOS_PER_TOKEN;
        let frac = self.0 % NANOS_PER_TOKEN;
        whole as f64 + frac as f64 / NANOS_PER_TOKEN as f64
    }

    /// Add two amounts, saturating at the representable maximum.
    pub fn saturating_add(self, other: Tokens) -> Tokens {
        Tokens(self.0.saturating_add(other.0))
    }

    /// Subtract `other`, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Tokens) -> Option<Tokens> {
        self.0.checked_sub(other.0).map(Tokens)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANOS_PER_TOKEN;
        let frac = self.0 % NANOS_PER_TOKEN;
        if frac == 0 {
            return write!(f, "{}", whole);
        }

        let digits = format!("{:09}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}
