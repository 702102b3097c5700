//! Reservation cookie generation.
//!
//! Cookies are drawn uniformly from the 94 printable ASCII symbols `33..=126`.
//! The generator is injected through the dispatcher environment so tests can
//! swap in a deterministic source.

use crate::types::{COOKIE_LEN, COOKIE_MAX_BYTE, COOKIE_MIN_BYTE, Cookie};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of reservation cookies
pub trait CookieGenerator: Send + Sync {
    /// Mint a fresh cookie
    fn generate(&self) -> Cookie;
}

/// Cookie generator backed by the thread-local CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCookieGenerator;

impl RandomCookieGenerator {
    /// Create a generator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CookieGenerator for RandomCookieGenerator {
    fn generate(&self) -> Cookie {
        random_cookie(&mut rand::thread_rng())
    }
}

/// Deterministic generator: cookie `n` spells out `n` over the printable range
///
/// Every cookie it mints is distinct, which makes it handy for asserting on
/// which reservation a cookie belongs to.
#[derive(Debug, Default)]
pub struct SequentialCookieGenerator {
    next: AtomicU64,
}

impl SequentialCookieGenerator {
    /// Create a generator whose first cookie encodes 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }
}

impl CookieGenerator for SequentialCookieGenerator {
    fn generate(&self) -> Cookie {
        let mut n = self.next.fetch_add(1, Ordering::SeqCst);
        let base = u64::from(COOKIE_MAX_BYTE - COOKIE_MIN_BYTE) + 1;
        let mut bytes = [COOKIE_MIN_BYTE; COOKIE_LEN];
        for byte in bytes.iter_mut().rev() {
            // n % base < 94, always fits
            #[allow(clippy::cast_possible_truncation)]
            let offset = (n % base) as u8;
            *byte = COOKIE_MIN_BYTE + offset;
            n /= base;
        }
        Cookie::new(bytes)
    }
}

fn random_cookie<R: Rng + ?Sized>(rng: &mut R) -> Cookie {
    let symbols = Uniform::new_inclusive(COOKIE_MIN_BYTE, COOKIE_MAX_BYTE);
    let mut bytes = [0u8; COOKIE_LEN];
    for byte in &mut bytes {
        *byte = symbols.sample(rng);
    }
    Cookie::new(bytes)
}
