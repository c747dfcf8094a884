//! Environment abstraction for deterministic testing.
//!
//! Decouples the session engine from system resources (time, randomness).
//! Production uses the tokio clock and OS entropy; simulation uses the paused
//! tokio clock and a seeded RNG so every run is reproducible.

use std::{
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time, randomness, and timers.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `sleep_until()` completes no earlier than `deadline`
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Both production and simulation use `tokio::time::Instant`; simulation
    /// pauses the clock so time only advances when every task is idle.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + Add<Duration, Output = Self::Instant>
        + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps until the given deadline.
    ///
    /// Used only by the runtime scheduler, never by state machine logic.
    fn sleep_until(&self, deadline: Self::Instant) -> impl Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random lowercase base-36 identifier of `len` characters.
    ///
    /// Used for locally generated user ids.
    fn random_base36(&self, len: usize) -> String {
        const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

        let mut bytes = vec![0u8; len];
        self.random_bytes(&mut bytes);
        bytes.iter().map(|b| char::from(ALPHABET[usize::from(*b) % ALPHABET.len()])).collect()
    }
}
