//! Production Environment implementation using the tokio clock and OS RNG.
//!
//! `SystemEnv` uses `tokio::time::Instant`, which tracks real time in
//! production and follows the paused clock in `start_paused` tests, and
//! getrandom for the locally generated user id.

use k9crypt_core::Environment;
use tokio::time::Instant;

/// Production environment using the tokio clock and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client that cannot draw randomness cannot
/// generate its identity, and RNG failure indicates OS-level problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Self::Instant) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep_until(deadline)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_until_follows_the_tokio_clock() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep_until(start + Duration::from_millis(250)).await;

        assert!(env.now() - start >= Duration::from_millis(250));
    }

    #[test]
    fn random_bytes_fill_the_buffer() {
        let env = SystemEnv::new();

        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        env.random_bytes(&mut first);
        env.random_bytes(&mut second);

        assert_ne!(first, second);
    }

    #[test]
    fn user_ids_are_base36() {
        let id = SystemEnv::new().random_base36(8);
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
