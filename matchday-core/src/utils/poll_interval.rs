//! Poll cadence calculation.

use rand::Rng;
use std::time::Duration;

/// Returns the delay before the next poll: the base interval plus a uniform
/// random share of `jitter`. Randomizing the cadence keeps the request
/// pattern from looking machine-regular to the upstream source.
pub fn next_poll_delay(interval: Duration, jitter: Duration, rng: &mut impl Rng) -> Duration {
    if jitter.is_zero() {
        return interval;
    }
    let extra_ms = rng.random_range(0..=jitter.as_millis() as u64);
    interval + Duration::from_millis(extra_ms)
}
