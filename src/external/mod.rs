//! Outbound HTTP: upstream clients, throttling, pagination.

pub mod client;
pub mod douban;
pub mod imdb;
pub mod pagination;
pub mod throttler;

use std::time::Duration;

use rand::Rng;

/// Sleeps a random duration in `[0, max_seconds)`. Used between upstream
/// requests so fetch bursts do not look mechanical.
pub(crate) async fn sleep_jitter(max_seconds: f64) {
    if max_seconds <= 0.0 {
        return;
    }
    let delay = rand::rng().random_range(0.0..max_seconds);
    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
}
