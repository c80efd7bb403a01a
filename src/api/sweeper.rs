//! Background sweeper for expired challenges.
//!
//! Challenges that expire without being verified are the only rows the
//! system ever deletes; everything else is kept for audit. The sweeper polls
//! on a fixed cadence and removes them in bulk.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::api::handlers::auth::delete_expired_challenges;

#[derive(Clone, Copy, Debug)]
pub struct SweeperConfig {
    interval: Duration,
}

impl SweeperConfig {
    /// Default sweep cadence: every 5 minutes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let interval = if self.interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.interval
        };
        Self { interval }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spawn_challenge_sweeper(pool: PgPool, config: SweeperConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();

        loop {
            match delete_expired_challenges(&pool).await {
                Ok(0) => {}
                Ok(deleted) => debug!("swept {deleted} expired challenges"),
                Err(err) => error!("challenge sweep failed: {err:#}"),
            }

            sleep(config.interval()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::SweeperConfig;
    use std::time::Duration;

    #[test]
    fn default_interval_is_five_minutes() {
        assert_eq!(SweeperConfig::new().interval(), Duration::from_secs(300));
    }

    #[test]
    fn normalize_clamps_zero_interval() {
        let config = SweeperConfig::new().with_interval_seconds(0).normalize();
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn builder_overrides_interval() {
        let config = SweeperConfig::new().with_interval_seconds(30);
        assert_eq!(config.interval(), Duration::from_secs(30));
    }
}
