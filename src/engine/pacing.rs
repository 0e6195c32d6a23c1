//! Anti-detection pacing: randomized delays and periodic cooldowns.
//!
//! Pure function of configuration plus a random source. The caller owns the
//! companies-processed counter and asks `should_cooldown` at each step.

use std::time::Duration;

use crate::infrastructure::config::PacingConfig;

#[derive(Debug, Clone)]
pub struct PacingPolicy {
    config: PacingConfig,
}

impl PacingPolicy {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Delay before each field read.
    pub fn field_delay(&self) -> Duration {
        range_delay(
            self.config.min_field_delay_ms,
            self.config.max_field_delay_ms,
        )
    }

    /// Delay between two companies.
    pub fn company_delay(&self) -> Duration {
        range_delay(
            self.config.min_company_delay_ms,
            self.config.max_company_delay_ms,
        )
    }

    /// Delay between retry attempts of the same company. Reuses the company
    /// range: a retry should look like moving on to the next profile.
    pub fn retry_delay(&self) -> Duration {
        self.company_delay()
    }

    /// True when `companies_processed` hits the configured interval.
    pub fn should_cooldown(&self, companies_processed: usize) -> bool {
        self.config.cooldown_every_n > 0
            && companies_processed > 0
            && companies_processed % self.config.cooldown_every_n == 0
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.config.cooldown_duration_secs)
    }
}

fn range_delay(min_ms: u64, max_ms: u64) -> Duration {
    let millis = if max_ms > min_ms {
        fastrand::u64(min_ms..=max_ms)
    } else {
        min_ms
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(config: PacingConfig) -> PacingPolicy {
        PacingPolicy::new(config)
    }

    #[test]
    fn delays_stay_inside_the_configured_range() {
        let p = policy(PacingConfig {
            min_field_delay_ms: 100,
            max_field_delay_ms: 200,
            min_company_delay_ms: 1_000,
            max_company_delay_ms: 2_000,
            cooldown_every_n: 5,
            cooldown_duration_secs: 60,
        });

        for _ in 0..200 {
            let field = p.field_delay().as_millis();
            assert!((100..=200).contains(&field), "field delay {field} out of range");
            let company = p.company_delay().as_millis();
            assert!(
                (1_000..=2_000).contains(&company),
                "company delay {company} out of range"
            );
        }
    }

    #[test]
    fn degenerate_range_is_deterministic() {
        let p = policy(PacingConfig {
            min_field_delay_ms: 50,
            max_field_delay_ms: 50,
            ..PacingConfig::default()
        });
        assert_eq!(p.field_delay(), Duration::from_millis(50));
    }

    #[test]
    fn cooldown_fires_at_the_interval_and_never_at_zero() {
        let p = policy(PacingConfig {
            cooldown_every_n: 3,
            ..PacingConfig::default()
        });
        assert!(!p.should_cooldown(0));
        assert!(!p.should_cooldown(1));
        assert!(!p.should_cooldown(2));
        assert!(p.should_cooldown(3));
        assert!(!p.should_cooldown(4));
        assert!(p.should_cooldown(6));
    }

    #[test]
    fn zero_interval_disables_cooldowns() {
        let p = policy(PacingConfig {
            cooldown_every_n: 0,
            ..PacingConfig::default()
        });
        assert!(!p.should_cooldown(10));
        assert!(!p.should_cooldown(100));
    }
}
