use std::time::Duration;

use scorebridge_state_store::SettingsStore;

/// Longest delay a host timer honours; longer periods are treated as disabled.
pub const MAX_RELOAD_INTERVAL: Duration = Duration::from_millis(i32::MAX as u64);

/// Auto-reload decision computed from the store's current values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoReloadPolicy {
    pub enabled: bool,
    pub period: Duration,
}

impl AutoReloadPolicy {
    pub fn from_store(settings: &SettingsStore) -> Self {
        Self {
            enabled: settings.auto_reload_enabled(),
            period: settings.auto_reload_interval(),
        }
    }

    /// Reload period, or `None` when disabled, shorter than `minimum` or
    /// beyond [`MAX_RELOAD_INTERVAL`].
    pub fn interval(&self, minimum: Duration) -> Option<Duration> {
        (self.enabled && self.period >= minimum && self.period <= MAX_RELOAD_INTERVAL)
            .then_some(self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(5);

    fn policy(enabled: bool, millis: u64) -> AutoReloadPolicy {
        AutoReloadPolicy {
            enabled,
            period: Duration::from_millis(millis),
        }
    }

    #[test]
    fn arms_only_when_enabled_and_long_enough() {
        assert_eq!(policy(true, 600_000).interval(MIN), Some(Duration::from_secs(600)));
        assert_eq!(policy(true, 5_000).interval(MIN), Some(MIN));
        assert_eq!(policy(true, 5_900).interval(MIN), Some(Duration::from_millis(5_900)));
        assert_eq!(policy(true, 3_000).interval(MIN), None);
        assert_eq!(policy(true, 0).interval(MIN), None);
        assert_eq!(policy(false, 600_000).interval(MIN), None);
    }

    #[test]
    fn oversized_period_is_disabled() {
        assert_eq!(policy(true, u64::MAX).interval(MIN), None);
        assert_eq!(
            policy(true, i32::MAX as u64).interval(MIN),
            Some(MAX_RELOAD_INTERVAL)
        );
        assert_eq!(policy(true, i32::MAX as u64 + 1).interval(MIN), None);
    }
}
