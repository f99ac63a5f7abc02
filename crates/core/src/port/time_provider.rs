// Time Provider Port (for deterministic testing)

/// Coarse wall-clock time in whole seconds, injected so tests can control it.
pub trait TimeProvider: Send + Sync {
    /// Floor of the current wall clock, in whole seconds since the epoch.
    fn now_secs(&self) -> i64;
}

/// System time provider (production).
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_time_is_plausible() {
        let now = SystemTimeProvider.now_secs();
        assert!(now > 1_700_000_000);
    }
}
