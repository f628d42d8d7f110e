use std::time::Duration;

/// Bounded exponential backoff: `base * 2^attempt`, capped. Attempt 0 is
/// the first retry.
pub fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(60);
        assert_eq!(backoff_delay(base, cap, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, cap, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, cap, 3), Duration::from_secs(8));
    }

    #[test]
    fn test_cap_applies() {
        let base = Duration::from_secs(5);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(base, cap, 4), cap);
        // Huge attempt counts do not overflow.
        assert_eq!(backoff_delay(base, cap, 1000), cap);
    }
}
