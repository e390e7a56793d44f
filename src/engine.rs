use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{totp::Totp, OtpError, TotpResult};

/// Source of "now" for time-derived counters
pub trait Clock: Send + Sync {
    fn seconds_since_epoch(&self) -> Result<u64, OtpError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn seconds_since_epoch(&self) -> Result<u64, OtpError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(OtpError::Clock)?;

        Ok(elapsed.as_secs())
    }
}

/// A clock stuck at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn seconds_since_epoch(&self) -> Result<u64, OtpError> {
        Ok(self.0)
    }
}

/// Stateless generator shared by every request. Holds nothing but the clock.
#[derive(Clone)]
pub struct TotpEngine {
    clock: Arc<dyn Clock>,
}

impl Default for TotpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TotpEngine {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    pub fn now(&self) -> Result<u64, OtpError> {
        self.clock.seconds_since_epoch()
    }

    /// Generates the code for the current time step, or for `counter_override` when given
    pub fn generate(
        &self,
        totp: &Totp,
        counter_override: Option<u64>,
    ) -> Result<TotpResult, OtpError> {
        let now = match counter_override {
            Some(_) => 0,
            None => self.now()?,
        };

        totp.resolve(now, counter_override)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{engine::TotpEngine, Clock, FixedClock, SystemClock, Totp};

    #[rstest]
    #[case(59, 1, "94287082")]
    #[case(1111111109, 37037036, "07081804")]
    #[case(1234567890, 41152263, "89005924")]
    fn uses_clock_for_counter(#[case] now: u64, #[case] counter: u64, #[case] expected: &str) {
        let engine = TotpEngine::with_clock(FixedClock(now));
        let mut totp = Totp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        totp.with_digits(8);

        let result = engine.generate(&totp, None).unwrap();

        assert_eq!(counter, result.counter);
        assert_eq!(expected, result.code.to_string());
    }

    #[test]
    fn override_ignores_clock() {
        let engine = TotpEngine::with_clock(FixedClock(1234567890));
        let totp = Totp::new("JBSWY3DPEHPK3PXP");

        let result = engine.generate(&totp, Some(5)).unwrap();

        assert_eq!(5, result.counter);
        assert_eq!(totp.generate_at_counter(5).unwrap(), result.code);
    }

    #[test]
    fn system_clock_counter_tracks_now() {
        let engine = TotpEngine::new();
        let totp = Totp::new("JBSWY3DPEHPK3PXP");

        let before = SystemClock.seconds_since_epoch().unwrap() / 30;
        let result = engine.generate(&totp, None).unwrap();
        let after = SystemClock.seconds_since_epoch().unwrap() / 30;

        assert!((before..=after).contains(&result.counter));
    }
}
