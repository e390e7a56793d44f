use std::fmt;

use crate::{check_digits, hotp::Hotp, DigestTrace, Otp, OtpCode, OtpError, OtpHashAlgorithm};

#[derive(Clone, PartialEq)]
pub struct Totp {
    pub(crate) secret: String,
    pub(crate) algorithm: OtpHashAlgorithm,
    pub(crate) period: i64,
    pub(crate) digits: u32,
}

impl Otp for Totp {}

impl fmt::Debug for Totp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Totp")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("period", &self.period)
            .field("digits", &self.digits)
            .finish()
    }
}

/// Outcome of a single generation: the code and the time step it was computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpResult {
    pub code: OtpCode,
    pub counter: u64,
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given an RFC4648 base32 encoded secret.
    ///
    /// Obs.: This method defaults to the SHA1 hash, a 6-digit code and a period of 30 seconds
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: OtpHashAlgorithm::SHA1,
            period: 30,
            digits: 6,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the period in seconds
    ///
    /// Not validated here, a non-positive period fails at generation time.
    pub fn with_period(&mut self, period: i64) -> &mut Self {
        self.period = period;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    fn checked_period(&self) -> Result<u64, OtpError> {
        match u64::try_from(self.period) {
            Ok(period) if period > 0 => Ok(period),
            _ => Err(OtpError::InvalidInterval(self.period)),
        }
    }

    fn as_hotp(&self) -> Hotp {
        Hotp {
            secret: self.secret.clone(),
            algorithm: self.algorithm,
            digits: self.digits,
        }
    }

    /// Number of whole periods elapsed since the UNIX epoch
    pub fn counter_at(&self, seconds_since_epoch: u64) -> Result<u64, OtpError> {
        Ok(seconds_since_epoch / self.checked_period()?)
    }

    /// Seconds left before the code for `seconds_since_epoch` rolls over
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> Result<u64, OtpError> {
        let period = self.checked_period()?;

        Ok(period - seconds_since_epoch % period)
    }

    /// Generates a Totp from the provided seconds since the UNIX epoch
    /// truncated to the specified number of digits
    pub fn generate(&self, seconds_since_epoch: u64) -> Result<OtpCode, OtpError> {
        Ok(self.resolve(seconds_since_epoch, None)?.code)
    }

    /// Generates the code for an explicit time step
    pub fn generate_at_counter(&self, counter: u64) -> Result<OtpCode, OtpError> {
        Ok(self.resolve(0, Some(counter))?.code)
    }

    /// Picks the time step (the override when given, otherwise the one
    /// containing `seconds_since_epoch`) and generates its code.
    ///
    /// Inputs are checked in order: secret, period, digits. Nothing is
    /// hashed unless all three are valid.
    pub fn resolve(
        &self,
        seconds_since_epoch: u64,
        counter_override: Option<u64>,
    ) -> Result<TotpResult, OtpError> {
        Self::decode_secret(self.secret.as_str())?;
        let counter = match counter_override {
            Some(counter) => {
                self.checked_period()?;
                counter
            }
            None => self.counter_at(seconds_since_epoch)?,
        };
        check_digits(self.digits)?;

        let code = self.as_hotp().generate(counter)?;

        Ok(TotpResult { code, counter })
    }

    /// Every intermediate value of the computation for the given time step
    pub fn trace(&self, counter: u64) -> Result<DigestTrace, OtpError> {
        self.checked_period()?;

        self.as_hotp().trace(counter)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use crate::{totp::Totp, ErrorKind, OtpError, OtpHashAlgorithm};

    #[fixture]
    pub fn sha1_secret() -> String {
        "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".to_string()
    }

    #[fixture]
    pub fn sha256_secret() -> String {
        "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZA".to_string()
    }

    #[fixture]
    pub fn sha512_secret() -> String {
        "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNA".to_string()
    }

    #[rstest]
    #[case(sha1_secret(), "sha1", 59, "94287082")]
    #[case(sha256_secret(), "sha256", 59, "46119246")]
    #[case(sha512_secret(), "sha512", 59, "90693936")]
    #[case(sha1_secret(), "sha1", 1111111109, "07081804")]
    #[case(sha256_secret(), "sha256", 1111111109, "68084774")]
    #[case(sha512_secret(), "sha512", 1111111109, "25091201")]
    #[case(sha1_secret(), "sha1", 1111111111, "14050471")]
    #[case(sha256_secret(), "sha256", 1111111111, "67062674")]
    #[case(sha512_secret(), "sha512", 1111111111, "99943326")]
    #[case(sha1_secret(), "sha1", 1234567890, "89005924")]
    #[case(sha256_secret(), "sha256", 1234567890, "91819424")]
    #[case(sha512_secret(), "sha512", 1234567890, "93441116")]
    #[case(sha1_secret(), "sha1", 2000000000, "69279037")]
    #[case(sha256_secret(), "sha256", 2000000000, "90698825")]
    #[case(sha512_secret(), "sha512", 2000000000, "38618901")]
    #[case(sha1_secret(), "sha1", 20000000000, "65353130")]
    #[case(sha256_secret(), "sha256", 20000000000, "77737706")]
    #[case(sha512_secret(), "sha512", 20000000000, "47863826")]
    #[case(sha1_secret(), "sha1", 20000000000, "353130")]
    #[case(sha256_secret(), "sha256", 20000000000, "737706")]
    #[case(sha512_secret(), "sha512", 20000000000, "863826")]
    fn totp_test(
        #[case] secret: String,
        #[case] hash: OtpHashAlgorithm,
        #[case] timestamp: u64,
        #[case] expected: &str,
    ) {
        let mut totp_base = Totp::new(secret);
        totp_base
            .with_algorithm(hash)
            .with_digits(expected.len() as u32);

        let generated_otp = totp_base.generate(timestamp).unwrap();
        assert_eq!(expected, generated_otp.to_string());
    }

    #[test]
    fn rfc_ascii_secret_at_59_seconds() {
        let secret = data_encoding::BASE32_NOPAD.encode(b"12345678901234567890");
        let mut totp = Totp::new(secret);
        totp.with_digits(8).with_period(30);

        let result = totp.resolve(59, None).unwrap();

        assert_eq!(1, result.counter);
        assert_eq!("94287082", result.code.to_string());
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(42)]
    #[case(u64::MAX)]
    fn counter_override_is_echoed(sha1_secret: String, #[case] counter: u64) {
        let totp = Totp::new(sha1_secret.as_str());

        let result = totp.resolve(1234567890, Some(counter)).unwrap();

        assert_eq!(counter, result.counter);
        assert_eq!(6, result.code.to_string().len());
        assert_eq!(result.code, totp.generate_at_counter(counter).unwrap());
    }

    #[rstest]
    fn generation_is_deterministic(sha1_secret: String) {
        let mut totp = Totp::new(sha1_secret.as_str());
        totp.with_digits(8).with_period(60);

        let first = totp.resolve(0, Some(987654)).unwrap();
        let second = totp.resolve(999, Some(987654)).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    #[case(5)]
    #[case(11)]
    fn rejects_digits(sha1_secret: String, #[case] digits: u32) {
        let mut totp = Totp::new(sha1_secret.as_str());
        totp.with_digits(digits);

        let err = totp.resolve(59, None).unwrap_err();

        assert!(matches!(err, OtpError::InvalidDigits(d) if d == i64::from(digits)));
    }

    #[rstest]
    #[case(0, None)]
    #[case(-1, None)]
    #[case(0, Some(7))]
    fn rejects_interval(
        sha1_secret: String,
        #[case] period: i64,
        #[case] counter_override: Option<u64>,
    ) {
        let mut totp = Totp::new(sha1_secret.as_str());
        totp.with_period(period);

        let err = totp.resolve(59, counter_override).unwrap_err();

        assert!(matches!(err, OtpError::InvalidInterval(p) if p == period));
    }

    #[test]
    fn rejects_invalid_base32() {
        let totp = Totp::new("not-valid-base32!!");

        assert_eq!(
            ErrorKind::InvalidSecret,
            totp.resolve(59, None).unwrap_err().kind()
        );
    }

    #[test]
    fn secret_is_checked_before_interval_and_digits() {
        let mut totp = Totp::new("not-valid-base32!!");
        totp.with_period(0).with_digits(3);

        assert_eq!(
            ErrorKind::InvalidSecret,
            totp.resolve(59, None).unwrap_err().kind()
        );

        let mut totp = Totp::new("JBSWY3DPEHPK3PXP");
        totp.with_period(0).with_digits(3);

        assert_eq!(
            ErrorKind::InvalidInterval,
            totp.resolve(59, None).unwrap_err().kind()
        );
    }

    #[rstest]
    fn ten_digit_codes_do_not_overflow(sha1_secret: String) {
        let mut totp = Totp::new(sha1_secret.as_str());
        totp.with_digits(10);

        let code = totp.generate(59).unwrap();

        assert_eq!(10, code.to_string().len());
        assert_eq!("1094287082", code.to_string());
    }

    #[rstest]
    #[case(30, 0, 30)]
    #[case(30, 59, 1)]
    #[case(30, 60, 30)]
    #[case(60, 1111111109, 31)]
    fn remaining_seconds(#[case] period: i64, #[case] now: u64, #[case] expected: u64) {
        let mut totp = Totp::new("JBSWY3DPEHPK3PXP");
        totp.with_period(period);

        assert_eq!(expected, totp.remaining_seconds(now).unwrap());
    }

    #[rstest]
    fn lowercase_and_padded_secrets_match(sha1_secret: String) {
        let upper = Totp::new(sha1_secret.as_str()).generate(59).unwrap();
        let lower = Totp::new(sha1_secret.to_lowercase())
            .generate(59)
            .unwrap();
        let padded = Totp::new("JBSWY3DPEHPK3PXP========").generate(59).unwrap();

        assert_eq!(upper, lower);
        assert_eq!(Totp::new("JBSWY3DPEHPK3PXP").generate(59).unwrap(), padded);
    }

    #[rstest]
    fn trace_matches_generated_code(sha1_secret: String) {
        let totp = Totp::new(sha1_secret.as_str());

        let trace = totp.trace(1).unwrap();

        assert_eq!(totp.generate(59).unwrap(), trace.code);
        assert_eq!(20, trace.digest.len());
    }
}
