use std::fmt;

use crate::{check_digits, Otp, OtpCode, OtpError, OtpHashAlgorithm};

#[derive(Clone, PartialEq)]
pub struct Hotp {
    pub(crate) secret: String,
    pub(crate) algorithm: OtpHashAlgorithm,
    // How many digits to generate
    pub(crate) digits: u32,
}

impl Otp for Hotp {}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .finish()
    }
}

/// Intermediate values of a single code computation, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestTrace {
    pub counter: u64,
    pub counter_bytes: [u8; 8],
    pub digest: Vec<u8>,
    pub offset: usize,
    pub truncated: u32,
    pub code: OtpCode,
}

impl DigestTrace {
    pub fn counter_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.counter_bytes)
    }

    pub fn digest_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.digest)
    }
}

impl Hotp {
    /// Creates the config for the [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
    /// (HOTP) given an RFC4648 base32 encoded secret
    ///
    /// Obs.: This method defaults to the SHA1 hash and a 6-digit code.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: OtpHashAlgorithm::SHA1,
            digits: 6,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates a HOTP from the provided counter
    /// truncated to the specified number of digits
    pub fn generate(&self, counter: u64) -> Result<OtpCode, OtpError> {
        Ok(self.trace(counter)?.code)
    }

    /// Same as [Hotp::generate], keeping every intermediate value
    pub fn trace(&self, counter: u64) -> Result<DigestTrace, OtpError> {
        let decoded = Self::decode_secret(self.secret.as_str())?;
        check_digits(self.digits)?;

        let digest = Self::calc_digest(decoded.as_slice(), self.algorithm, counter)?;
        let (offset, truncated) = Self::dynamic_truncation(digest.as_ref())?;
        let code = Self::encode_digest_truncated(digest.as_ref(), self.digits)?;

        Ok(DigestTrace {
            counter,
            counter_bytes: counter.to_be_bytes(),
            digest,
            offset,
            truncated,
            code: OtpCode {
                code,
                digits: self.digits,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{hotp::Hotp, ErrorKind, OtpHashAlgorithm};

    #[rstest]
    #[case(0, 755224)]
    #[case(1, 287082)]
    #[case(2, 359152)]
    #[case(3, 969429)]
    #[case(4, 338314)]
    #[case(5, 254676)]
    #[case(6, 287922)]
    #[case(7, 162583)]
    #[case(8, 399871)]
    #[case(9, 520489)]
    fn hotp(#[case] counter: u64, #[case] expected: u32) {
        let hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");

        assert_eq!(hotp.generate(counter).unwrap().integer(), expected);
    }

    #[test]
    fn trace_exposes_intermediate_values() {
        let hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");

        let trace = hotp.trace(1).unwrap();

        // RFC 4226 appendix D, count 1
        assert_eq!("0000000000000001", trace.counter_hex());
        assert_eq!("75a48a19d4cbe100644e8ac1397eea747a2d33ab", trace.digest_hex());
        assert_eq!(11, trace.offset);
        assert_eq!(0x41397eea, trace.truncated);
        assert_eq!("287082", trace.code.to_string());
    }

    #[test]
    fn sha256_digest_is_longer() {
        let mut hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        hotp.with_algorithm(OtpHashAlgorithm::SHA256);

        assert_eq!(32, hotp.trace(0).unwrap().digest.len());
    }

    #[rstest]
    #[case(5)]
    #[case(11)]
    fn rejects_digits_out_of_range(#[case] digits: u32) {
        let mut hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        hotp.with_digits(digits);

        assert_eq!(ErrorKind::InvalidDigits, hotp.generate(0).unwrap_err().kind());
    }

    #[test]
    fn debug_output_hides_secret() {
        let hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");

        assert!(!format!("{hotp:?}").contains("GEZDGNBV"));
    }
}
