pub mod engine;
pub mod hotp;
pub mod totp;

use std::{fmt::Display, str::FromStr, time::SystemTimeError};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

pub use engine::{Clock, FixedClock, SystemClock, TotpEngine};
pub use hotp::{DigestTrace, Hotp};
pub use totp::{Totp, TotpResult};

/// Smallest accepted code length
pub const MIN_DIGITS: u32 = 6;
/// Largest accepted code length, the truncated value never exceeds 10 decimal digits
pub const MAX_DIGITS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Secret is not valid base32: {0}")]
    SecretDecode(data_encoding::DecodeError),
    #[error("Secret decodes to an empty key")]
    EmptySecret,
    #[error("Invalid number of digits, found {0}. Expected a value between 6 and 10")]
    InvalidDigits(i64),
    #[error("Invalid interval, found {0}. Expected a positive number of seconds")]
    InvalidInterval(i64),
    #[error("Invalid hashing algorithm, found {0}. Expected one of: SHA1, SHA256 or SHA512")]
    InvalidHashingAlgorithm(String),
    #[error("Invalid digest")]
    InvalidDigest(Vec<u8>),
    #[error("Could not initialize the HMAC")]
    InvalidKeyLength(hmac::digest::InvalidLength),
    #[error("System clock is before the UNIX epoch")]
    Clock(SystemTimeError),
}

/// Coarse classification of [OtpError], stable enough to be sent to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSecret,
    InvalidInterval,
    InvalidDigits,
    InvalidAlgorithm,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSecret => "invalid_secret",
            Self::InvalidInterval => "invalid_interval",
            Self::InvalidDigits => "invalid_digits",
            Self::InvalidAlgorithm => "invalid_algorithm",
            Self::Internal => "internal_error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OtpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SecretDecode(_) | Self::EmptySecret => ErrorKind::InvalidSecret,
            Self::InvalidInterval(_) => ErrorKind::InvalidInterval,
            Self::InvalidDigits(_) => ErrorKind::InvalidDigits,
            Self::InvalidHashingAlgorithm(_) => ErrorKind::InvalidAlgorithm,
            Self::InvalidDigest(_) | Self::InvalidKeyLength(_) | Self::Clock(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OtpHashAlgorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl Display for OtpHashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SHA1 => write!(f, "SHA1"),
            Self::SHA256 => write!(f, "SHA256"),
            Self::SHA512 => write!(f, "SHA512"),
        }
    }
}

impl FromStr for OtpHashAlgorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "SHA1" => Ok(Self::SHA1),
            "SHA256" => Ok(Self::SHA256),
            "SHA512" => Ok(Self::SHA512),
            _ => Err(OtpError::InvalidHashingAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

/// Rejects code lengths outside of [MIN_DIGITS]..=[MAX_DIGITS]
pub fn check_digits(digits: u32) -> Result<(), OtpError> {
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err(OtpError::InvalidDigits(digits.into()))
    }
}

pub trait Otp {
    /// Decodes a secret (given as an RFC4648 base32-encoded ASCII string)
    /// into a byte string.
    ///
    /// Lowercase letters, trailing `=` padding and whitespace are accepted.
    fn decode_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
        let compact: String = secret.chars().filter(|c| !c.is_whitespace()).collect();
        let normalized = compact.trim_end_matches('=').to_ascii_uppercase();

        let decoded = data_encoding::BASE32_NOPAD
            .decode(normalized.as_bytes())
            .map_err(OtpError::SecretDecode)?;

        if decoded.is_empty() {
            return Err(OtpError::EmptySecret);
        }

        Ok(decoded)
    }

    /// Calculates the HMAC digest of the big-endian counter for the given secret.
    fn calc_digest(
        decoded_secret: &[u8],
        algorithm: OtpHashAlgorithm,
        data: u64,
    ) -> Result<Vec<u8>, OtpError> {
        let data = data.to_be_bytes();

        let digest = match algorithm {
            OtpHashAlgorithm::SHA1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(decoded_secret)
                    .map_err(OtpError::InvalidKeyLength)?;
                mac.update(&data);
                mac.finalize().into_bytes().to_vec()
            }
            OtpHashAlgorithm::SHA256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(decoded_secret)
                    .map_err(OtpError::InvalidKeyLength)?;
                mac.update(&data);
                mac.finalize().into_bytes().to_vec()
            }
            OtpHashAlgorithm::SHA512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(decoded_secret)
                    .map_err(OtpError::InvalidKeyLength)?;
                mac.update(&data);
                mac.finalize().into_bytes().to_vec()
            }
        };

        Ok(digest)
    }

    /// Extracts the 31-bit value selected by the last nibble of the digest
    /// (RFC 4226 dynamic truncation). Returns the offset alongside the value.
    fn dynamic_truncation(digest: &[u8]) -> Result<(usize, u32), OtpError> {
        // While sometimes this is a hardcoded 19
        // the last byte tells us the offset for any algorithm
        let offset = match digest.last() {
            Some(x) => *x & 0xf,
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        } as usize;

        // Gets the 4 bytes that will compose the code
        let code_bytes: [u8; 4] = match digest.get(offset..offset + 4) {
            Some(x) => [x[0], x[1], x[2], x[3]],
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        };

        Ok((offset, u32::from_be_bytes(code_bytes) & 0x7fff_ffff))
    }

    /// Encodes the HMAC digest into a truncated integer.
    fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u32, OtpError> {
        check_digits(target_digits_count)?;

        let (_, truncated) = Self::dynamic_truncation(digest)?;
        // 10^10 does not fit in a u32
        let truncation_factor = u64::pow(10, target_digits_count);

        Ok((u64::from(truncated) % truncation_factor) as u32)
    }
}
