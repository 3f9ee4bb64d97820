//! Time-delay anti-spam token and honeypot configuration.
//!
//! The token is the form's render timestamp run through a fixed digit
//! substitution (`0123456789` → `jihgfedcba`). It is obfuscation, not
//! encryption: the goal is only that naive bots cannot read a plain Unix
//! timestamp out of the markup. A submission is accepted when the decoded
//! timestamp plus the configured delay is not in the future, i.e. the form
//! existed for at least `delay_seconds` before it was submitted.

use crate::settings::FormSettings;

/// Reserved honeypot field name. Must arrive empty.
pub const HONEYPOT_FIELD: &str = "_protect";

/// Reserved field carrying the obfuscated render timestamp.
pub const TIMESTAMP_FIELD: &str = "_form_created";

/// Digit alphabet and its substitution image, index-aligned.
const DIGITS: &[u8; 10] = b"0123456789";
const CIPHER: &[u8; 10] = b"jihgfedcba";

/// Anti-spam settings resolved for one request.
#[derive(Debug, Clone, Copy)]
pub struct AntiSpamConfig {
    /// Whether the honeypot and time-delay checks run at all.
    pub enabled: bool,

    /// Minimum seconds between render and submission.
    pub delay_seconds: i64,
}

impl AntiSpamConfig {
    /// Resolve anti-spam settings, applying the default delay when unset.
    pub fn from_settings(settings: &FormSettings) -> Self {
        Self {
            enabled: settings.add_antispam,
            delay_seconds: settings.antispam_delay_seconds(),
        }
    }

    /// A disabled configuration, for forms without anti-spam.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            delay_seconds: 0,
        }
    }
}

/// Encode a timestamp into its obfuscated token form.
///
/// Each decimal digit is replaced by the character at the same index in
/// the cipher alphabet; any other character (a leading `-`, in theory)
/// passes through unchanged.
pub fn encode_timestamp(timestamp: i64) -> String {
    timestamp
        .to_string()
        .chars()
        .map(|c| match DIGITS.iter().position(|&d| d as char == c) {
            Some(i) => CIPHER[i] as char,
            None => c,
        })
        .collect()
}

/// Decode a token back into a timestamp.
///
/// Inverse substitution followed by an integer parse. Returns `None` for
/// anything that does not decode to a valid integer — an empty token, a
/// tampered token, or stray characters outside the cipher alphabet.
pub fn decode_token(token: &str) -> Option<i64> {
    let decoded: String = token
        .chars()
        .map(|c| match CIPHER.iter().position(|&d| d as char == c) {
            Some(i) => DIGITS[i] as char,
            None => c,
        })
        .collect();

    decoded.parse().ok()
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_maps_digits() {
        assert_eq!(encode_timestamp(0), "j");
        assert_eq!(encode_timestamp(1234567890), "ihgfedcbaj");
    }

    #[test]
    fn test_round_trip() {
        for ts in [0, 1, 42, 1_000_000, 1_700_000_000, i64::MAX] {
            assert_eq!(decode_token(&encode_timestamp(ts)), Some(ts));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_token(""), None);
        assert_eq!(decode_token("hello world"), None);
        assert_eq!(decode_token("fedcbaZ"), None);
        assert_eq!(decode_token("1234"), Some(1234));
    }

    #[test]
    fn test_token_length_matches_decimal_length() {
        let ts = 1_700_000_000;
        assert_eq!(encode_timestamp(ts).len(), ts.to_string().len());
    }
}
