//! Slack request signature verification.
//!
//! Slack signs each request as `v0=hex(hmac_sha256(secret, "v0:{ts}:{body}"))`
//! and sends the timestamp alongside. Requests older than five minutes are
//! rejected before any comparison to blunt replay.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "v0=";
const MAX_AGE_SECS: i64 = 60 * 5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request timestamp is not a unix epoch integer")]
    MalformedTimestamp,
    #[error("request timestamp is outside the freshness window")]
    StaleTimestamp,
    #[error("signature header is not a v0 hex digest")]
    MalformedSignature,
    #[error("signature does not match the request body")]
    Mismatch,
}

/// Verifies `signature` against `body` as signed at `timestamp`. The caller
/// supplies `now` so the freshness window is testable.
pub fn verify_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &str,
    signature: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
    if (now.timestamp() - ts).abs() > MAX_AGE_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let hex_digest =
        signature.strip_prefix(SIGNATURE_PREFIX).ok_or(SignatureError::MalformedSignature)?;
    let provided = decode_hex(hex_digest).ok_or(SignatureError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(signing_secret.expose_secret().as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body.as_bytes());

    // verify_slice is the constant-time comparison.
    mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
}

fn decode_hex(digest: &str) -> Option<Vec<u8>> {
    if digest.len() % 2 != 0 {
        return None;
    }
    (0..digest.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digest.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;
    use std::fmt::Write;

    use super::{verify_signature, SignatureError};

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    fn sign(timestamp: &str, body: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).expect("hmac accepts any key length");
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        let digest = mac.finalize().into_bytes();
        let mut out = String::from("v0=");
        for byte in digest {
            write!(out, "{byte:02x}").expect("writing to a String cannot fail");
        }
        out
    }

    fn secret() -> SecretString {
        SecretString::from(SECRET)
    }

    #[test]
    fn valid_signature_within_the_window_passes() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let timestamp = "1700000000";
        let body = "command=%2Fgtd&text=add%20Buy%20milk";

        let result = verify_signature(&secret(), timestamp, body, &sign(timestamp, body), now);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let timestamp = "1700000000";
        let signature = sign(timestamp, "command=%2Fgtd&text=add%20Buy%20milk");

        let result =
            verify_signature(&secret(), timestamp, "command=%2Fgtd&text=delete%20all", &signature, now);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn stale_timestamps_fail_before_any_comparison() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let timestamp = "1699999000";
        let body = "payload=%7B%7D";

        let result = verify_signature(&secret(), timestamp, body, &sign(timestamp, body), now);
        assert_eq!(result, Err(SignatureError::StaleTimestamp));
    }

    #[test]
    fn skew_in_either_direction_is_tolerated_up_to_five_minutes() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let body = "payload=%7B%7D";

        let recent_past = "1699999701";
        assert_eq!(
            verify_signature(&secret(), recent_past, body, &sign(recent_past, body), now),
            Ok(())
        );

        let near_future = "1700000299";
        assert_eq!(
            verify_signature(&secret(), near_future, body, &sign(near_future, body), now),
            Ok(())
        );
    }

    #[test]
    fn malformed_headers_are_rejected_with_specific_errors() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        assert_eq!(
            verify_signature(&secret(), "not-a-number", "x", "v0=abcd", now),
            Err(SignatureError::MalformedTimestamp)
        );
        assert_eq!(
            verify_signature(&secret(), "1700000000", "x", "sha256=abcd", now),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&secret(), "1700000000", "x", "v0=zzzz", now),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&secret(), "1700000000", "x", "v0=abc", now),
            Err(SignatureError::MalformedSignature)
        );
    }
}
