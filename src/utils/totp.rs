//! RFC 6238 time-based one-time passwords (HMAC-SHA1, 30 s step, 6 digits).

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// Generate a fresh base32 shared secret (160 bits, the RFC 4226 minimum).
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes)
}

/// otpauth:// provisioning URI for authenticator apps. Account and issuer
/// come from user data, so both are percent-encoded.
pub fn provisioning_uri(secret: &str, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account),
        secret,
        urlencoding::encode(issuer),
        DIGITS,
        STEP_SECONDS
    )
}

fn hotp(key: &[u8], counter: u64) -> Option<u32> {
    // HMAC accepts any key length, so this only fails on an empty secret.
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0f) as usize;
    let code = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    Some(code % 10u32.pow(DIGITS))
}

/// Code for an explicit Unix timestamp. Exposed for verification windows
/// and tests.
pub fn code_at(secret: &str, unix_seconds: u64) -> Option<String> {
    let key = base32::decode(
        base32::Alphabet::Rfc4648 { padding: false },
        &secret.to_ascii_uppercase(),
    )?;
    let counter = unix_seconds / STEP_SECONDS;
    let code = hotp(&key, counter)?;
    Some(format!("{:0width$}", code, width = DIGITS as usize))
}

pub fn current_code(secret: &str) -> Option<String> {
    code_at(secret, now())
}

/// Validate a submitted code, accepting ±`window` time steps of drift.
pub fn verify(secret: &str, code: &str, window: u64) -> bool {
    let now = now();
    let span = window * STEP_SECONDS;
    let mut t = now.saturating_sub(span);
    while t <= now + span {
        if code_at(secret, t).as_deref() == Some(code) {
            return true;
        }
        t += STEP_SECONDS;
    }
    false
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
