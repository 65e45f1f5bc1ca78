use base32::Alphabet;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Time step of the TOTP algorithm (RFC 6238 default).
pub const STEP_SECONDS: u64 = 30;
/// Number of digits in a code.
pub const CODE_DIGITS: usize = 6;
/// Clock-skew tolerance, in steps, applied on both sides of "now".
const SKEW_STEPS: i64 = 1;
/// Length of a freshly generated shared secret, in bytes.
const SECRET_BYTES: usize = 20;

const BASE32: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Generates a new random shared secret, base32-encoded for authenticator
/// apps (160 bits, the RFC 4226 recommended size for HMAC-SHA1).
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32::encode(BASE32, &bytes)
}

/// Builds the otpauth provisioning URI encoded into enrollment QR codes.
pub fn otpauth_url(login: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/CuratorCRM:{login}?secret={secret}&issuer=CuratorCRM&digits={CODE_DIGITS}&period={STEP_SECONDS}"
    )
}

/// Verifies a submitted code against a base32 secret at the current time.
pub fn verify(secret: &str, code: &str) -> bool {
    verify_at(secret, code, unix_now())
}

/// Verifies a submitted code at an explicit unix timestamp.
///
/// Fails closed on every malformed input: a code that is not exactly six
/// ASCII digits (wrong length, letters, embedded whitespace) or a secret
/// that does not decode as base32 is simply not valid. Codes from the
/// previous and next time step are accepted to tolerate clock skew.
pub fn verify_at(secret: &str, code: &str, unix_seconds: u64) -> bool {
    if code.len() != CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(key) = base32::decode(BASE32, secret) else {
        return false;
    };

    let current_step = (unix_seconds / STEP_SECONDS) as i64;
    for step in (current_step - SKEW_STEPS)..=(current_step + SKEW_STEPS) {
        if step < 0 {
            continue;
        }
        if let Some(expected) = hotp(&key, step as u64) {
            if expected == code {
                return true;
            }
        }
    }
    false
}

/// Computes the code for the step containing `unix_seconds`.
///
/// Used by enrollment tests and tooling; verification goes through
/// [`verify_at`] so the skew window stays in one place.
pub fn code_at(secret: &str, unix_seconds: u64) -> Option<String> {
    let key = base32::decode(BASE32, secret)?;
    hotp(&key, unix_seconds / STEP_SECONDS)
}

/// HOTP (RFC 4226): HMAC-SHA1 over the big-endian counter, dynamic
/// truncation, six decimal digits.
fn hotp(key: &[u8], counter: u64) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    Some(format!("{:06}", binary % 1_000_000))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
