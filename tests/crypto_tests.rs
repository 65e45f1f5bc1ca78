use curator_crm::crypto::FieldCipher;
use curator_crm::{password, totp};
use std::time::{SystemTime, UNIX_EPOCH};

// --- Field Cipher ---

const TEST_KEY: &str = "unit-test-field-encryption-key";

#[test]
fn test_encrypt_decrypt_round_trip() {
    let cipher = FieldCipher::new(TEST_KEY);
    assert!(cipher.is_configured());

    let stored = cipher.encrypt("John Doe");
    assert_ne!(stored, "John Doe");
    assert_eq!(cipher.decrypt(&stored), "John Doe");
}

#[test]
fn test_encrypt_same_plaintext_twice_yields_distinct_ciphertexts() {
    // A fresh random nonce per call: equal names in two rows must not
    // produce equal stored values.
    let cipher = FieldCipher::new(TEST_KEY);
    let first = cipher.encrypt("John Doe");
    let second = cipher.encrypt("John Doe");

    assert_ne!(first, second);
    assert_eq!(cipher.decrypt(&first), "John Doe");
    assert_eq!(cipher.decrypt(&second), "John Doe");
}

#[test]
fn test_empty_string_passes_through() {
    let cipher = FieldCipher::new(TEST_KEY);
    assert_eq!(cipher.encrypt(""), "");
    assert_eq!(cipher.decrypt(""), "");
}

#[test]
fn test_missing_key_passes_values_through() {
    // Fail-late contract: a cipher built without a key still serves
    // requests, it just stops protecting anything.
    let cipher = FieldCipher::new("");
    assert!(!cipher.is_configured());
    assert_eq!(cipher.encrypt("sensitive"), "sensitive");
    assert_eq!(cipher.decrypt("sensitive"), "sensitive");
}

#[test]
fn test_decrypt_never_throws_on_malformed_input() {
    let cipher = FieldCipher::new(TEST_KEY);

    // Not base64 at all.
    assert_eq!(cipher.decrypt("not encrypted at all!"), "not encrypted at all!");
    // Valid base64 but too short to even hold a nonce.
    assert_eq!(cipher.decrypt("aGk="), "aGk=");
}

#[test]
fn test_decrypt_with_wrong_key_returns_stored_value() {
    // Key rotation gone wrong must degrade to showing the raw stored
    // value, never to a 500.
    let cipher_a = FieldCipher::new("key-a");
    let cipher_b = FieldCipher::new("key-b");

    let stored = cipher_a.encrypt("classified note");
    assert_eq!(cipher_b.decrypt(&stored), stored);
}

#[test]
fn test_opt_helpers_map_none_through() {
    let cipher = FieldCipher::new(TEST_KEY);
    assert_eq!(cipher.encrypt_opt(None), None);
    assert_eq!(cipher.decrypt_opt(None), None);

    let stored = cipher.encrypt_opt(Some("note")).unwrap();
    assert_eq!(cipher.decrypt_opt(Some(&stored)), Some("note".to_string()));
}

// --- TOTP ---

// RFC 6238 test secret "12345678901234567890" in base32.
const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

#[test]
fn test_totp_known_vector() {
    // RFC 6238 Appendix B: T=59s with the SHA-1 test key yields 94287082;
    // the 6-digit truncation is 287082.
    assert_eq!(totp::code_at(RFC_SECRET, 59), Some("287082".to_string()));
    assert!(totp::verify_at(RFC_SECRET, "287082", 59));
}

#[test]
fn test_totp_accepts_adjacent_steps() {
    // One step of clock skew either way is tolerated.
    let code = totp::code_at(RFC_SECRET, 1_000_000).unwrap();
    assert!(totp::verify_at(RFC_SECRET, &code, 1_000_000));
    assert!(totp::verify_at(RFC_SECRET, &code, 1_000_000 + 30));
    assert!(totp::verify_at(RFC_SECRET, &code, 1_000_000 - 30));
}

#[test]
fn test_totp_rejects_stale_code() {
    let code = totp::code_at(RFC_SECRET, 1_000_000).unwrap();
    assert!(!totp::verify_at(RFC_SECRET, &code, 1_000_000 + 90));
}

#[test]
fn test_totp_rejects_malformed_codes() {
    // Fail closed: anything that is not exactly six ASCII digits is a
    // plain rejection, never a parse error.
    assert!(!totp::verify_at(RFC_SECRET, "", 59));
    assert!(!totp::verify_at(RFC_SECRET, "12345", 59));
    assert!(!totp::verify_at(RFC_SECRET, "1234567", 59));
    assert!(!totp::verify_at(RFC_SECRET, "abcdef", 59));
    assert!(!totp::verify_at(RFC_SECRET, "28708٢", 59));
}

#[test]
fn test_totp_rejects_invalid_secret() {
    assert!(!totp::verify_at("not-valid-base32!!!", "287082", 59));
}

#[test]
fn test_generated_secret_round_trips() {
    let secret = totp::generate_secret();
    assert!(!secret.is_empty());

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let code = totp::code_at(&secret, now).unwrap();
    assert_eq!(code.len(), 6);
    assert!(totp::verify(&secret, &code));
}

#[test]
fn test_otpauth_url_contains_account_and_secret() {
    let url = totp::otpauth_url("jdoe", RFC_SECRET);
    assert!(url.starts_with("otpauth://totp/"));
    assert!(url.contains("jdoe"));
    assert!(url.contains(RFC_SECRET));
    assert!(url.contains("digits=6"));
    assert!(url.contains("period=30"));
}

// --- Password Hashing ---

#[test]
fn test_password_hash_and_verify() {
    let hash = password::hash_password("correct horse battery staple").unwrap();
    assert_ne!(hash, "correct horse battery staple");
    assert!(password::verify_password("correct horse battery staple", &hash));
    assert!(!password::verify_password("wrong password", &hash));
}

#[test]
fn test_verify_fails_closed_on_garbage_hash() {
    assert!(!password::verify_password("anything", "not-a-phc-string"));
    assert!(!password::verify_password("anything", ""));
}
