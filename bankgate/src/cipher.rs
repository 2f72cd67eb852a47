//! Symmetric cipher protecting virtual-account payloads.
//!
//! The bank's scheme is a keyed additive stream over 7-bit ASCII applied twice
//! (client id, then secret key), wrapped in URL-safe Base64. The plaintext is
//! prefixed with the reversed decimal Unix time of sealing and a `.`; on
//! decrypt that timestamp must lie within [`REPLAY_WINDOW_SECS`] of the local
//! clock.
//!
//! ```rust
//! use bankgate::cipher;
//!
//! let sealed = cipher::encrypt(r#"{"trx_id":"1"}"#, "001", "secret").unwrap();
//! let opened = cipher::decrypt(&sealed, "001", "secret").unwrap();
//! assert_eq!(opened, r#"{"trx_id":"1"}"#);
//! ```

use base64::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CipherError, RequestError};
use crate::timestamp::UnixTimestamp;

/// Maximum distance, in seconds, between the sealing time and the local clock.
pub const REPLAY_WINDOW_SECS: u64 = 480;

#[derive(Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

/// Encrypts `plaintext` with the key pair, stamped with the current time.
///
/// # Errors
///
/// Returns [`CipherError::NonAscii`] for plaintext outside 7-bit ASCII and
/// [`CipherError::InvalidKey`] for an empty or non-ASCII key.
pub fn encrypt(plaintext: &str, key_a: &str, key_b: &str) -> Result<String, CipherError> {
    encrypt_at(plaintext, key_a, key_b, UnixTimestamp::now())
}

/// Encrypts `plaintext` as if sealed at `at`.
///
/// # Errors
///
/// See [`encrypt`].
pub fn encrypt_at(
    plaintext: &str,
    key_a: &str,
    key_b: &str,
    at: UnixTimestamp,
) -> Result<String, CipherError> {
    check_key(key_a)?;
    check_key(key_b)?;
    if let Some(position) = plaintext.bytes().position(|b| !b.is_ascii()) {
        return Err(CipherError::NonAscii { position });
    }

    let stamp: String = at.to_string().chars().rev().collect();
    let sealed = format!("{stamp}.{plaintext}");
    let once = transform(sealed.as_bytes(), key_a.as_bytes(), Direction::Encode);
    let twice = transform(&once, key_b.as_bytes(), Direction::Encode);
    Ok(BASE64_URL_SAFE_NO_PAD.encode(twice))
}

/// Decrypts `encoded` with the key pair against the current time.
///
/// # Errors
///
/// Returns [`CipherError::ReplayOrFormat`] for malformed input, wrong keys or
/// a timestamp outside the replay window.
pub fn decrypt(encoded: &str, key_a: &str, key_b: &str) -> Result<String, CipherError> {
    decrypt_at(encoded, key_a, key_b, UnixTimestamp::now())
}

/// Decrypts `encoded`, validating the embedded timestamp against `now`.
///
/// # Errors
///
/// See [`decrypt`].
pub fn decrypt_at(
    encoded: &str,
    key_a: &str,
    key_b: &str,
    now: UnixTimestamp,
) -> Result<String, CipherError> {
    check_key(key_a)?;
    check_key(key_b)?;

    let mut standard: String = encoded
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }
    let bytes = BASE64_STANDARD
        .decode(standard)
        .map_err(|_| CipherError::ReplayOrFormat)?;

    let once = transform(&bytes, key_a.as_bytes(), Direction::Decode);
    let twice = transform(&once, key_b.as_bytes(), Direction::Decode);
    let text = String::from_utf8(twice).map_err(|_| CipherError::ReplayOrFormat)?;

    let (stamp, plaintext) = text.split_once('.').ok_or(CipherError::ReplayOrFormat)?;
    let sealed_at: u64 = stamp
        .chars()
        .rev()
        .collect::<String>()
        .parse()
        .map_err(|_| CipherError::ReplayOrFormat)?;
    if now.abs_diff(UnixTimestamp::from_secs(sealed_at)) > REPLAY_WINDOW_SECS {
        #[cfg(feature = "telemetry")]
        tracing::debug!(sealed_at, now = %now, "ciphertext outside replay window");
        return Err(CipherError::ReplayOrFormat);
    }
    Ok(plaintext.to_owned())
}

/// JSON-encodes `payload` and encrypts it.
///
/// # Errors
///
/// Returns [`RequestError::Serialize`] if the payload cannot be encoded and
/// [`RequestError::Cipher`] if encryption fails (see [`encrypt`]).
pub fn encrypt_payload<T: Serialize + ?Sized>(
    payload: &T,
    key_a: &str,
    key_b: &str,
) -> Result<String, RequestError> {
    let json = serde_json::to_string(payload)?;
    Ok(encrypt(&json, key_a, key_b)?)
}

/// Decrypts `encoded` and parses the plaintext as JSON.
///
/// # Errors
///
/// Returns [`CipherError::ReplayOrFormat`] when decryption fails or the
/// plaintext is not JSON.
pub fn decrypt_payload(encoded: &str, key_a: &str, key_b: &str) -> Result<Value, CipherError> {
    let plaintext = decrypt(encoded, key_a, key_b)?;
    serde_json::from_str(&plaintext).map_err(|_| CipherError::ReplayOrFormat)
}

fn check_key(key: &str) -> Result<(), CipherError> {
    if key.is_empty() || !key.is_ascii() {
        return Err(CipherError::InvalidKey);
    }
    Ok(())
}

/// One additive pass. Position `i` uses the key byte one step behind `i` in
/// the cyclic key, so position 0 pairs with the last key byte.
#[allow(clippy::cast_possible_truncation)]
fn transform(input: &[u8], key: &[u8], direction: Direction) -> Vec<u8> {
    let len = key.len();
    input
        .iter()
        .enumerate()
        .map(|(i, &byte)| {
            let key_byte = u16::from(key[(i % len + len - 1) % len]);
            let byte = u16::from(byte);
            let out = match direction {
                Direction::Encode => (byte + key_byte) % 128,
                Direction::Decode => (byte + 256 - key_byte) % 128,
            };
            out as u8
        })
        .collect()
}
