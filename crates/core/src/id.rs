//! Short record ids and export bearer tokens.
//!
//! Record ids are 8 characters from a 62-symbol alphanumeric alphabet,
//! which keeps them short enough to show inline in Slack messages while
//! leaving collisions negligible at personal-productivity scale. Export
//! tokens are 32 random bytes rendered as 64 lowercase hex characters.

use std::fmt::Write as _;

use rand::rngs::OsRng;
use rand::RngCore;

const ID_ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 8;
const EXPORT_TOKEN_BYTES: usize = 32;

pub fn new_record_id() -> String {
    let mut bytes = [0u8; ID_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char).collect()
}

pub fn new_export_token() -> String {
    let mut bytes = [0u8; EXPORT_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(EXPORT_TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
