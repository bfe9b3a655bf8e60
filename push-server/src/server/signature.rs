//! Push request signature verification.
//!
//! The platform signs every request it sends to the configured URL:
//! - `token`: shared secret configured on both sides (never sent)
//! - `timestamp`, `nonce`: query parameters
//! - `signature`: lowercase hex SHA-1 of the three values sorted
//!   lexicographically and concatenated without a separator

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Capacity of the signature scratch buffer in each pooled unit.
pub const SIGNATURE_BUF_CAPACITY: usize = 128;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Verify a push request signature.
///
/// `scratch` receives the concatenated input so no buffer is allocated per
/// request. It is cleared first and grows if the inputs exceed its capacity.
///
/// # Returns
///
/// `true` only if `signature` equals the computed digest exactly.
pub fn verify_signature(
    signature: &str,
    timestamp: &str,
    nonce: &str,
    token: &str,
    scratch: &mut Vec<u8>,
) -> bool {
    let expected = compute_signature(timestamp, nonce, token, scratch);

    // Constant-time over the digest; a length mismatch fails immediately
    let valid: bool = expected[..].ct_eq(signature.as_bytes()).into();

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "push_signature_mismatch"
        );
    }

    valid
}

/// Compute the lowercase hex signature for the given inputs.
pub fn compute_signature(
    timestamp: &str,
    nonce: &str,
    token: &str,
    scratch: &mut Vec<u8>,
) -> [u8; 40] {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();

    scratch.clear();
    for part in parts {
        scratch.extend_from_slice(part.as_bytes());
    }

    let digest = Sha1::digest(scratch.as_slice());

    let mut hex_digest = [0u8; 40];
    for (pair, &byte) in hex_digest.chunks_exact_mut(2).zip(digest.iter()) {
        pair[0] = HEX_DIGITS[usize::from(byte >> 4)];
        pair[1] = HEX_DIGITS[usize::from(byte & 0x0f)];
    }
    hex_digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> Vec<u8> {
        Vec::with_capacity(SIGNATURE_BUF_CAPACITY)
    }

    fn sign(timestamp: &str, nonce: &str, token: &str) -> String {
        let digest = compute_signature(timestamp, nonce, token, &mut scratch());
        String::from_utf8(digest.to_vec()).unwrap()
    }

    #[test]
    fn test_known_vector() {
        // sha1("1409304348" + "qwertyuiop" + "zxcvbnm"), sorted order
        let mut buf = scratch();
        let expected = {
            let digest = Sha1::digest(b"1409304348qwertyuiopzxcvbnm");
            hex::encode(digest)
        };

        assert_eq!(sign("1409304348", "zxcvbnm", "qwertyuiop"), expected);
        assert!(verify_signature(
            &expected,
            "1409304348",
            "zxcvbnm",
            "qwertyuiop",
            &mut buf
        ));
        assert_eq!(buf, b"1409304348qwertyuiopzxcvbnm");
    }

    #[test]
    fn test_digest_is_lowercase_hex_of_sha1() {
        let inputs = [("", "", ""), ("0", "\u{ff}", "z"), ("1700000000", "nonce", "secret")];

        for (timestamp, nonce, token) in inputs {
            let mut parts = [token, timestamp, nonce];
            parts.sort_unstable();
            let expected = hex::encode(Sha1::digest(parts.concat().as_bytes()));

            assert_eq!(sign(timestamp, nonce, token), expected);
        }

        // sha1("") starts with 0xda, 0x39 and ends with 0x09
        let empty = sign("", "", "");
        assert!(empty.starts_with("da39"));
        assert!(empty.ends_with("09"));
    }

    #[test]
    fn test_digest_ignores_argument_order() {
        let a = sign("123", "abc", "token");
        let b = sign("abc", "token", "123");
        let c = sign("token", "123", "abc");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let (timestamp, nonce, token) = ("1700000000", "nonce42", "secret");
        let signature = sign(timestamp, nonce, token);
        let mut buf = scratch();

        assert!(verify_signature(&signature, timestamp, nonce, token, &mut buf));

        let mut bad_sig = signature.clone().into_bytes();
        bad_sig[10] = if bad_sig[10] == b'a' { b'b' } else { b'a' };
        let bad_sig = String::from_utf8(bad_sig).unwrap();
        assert!(!verify_signature(&bad_sig, timestamp, nonce, token, &mut buf));

        assert!(!verify_signature(&signature, "1700000001", nonce, token, &mut buf));
        assert!(!verify_signature(&signature, timestamp, "nonce43", token, &mut buf));
        assert!(!verify_signature(&signature, timestamp, nonce, "secreT", &mut buf));
    }

    #[test]
    fn test_length_mismatch_fails() {
        let signature = sign("1", "2", "3");
        let mut buf = scratch();

        assert!(!verify_signature(&signature[..39], "1", "2", "3", &mut buf));
        assert!(!verify_signature(&format!("{signature}0"), "1", "2", "3", &mut buf));
        assert!(!verify_signature("", "1", "2", "3", &mut buf));
    }

    #[test]
    fn test_upper_case_signature_fails() {
        let signature = sign("1", "2", "3").to_uppercase();
        assert!(!verify_signature(&signature, "1", "2", "3", &mut scratch()));
    }

    #[test]
    fn test_scratch_grows_for_long_inputs() {
        let long_nonce = "n".repeat(SIGNATURE_BUF_CAPACITY * 2);
        let signature = sign("1", &long_nonce, "t");
        let mut buf = scratch();

        assert!(verify_signature(&signature, "1", &long_nonce, "t", &mut buf));
        assert_eq!(buf.len(), long_nonce.len() + 2);
    }
}
