//! Content-derived identity for xref records.
//!
//! Identities must survive rebuilds, so they are computed from what a
//! record says about itself rather than from where it sits in the binary:
//! the tail of the origin file path, the hash input text, and two
//! auxiliary hash words emitted per call site. The identity slot stored
//! in the binary is always zero and never participates.

use sha2::{Digest, Sha256};

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Compute the printable identity token for one record.
///
/// Only the last two path components participate, so relocating a source
/// tree does not change identities. The auxiliary words disambiguate the
/// same literal text used at different call sites.
pub fn uidhash(file: &str, hashstr: &str, hashu32a: u32, hashu32b: u32) -> String {
    let tail = path_tail(file);

    let mut hasher = Sha256::new();
    hasher.update(tail.as_bytes());
    hasher.update(b"\n");
    hasher.update(hashstr.as_bytes());
    hasher.update(hashu32a.to_be_bytes());
    hasher.update(hashu32b.to_be_bytes());

    base32c(&hasher.finalize())
}

/// Last two `/`-separated components of a path.
fn path_tail(file: &str) -> String {
    let mut parts: Vec<&str> = file.rsplit('/').take(2).collect();
    parts.reverse();
    parts.join("/")
}

/// Ten digest characters in 5-bit groups behind a marker bit, with a dash
/// after the fifth.
fn base32c(digest: &[u8]) -> String {
    let mut out = String::with_capacity(11);
    let mut acc: u64 = 1;
    let mut bits: u32 = 1;
    let mut emitted = 0;

    for &byte in digest {
        acc = (acc << 8) | u64::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
            acc &= (1 << bits) - 1;
            emitted += 1;
            match emitted {
                5 => out.push('-'),
                10 => return out,
                _ => {}
            }
        }
    }
    out
}
