//! Merkle root over a set of hex file digests.
//!
//! Leaves are sorted first, so the root depends only on the multiset of
//! hashes and not on enumeration order. Interior nodes hash the UTF-8 bytes of
//! the two child hex strings concatenated; an odd node is paired with itself.

use crate::digest::Digest;

/// Root for `hashes`. The empty set hashes to SHA-256 of empty input.
pub fn merkle_root<S: AsRef<str>>(hashes: &[S]) -> String {
    let mut level: Vec<String> = hashes.iter().map(|h| h.as_ref().to_string()).collect();
    if level.is_empty() {
        return Digest::compute(b"").to_hex();
    }
    level.sort();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                let mut combined = String::with_capacity(left.len() + right.len());
                combined.push_str(left);
                combined.push_str(right);
                Digest::compute(combined.as_bytes()).to_hex()
            })
            .collect();
    }

    level.swap_remove(0)
}
