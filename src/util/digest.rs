use sha1::{Digest, Sha1};

use crate::common::HashBytes;

/// Hashes a byte slice with SHA-1.
pub fn sha1_hash(buf: &[u8]) -> HashBytes { HashBytes::from(Sha1::digest(buf)) }
