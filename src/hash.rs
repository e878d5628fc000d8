//! Hash primitive and key equality for byte-string keys.
//!
//! The table hashes with Jenkins' one-at-a-time function: every byte is
//! accumulated with a shift/add/xor step, then a fixed avalanche sequence
//! spreads the bits. It is deterministic and unseeded, so it offers no
//! protection against crafted collisions.
//!
//! Bytes are added as unsigned values (0..=255). Implementations that read
//! keys through a signed `char` sign-extend bytes >= 0x80 and so place
//! those keys in different buckets; this module follows the canonical
//! unsigned definition.

use core::hash::{BuildHasher, Hasher};

/// Per-byte accumulate step.
#[inline]
const fn mix(mut hash: u32, byte: u8) -> u32 {
    hash = hash.wrapping_add(byte as u32);
    hash = hash.wrapping_add(hash << 10);
    hash ^ (hash >> 6)
}

/// Final avalanche applied once all bytes are in.
#[inline]
const fn avalanche(mut hash: u32) -> u32 {
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Jenkins one-at-a-time hash of `key`.
pub fn jenkins_hash(key: &[u8]) -> u32 {
    let mut hash = 0u32;
    for &b in key {
        hash = mix(hash, b);
    }
    avalanche(hash)
}

/// Two keys are equal iff they have the same length and the same bytes.
#[inline]
pub fn key_equals(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a == b
}

/// Streaming form of [`jenkins_hash`].
///
/// `write` only runs the accumulate step, `finish` applies the avalanche to
/// a copy of the state, so feeding a key through one `write` yields exactly
/// `jenkins_hash(key)` zero-extended to `u64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JenkinsHasher {
    state: u32,
}

impl Hasher for JenkinsHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = mix(self.state, b);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        avalanche(self.state) as u64
    }
}

/// Builds [`JenkinsHasher`]s. Stateless; every hasher starts from zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct JenkinsState;

impl BuildHasher for JenkinsState {
    type Hasher = JenkinsHasher;

    #[inline]
    fn build_hasher(&self) -> JenkinsHasher {
        JenkinsHasher::default()
    }
}
