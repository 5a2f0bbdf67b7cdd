// SPDX-License-Identifier: MIT OR Apache-2.0
//! Order-sensitive structural checksum.
//!
//! Used to tell whether an artifact derived from some data (a group layout,
//! a cached report) is stale without keeping the data around for a full
//! comparison. The hash is 64-bit FNV-1a over a canonical byte encoding, so
//! the same sequence of additions always yields the same checksum on every
//! platform.

use serde::{Deserialize, Serialize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Streaming checksum accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    hash: u64,
    length: u64,
}

impl Checksum {
    /// Create an empty checksum
    pub fn new() -> Self {
        Self {
            hash: FNV_OFFSET,
            length: 0,
        }
    }

    fn add_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash ^= u64::from(*byte);
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
        self.length += bytes.len() as u64;
    }

    /// Add a boolean
    pub fn add_bool(&mut self, value: bool) {
        self.add_bytes(&[u8::from(value)]);
    }

    /// Add a signed integer
    pub fn add_i32(&mut self, value: i32) {
        self.add_bytes(&value.to_le_bytes());
    }

    /// Add an unsigned integer
    pub fn add_u64(&mut self, value: u64) {
        self.add_bytes(&value.to_le_bytes());
    }

    /// Add a float by its bit pattern
    pub fn add_f64(&mut self, value: f64) {
        self.add_bytes(&value.to_bits().to_le_bytes());
    }

    /// Add a string; the length goes in first so `"ab" + "c"` differs from `"a" + "bc"`.
    pub fn add_str(&mut self, value: &str) {
        self.add_u64(value.len() as u64);
        self.add_bytes(value.as_bytes());
    }

    /// Add raw identity bytes
    pub fn add_raw(&mut self, bytes: &[u8]) {
        self.add_bytes(bytes);
    }

    /// Final 64-bit digest
    pub fn value(&self) -> u64 {
        self.hash
    }

    /// Number of bytes fed so far
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether nothing has been added
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}
