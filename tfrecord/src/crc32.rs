// Copyright 2011, The Snappy-Rust Authors. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above
// copyright notice, this list of conditions and the following disclaimer
// in the documentation and/or other materials provided with the
// distribution.
//     * Neither the name of the copyright holder nor the names of its
// contributors may be used to endorse or promote products derived from
// this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::crc32c_table::{TABLE, TABLE16};

/// Delta added after rotating a checksum. Rotating and adding makes the
/// stored checksum robust against data that itself contains checksums.
const MASK_DELTA: u32 = 0xa282_ead8;

/// Computes CRC32C (Castagnoli) checksums and their masked form, as stored
/// in TFRecord frames.
///
/// When available, SSE 4.2 is used to compute checksums. Otherwise, the
/// checksummer falls back to the "slicing by 16" technique. The type caches
/// the CPU feature check.
#[derive(Clone, Copy, Debug)]
pub struct Checksummer {
    sse42: bool,
}

impl Default for Checksummer {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksummer {
    /// Create a checksummer for arbitrary bytes.
    #[cfg(not(target_arch = "x86_64"))]
    pub fn new() -> Self {
        Checksummer { sse42: false }
    }

    /// Create a checksummer for arbitrary bytes.
    #[cfg(target_arch = "x86_64")]
    pub fn new() -> Self {
        Checksummer {
            sse42: is_x86_feature_detected!("sse4.2"),
        }
    }

    /// Returns the masked CRC32C checksum of `buf`.
    pub fn crc32c_masked(&self, buf: &[u8]) -> u32 {
        mask(self.crc32c(buf))
    }

    /// Returns the CRC32C checksum of `buf`.
    #[cfg(not(target_arch = "x86_64"))]
    pub fn crc32c(&self, buf: &[u8]) -> u32 {
        crc32c_slice16(buf)
    }

    /// Returns the CRC32C checksum of `buf`.
    #[cfg(target_arch = "x86_64")]
    pub fn crc32c(&self, buf: &[u8]) -> u32 {
        if self.sse42 {
            // SAFETY: sse42 is only true on CPUs that support SSE 4.2.
            unsafe { crc32c_sse(buf) }
        } else {
            crc32c_slice16(buf)
        }
    }
}

/// Mask a CRC32C checksum: rotate right by 15 bits and add a constant.
pub fn mask(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Inverse of [`mask`].
pub fn unmask(masked: u32) -> u32 {
    masked.wrapping_sub(MASK_DELTA).rotate_left(15)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn crc32c_sse(buf: &[u8]) -> u32 {
    use std::arch::x86_64::*;

    let mut crc = !0u32;
    // SAFETY: align_to handles alignment and 8 adjacent u8's have the
    // same in-memory representation as an u64 for all values.
    let (prefix, u64s, suffix) = buf.align_to::<u64>();
    for &b in prefix {
        crc = _mm_crc32_u8(crc, b);
    }
    for &n in u64s {
        crc = _mm_crc32_u64(crc as u64, n) as u32;
    }
    for &b in suffix {
        crc = _mm_crc32_u8(crc, b);
    }
    !crc
}

fn crc32c_slice16(mut buf: &[u8]) -> u32 {
    let mut crc: u32 = !0;
    while buf.len() >= 16 {
        crc ^= read_u32_le(buf);
        crc = TABLE16[0][buf[15] as usize]
            ^ TABLE16[1][buf[14] as usize]
            ^ TABLE16[2][buf[13] as usize]
            ^ TABLE16[3][buf[12] as usize]
            ^ TABLE16[4][buf[11] as usize]
            ^ TABLE16[5][buf[10] as usize]
            ^ TABLE16[6][buf[9] as usize]
            ^ TABLE16[7][buf[8] as usize]
            ^ TABLE16[8][buf[7] as usize]
            ^ TABLE16[9][buf[6] as usize]
            ^ TABLE16[10][buf[5] as usize]
            ^ TABLE16[11][buf[4] as usize]
            ^ TABLE16[12][(crc >> 24) as u8 as usize]
            ^ TABLE16[13][(crc >> 16) as u8 as usize]
            ^ TABLE16[14][(crc >> 8) as u8 as usize]
            ^ TABLE16[15][(crc) as u8 as usize];
        buf = &buf[16..];
    }
    for &b in buf {
        crc = TABLE[((crc as u8) ^ b) as usize] ^ (crc >> 8);
    }
    !crc
}

/// Read a little endian u32 from the first four bytes of `slice`.
///
/// Callers guarantee that `slice` holds at least four bytes.
pub(crate) fn read_u32_le(slice: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&slice[..4]);
    u32::from_le_bytes(bytes)
}
