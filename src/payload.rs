//! Incompressible payload generation for the download test.
//!
//! [`RandomPayload`] is a pull-based iterator: a chunk is only generated when the
//! consumer asks for the next one, so a slow reader slows generation down and a
//! reader that goes away stops it. Content comes from a ChaCha-based CSPRNG
//! seeded from the operating system, which keeps transport compression from
//! inflating the measured throughput.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use bytes::{Bytes, BytesMut};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Upper bound on the size of a single emitted chunk (1 MiB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// A finite, single-use sequence of random chunks totalling an exact length.
pub struct RandomPayload {
    rng: StdRng,
    remaining: u64,
    chunk_size: usize,
}

impl RandomPayload {
    /// Prepares a payload of `total_len` bytes split into chunks of at most
    /// `chunk_size` bytes. The chunk size is clamped to `1..=MAX_CHUNK_SIZE`.
    ///
    /// Fails only when the OS entropy source cannot seed the generator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use speedscan::payload::RandomPayload;
    /// let payload = RandomPayload::new(2_500_000, 1024 * 1024).unwrap();
    /// let sizes: Vec<usize> = payload.map(|chunk| chunk.len()).collect();
    /// assert_eq!(sizes, vec![1_048_576, 1_048_576, 402_848]);
    /// ```
    pub fn new(total_len: u64, chunk_size: usize) -> Result<Self, rand::Error> {
        let rng = StdRng::from_rng(OsRng)?;
        Ok(Self {
            rng,
            remaining: total_len,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        })
    }

    /// Bytes not yet emitted.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for RandomPayload {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining == 0 {
            return None;
        }

        let len = self.remaining.min(self.chunk_size as u64) as usize;
        let mut chunk = BytesMut::zeroed(len);
        self.rng.fill_bytes(&mut chunk);
        self.remaining -= len as u64;

        Some(chunk.freeze())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.div_ceil(self.chunk_size as u64);
        let chunks = usize::try_from(chunks).unwrap_or(usize::MAX);
        (chunks, Some(chunks))
    }
}
