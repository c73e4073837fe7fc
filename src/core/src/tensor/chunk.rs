// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use internal_error::{InternalError, ResultIntoInternal};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Contiguous run of samples stored as a single object.
///
/// Layout: `u32` sample count, then one `u64` length per sample, then the
/// sample payloads back to back. All integers are little-endian.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    samples: Vec<Bytes>,
    num_bytes: u64,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Bytes) {
        self.num_bytes += sample.len() as u64;
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total size of sample payloads
    pub fn num_bytes(&self) -> u64 {
        self.num_bytes
    }

    pub fn get(&self, i: usize) -> Option<&Bytes> {
        self.samples.get(i)
    }

    pub fn samples(&self) -> &[Bytes] {
        &self.samples
    }

    pub fn encode(&self) -> Result<Bytes, InternalError> {
        let header = 4 + 8 * self.samples.len();
        let mut buf = BytesMut::with_capacity(header + usize::try_from(self.num_bytes).int_err()?);

        buf.put_u32_le(u32::try_from(self.samples.len()).int_err()?);
        for sample in &self.samples {
            buf.put_u64_le(sample.len() as u64);
        }
        for sample in &self.samples {
            buf.put_slice(sample);
        }

        Ok(buf.freeze())
    }

    /// Decodes a chunk. Samples share the memory of `data`.
    pub fn decode(data: Bytes) -> Result<Self, InternalError> {
        let mut header = data.clone();

        if header.remaining() < 4 {
            return InternalError::bail("Chunk is truncated: missing sample count");
        }
        let count = header.get_u32_le() as usize;

        if header.remaining() / 8 < count {
            return InternalError::bail("Chunk is truncated: missing sample lengths");
        }
        let mut lengths = Vec::with_capacity(count);
        for _ in 0..count {
            lengths.push(usize::try_from(header.get_u64_le()).int_err()?);
        }

        let mut offset = data.len() - header.remaining();
        let mut chunk = Self::new();
        for len in lengths {
            let Some(end) = offset.checked_add(len).filter(|end| *end <= data.len()) else {
                return InternalError::bail("Chunk is truncated: missing sample data");
            };
            chunk.push(data.slice(offset..end));
            offset = end;
        }

        Ok(chunk)
    }
}
