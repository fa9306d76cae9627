// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds-checked read cursor over a byte slice, used only by the verifier.

use crate::error::StepsError;

/// Sequential reader over a borrowed byte slice.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn read_u8(&mut self) -> Result<u8, StepsError> {
        let byte = *self.buffer.get(self.offset).ok_or(StepsError::PayloadTruncated {
            offset: self.offset + 1,
            len: self.buffer.len(),
        })?;
        self.offset += 1;
        Ok(byte)
    }

    /// Advance the cursor by `count` bytes without copying them out.
    pub fn skip(&mut self, count: usize) -> Result<(), StepsError> {
        let new_offset = self.offset + count;
        if new_offset > self.buffer.len() {
            return Err(StepsError::PayloadTruncated {
                offset: new_offset,
                len: self.buffer.len(),
            });
        }
        self.offset = new_offset;
        Ok(())
    }
}
