// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Input chunk aggregation.
//!
//! Incoming chunks are kept both as the original tendrils and as one
//! flat window the scanner can index freely. When tokens are consumed
//! the flat window is rebuilt from the surviving tail, so a token split
//! across any number of writes is always contiguous by the time it is
//! rescanned.

use std::collections::VecDeque;

use tendril::ByteTendril;

/// Buffered, not-yet-consumed stream bytes.
#[derive(Debug, Default)]
pub struct BufferAggregate {
    chunks: VecDeque<ByteTendril>,
    flat: ByteTendril,
}

impl BufferAggregate {
    /// An empty buffer.
    pub fn new() -> BufferAggregate {
        BufferAggregate {
            chunks: VecDeque::new(),
            flat: ByteTendril::new(),
        }
    }

    /// Append one chunk of input.
    pub fn write(&mut self, data: &[u8]) {
        self.flat.push_slice(data);
        self.chunks.push_back(ByteTendril::from_slice(data));
    }

    /// The contiguous window of all unconsumed bytes.
    pub fn view(&self) -> &[u8] {
        &self.flat
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Drop the first `offset` bytes; they have been consumed as
    /// complete tokens. Whole chunks are released, a partially consumed
    /// chunk is kept as a sub-tendril of itself.
    pub fn clear(&mut self, offset: usize) {
        if offset == 0 {
            return;
        }
        let mut remaining = offset as u32;
        while remaining > 0 {
            let chunk_len = match self.chunks.front() {
                Some(chunk) => chunk.len32(),
                None => break,
            };
            if chunk_len <= remaining {
                self.chunks.pop_front();
                remaining -= chunk_len;
            } else {
                let head = self.chunks.front_mut();
                if let Some(head) = head {
                    *head = head.subtendril(remaining, chunk_len - remaining);
                }
                remaining = 0;
            }
        }
        self.flat = ByteTendril::new();
        for chunk in &self.chunks {
            self.flat.push_tendril(chunk);
        }
    }

    /// Drop everything.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.flat = ByteTendril::new();
    }
}

#[cfg(test)]
mod test {
    use super::BufferAggregate;

    #[test]
    fn writes_flatten() {
        let mut buf = BufferAggregate::new();
        buf.write(b"<iq");
        buf.write(b" id=");
        buf.write(b"'1'/>");
        assert_eq!(buf.view(), b"<iq id='1'/>");
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn clear_whole_chunks() {
        let mut buf = BufferAggregate::new();
        buf.write(b"abc");
        buf.write(b"def");
        buf.clear(3);
        assert_eq!(buf.view(), b"def");
    }

    #[test]
    fn clear_mid_chunk() {
        let mut buf = BufferAggregate::new();
        buf.write(b"abcdef");
        buf.write(b"ghi");
        buf.clear(4);
        assert_eq!(buf.view(), b"efghi");
        buf.clear(5);
        assert!(buf.is_empty());
    }

    #[test]
    fn clear_zero_is_noop() {
        let mut buf = BufferAggregate::new();
        buf.write(b"xyz");
        buf.clear(0);
        assert_eq!(buf.view(), b"xyz");
    }

    #[test]
    fn reset_empties() {
        let mut buf = BufferAggregate::new();
        buf.write(b"leftover");
        buf.reset();
        assert!(buf.is_empty());
        buf.write(b"fresh");
        assert_eq!(buf.view(), b"fresh");
    }
}
