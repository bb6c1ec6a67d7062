/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use bytes::{Buf, Bytes};

use super::UploadSource;

/// Upload source over data fully known in advance.
#[derive(Clone, Debug, Default)]
pub struct BytesUploadSource {
    data: Bytes,
}

impl BytesUploadSource {
    pub fn new(data: Bytes) -> Self {
        BytesUploadSource { data }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len()
    }
}

impl From<Vec<u8>> for BytesUploadSource {
    fn from(value: Vec<u8>) -> Self {
        BytesUploadSource::new(Bytes::from(value))
    }
}

impl UploadSource for BytesUploadSource {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if self.data.is_empty() {
            return Ok(None);
        }
        let len = buf.len().min(self.data.len());
        buf[..len].copy_from_slice(&self.data[..len]);
        Ok(Some(len))
    }

    fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.data.len());
        self.data.advance(n);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_then_skip() {
        let mut source = BytesUploadSource::new(Bytes::from_static(b"abcdef"));
        let mut buf = [0u8; 4];
        assert_eq!(source.peek(&mut buf).unwrap(), Some(4));
        assert_eq!(&buf, b"abcd");
        // peek again without skip returns the same bytes
        assert_eq!(source.peek(&mut buf).unwrap(), Some(4));
        assert_eq!(&buf, b"abcd");

        assert_eq!(source.skip(3), 3);
        assert_eq!(source.peek(&mut buf).unwrap(), Some(3));
        assert_eq!(&buf[..3], b"def");
        assert_eq!(source.skip(10), 3);
        assert_eq!(source.peek(&mut buf).unwrap(), None);
        assert_eq!(source.remaining(), 0);
    }
}
