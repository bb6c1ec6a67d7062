/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use tokio::sync::Notify;

mod channel;
mod memory;

pub use channel::{ChannelUploadSource, UploadSender, upload_channel};
pub use memory::BytesUploadSource;

/// A byte source read with peek/skip semantics.
///
/// Bytes returned by `peek` stay in the source until they are skipped, so a
/// short or failed write never loses data.
pub trait UploadSource: Send {
    /// Copy upcoming bytes into `buf` without consuming them.
    ///
    /// `None` means end of stream, `Some(0)` means no data is available now.
    /// An error ends the stream without a clean end.
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Consume up to `n` bytes, returning the number consumed.
    fn skip(&mut self, n: usize) -> usize;

    /// Notified when more data or the end of stream becomes available.
    fn ready_notify(&self) -> Option<Arc<Notify>> {
        None
    }
}

impl<T: UploadSource + ?Sized> UploadSource for Box<T> {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        (**self).peek(buf)
    }

    fn skip(&mut self, n: usize) -> usize {
        (**self).skip(n)
    }

    fn ready_notify(&self) -> Option<Arc<Notify>> {
        (**self).ready_notify()
    }
}
