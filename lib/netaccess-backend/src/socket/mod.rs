/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use netaccess_io::PumpSink;

mod buffered;

pub use buffered::{BufferedSocket, SocketState};

/// The socket seen by a backend.
///
/// All calls return immediately, readiness is reported back through
/// socket events.
pub trait TransportSocket: PumpSink {
    fn connect_to_host(&mut self, host: &str, port: u16);

    /// Bound of the read buffer, 0 for unlimited.
    fn set_read_buffer_size(&mut self, size: usize);

    /// `None` at end of stream, `Some(0)` if no data is buffered yet.
    fn read(&mut self, buf: &mut [u8]) -> Option<usize>;

    fn bytes_available(&self) -> usize;

    /// Stop reading, queued outbound bytes are still flushed.
    fn close(&mut self);
}
