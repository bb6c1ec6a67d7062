/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use bytes::{Buf, BytesMut};

use netaccess_io::PumpSink;
use netaccess_types::net::SocketError;

use super::TransportSocket;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocketState {
    Unconnected,
    Connecting,
    Connected,
    /// closed by the owner, queued bytes are still to be flushed
    Closing,
    Closed,
}

/// Buffer model of a stream socket.
///
/// It does no io itself. A driver moves bytes between this model and the
/// real socket and turns what happened into socket events.
#[derive(Debug)]
pub struct BufferedSocket {
    state: SocketState,
    peer: Option<(String, u16)>,
    read_buf: BytesMut,
    write_buf: BytesMut,
    read_buffer_size: usize,
    read_eof: bool,
    error: Option<SocketError>,
}

impl Default for BufferedSocket {
    fn default() -> Self {
        BufferedSocket::new()
    }
}

impl BufferedSocket {
    pub fn new() -> Self {
        BufferedSocket {
            state: SocketState::Unconnected,
            peer: None,
            read_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
            read_buffer_size: 0,
            read_eof: false,
            error: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn peer(&self) -> Option<(&str, u16)> {
        self.peer.as_ref().map(|(host, port)| (host.as_str(), *port))
    }

    #[inline]
    pub fn error(&self) -> Option<&SocketError> {
        self.error.as_ref()
    }

    pub fn set_connected(&mut self) {
        if self.state == SocketState::Connecting {
            self.state = SocketState::Connected;
        }
    }

    /// The peer is gone. Queued outbound bytes stay counted.
    pub fn set_disconnected(&mut self) {
        self.state = SocketState::Closed;
    }

    pub fn set_error(&mut self, e: SocketError) {
        self.error = Some(e);
    }

    /// Room left in the read buffer.
    pub fn read_capacity(&self) -> usize {
        if self.read_buffer_size == 0 {
            usize::MAX
        } else {
            self.read_buffer_size.saturating_sub(self.read_buf.len())
        }
    }

    pub fn wants_read(&self) -> bool {
        self.state == SocketState::Connected && !self.read_eof && self.read_capacity() > 0
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.read_buf.extend_from_slice(data);
    }

    pub fn set_read_eof(&mut self) {
        self.read_eof = true;
    }

    #[inline]
    pub fn read_eof(&self) -> bool {
        self.read_eof
    }

    pub fn has_pending_write(&self) -> bool {
        !self.write_buf.is_empty()
            && matches!(self.state, SocketState::Connected | SocketState::Closing)
    }

    #[inline]
    pub fn pending_write(&self) -> &[u8] {
        &self.write_buf
    }

    pub fn consume_written(&mut self, n: usize) {
        let n = n.min(self.write_buf.len());
        self.write_buf.advance(n);
        if self.state == SocketState::Closing && self.write_buf.is_empty() {
            self.state = SocketState::Closed;
        }
    }
}

impl PumpSink for BufferedSocket {
    fn bytes_to_write(&self) -> usize {
        self.write_buf.len()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.state {
            SocketState::Connecting | SocketState::Connected => {
                self.write_buf.extend_from_slice(data);
                Ok(data.len())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "socket is not connected",
            )),
        }
    }
}

impl TransportSocket for BufferedSocket {
    fn connect_to_host(&mut self, host: &str, port: u16) {
        self.peer = Some((host.to_string(), port));
        self.state = SocketState::Connecting;
        self.read_eof = false;
        self.error = None;
    }

    fn set_read_buffer_size(&mut self, size: usize) {
        self.read_buffer_size = size;
    }

    fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        if !self.read_buf.is_empty() {
            let len = buf.len().min(self.read_buf.len());
            buf[..len].copy_from_slice(&self.read_buf[..len]);
            self.read_buf.advance(len);
            return Some(len);
        }
        match self.state {
            SocketState::Connecting | SocketState::Connected if !self.read_eof => Some(0),
            _ => None,
        }
    }

    fn bytes_available(&self) -> usize {
        self.read_buf.len()
    }

    fn close(&mut self) {
        self.read_buf.clear();
        match self.state {
            SocketState::Connected if !self.write_buf.is_empty() => {
                self.state = SocketState::Closing;
            }
            SocketState::Closing => {}
            _ => {
                self.write_buf.clear();
                self.state = SocketState::Closed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_states() {
        let mut socket = BufferedSocket::new();
        let mut buf = [0u8; 4];
        assert_eq!(socket.read(&mut buf), None);

        socket.connect_to_host("localhost", 12345);
        socket.set_read_buffer_size(8);
        assert_eq!(socket.peer(), Some(("localhost", 12345)));
        assert_eq!(socket.read(&mut buf), Some(0));
        assert!(!socket.wants_read());

        socket.set_connected();
        assert!(socket.wants_read());
        socket.feed(b"abcdef");
        assert_eq!(socket.read_capacity(), 2);
        socket.feed(b"gh");
        assert!(!socket.wants_read());
        assert_eq!(socket.bytes_available(), 8);

        assert_eq!(socket.read(&mut buf), Some(4));
        assert_eq!(&buf, b"abcd");
        socket.set_read_eof();
        assert_eq!(socket.read(&mut buf), Some(4));
        assert_eq!(&buf, b"efgh");
        assert_eq!(socket.read(&mut buf), None);
    }

    #[test]
    fn graceful_close() {
        let mut socket = BufferedSocket::new();
        socket.connect_to_host("localhost", 1);
        assert_eq!(socket.write(b"queued").unwrap(), 6);
        assert!(!socket.has_pending_write());
        socket.set_connected();
        assert!(socket.has_pending_write());

        socket.close();
        assert_eq!(socket.state(), SocketState::Closing);
        assert!(socket.write(b"more").is_err());
        assert_eq!(socket.pending_write(), b"queued");

        socket.consume_written(4);
        assert_eq!(socket.bytes_to_write(), 2);
        assert_eq!(socket.state(), SocketState::Closing);
        socket.consume_written(2);
        assert_eq!(socket.state(), SocketState::Closed);
    }

    #[test]
    fn close_without_pending() {
        let mut socket = BufferedSocket::new();
        socket.connect_to_host("localhost", 1);
        socket.set_connected();
        socket.feed(b"dropped");
        socket.close();
        assert_eq!(socket.state(), SocketState::Closed);
        assert_eq!(socket.bytes_available(), 0);
    }

    #[test]
    fn disconnected_keeps_pending() {
        let mut socket = BufferedSocket::new();
        socket.connect_to_host("localhost", 1);
        socket.set_connected();
        socket.write(b"abc").unwrap();
        socket.set_disconnected();
        assert_eq!(socket.bytes_to_write(), 3);
        assert!(!socket.has_pending_write());
        assert!(socket.write(b"d").is_err());
    }
}
