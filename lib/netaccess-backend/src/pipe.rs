/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Notify;

use netaccess_io::{ByteDevicePump, BytesUploadSource, PumpProgress, PumpSink, UploadSource};
use netaccess_types::net::{SocketError, SocketErrorKind};
use netaccess_types::{BackendError, NetworkError, NetworkRequest, Operation};

use crate::socket::TransportSocket;
use crate::{BackendEvent, PipeConfig, SocketEvent};

pub const DEBUG_PIPE_SCHEME: &str = "debugpipe";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendState {
    Created,
    Opening,
    Active,
    Finishing,
    Erroring,
    Finished,
}

/// Backend moving the request body to, or the reply body from, a plain tcp peer.
pub struct DebugPipeBackend<S> {
    request: NetworkRequest,
    config: PipeConfig,
    socket: S,
    state: BackendState,
    upload: Option<Box<dyn UploadSource>>,
    pump: ByteDevicePump,
    upload_finished: bool,
    download_finished: bool,
    everything_finished: bool,
    bytes_downloaded: u64,
    bare_protocol: bool,
    posted: VecDeque<SocketEvent>,
    events: VecDeque<BackendEvent>,
}

impl<S: TransportSocket> DebugPipeBackend<S> {
    pub fn new(request: NetworkRequest, config: PipeConfig, socket: S) -> Self {
        let pump = ByteDevicePump::new(config.pump());
        DebugPipeBackend {
            request,
            config,
            socket,
            state: BackendState::Created,
            upload: None,
            pump,
            upload_finished: false,
            download_finished: false,
            everything_finished: false,
            bytes_downloaded: 0,
            bare_protocol: false,
            posted: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// The data source of a put request, to be set before open().
    pub fn set_upload_source(&mut self, source: Box<dyn UploadSource>) {
        self.upload = Some(source);
    }

    #[inline]
    pub fn request(&self) -> &NetworkRequest {
        &self.request
    }

    #[inline]
    pub fn state(&self) -> BackendState {
        self.state
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == BackendState::Finished
    }

    #[inline]
    pub fn is_bare_protocol(&self) -> bool {
        self.bare_protocol
    }

    #[inline]
    pub fn upload_finished(&self) -> bool {
        self.upload_finished
    }

    #[inline]
    pub fn download_finished(&self) -> bool {
        self.download_finished
    }

    #[inline]
    pub fn everything_finished(&self) -> bool {
        self.everything_finished
    }

    #[inline]
    pub fn bytes_uploaded(&self) -> u64 {
        self.pump.uploaded()
    }

    #[inline]
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    #[inline]
    pub fn socket(&self) -> &S {
        &self.socket
    }

    #[inline]
    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    pub fn upload_notify(&self) -> Option<Arc<Notify>> {
        self.upload.as_ref().and_then(|u| u.ready_notify())
    }

    pub fn open(&mut self) {
        let host = self.request.peer_host().unwrap_or_default();
        let port = self.request.port_or(self.config.default_port());
        debug!(
            "debug pipe {} {} open to {host}:{port}",
            self.request.operation(),
            self.request.url()
        );
        self.socket.connect_to_host(&host, port);
        self.socket
            .set_read_buffer_size(self.config.read_buffer_size());

        self.bare_protocol = self.request.query_item_value("bare").as_deref() == Some("1");
        self.state = BackendState::Opening;

        if self.request.operation() == Operation::Put {
            if self.upload.is_none() {
                self.upload = Some(Box::new(BytesUploadSource::default()));
            }
            // drained on the next turn of the driver, never from inside open()
            self.posted.push_back(SocketEvent::UploadReady);
        }
    }

    /// Events the backend scheduled for itself.
    pub fn take_posted(&mut self) -> Option<SocketEvent> {
        self.posted.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<BackendEvent> {
        self.events.pop_front()
    }

    pub fn dispatch(&mut self, event: SocketEvent) {
        if self.state == BackendState::Finished {
            debug!("debug pipe {}: ignore {event:?} after finish", self.request.url());
            return;
        }

        match event {
            SocketEvent::Connected => {
                if self.state == BackendState::Opening {
                    self.state = BackendState::Active;
                }
            }
            SocketEvent::DataReady => self.events.push_back(BackendEvent::ReadyRead),
            SocketEvent::WriteCompleted(_) | SocketEvent::UploadReady => {
                self.push_from_upstream()
            }
            SocketEvent::Error(e) => self.on_socket_error(e),
            SocketEvent::Disconnected => self.on_socket_disconnected(),
        }
    }

    /// `None` once the download is complete.
    pub fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.read(buf) {
            Some(n) => {
                self.bytes_downloaded += n as u64;
                Some(n)
            }
            None => {
                if !self.download_finished {
                    self.download_finished = true;
                    self.attempt_finish();
                }
                None
            }
        }
    }

    pub fn bytes_available(&self) -> usize {
        self.socket.bytes_available()
    }

    /// Close of the consumer channel, the socket is left to the finish path.
    pub fn close(&mut self) {
        warn!(
            "debug pipe consumer channel closed: {} {}",
            self.request.operation(),
            self.request.url()
        );
    }

    fn push_from_upstream(&mut self) {
        if self.request.operation() != Operation::Put || self.upload_finished {
            return;
        }
        let Some(source) = self.upload.as_mut() else {
            return;
        };

        match self.pump.pump(source.as_mut(), &mut self.socket) {
            PumpProgress::Blocked | PumpProgress::Starved => {}
            PumpProgress::Finished => {
                self.upload_finished = true;
                self.attempt_finish();
            }
            PumpProgress::ReadFailed(e) => {
                let msg = format!("Read error reading upload data for {}: {e}", self.request.url());
                self.fail(NetworkError::ProtocolFailure, msg);
            }
            PumpProgress::WriteFailed(e) => {
                let msg = format!("Write error writing to {}: {e}", self.request.url());
                self.fail(NetworkError::ProtocolFailure, msg);
            }
        }
    }

    fn attempt_finish(&mut self) {
        if self.everything_finished || self.state == BackendState::Finished {
            return;
        }
        let done = match self.request.operation() {
            Operation::Get => self.download_finished,
            Operation::Put => self.upload_finished,
            _ => false,
        };
        if !done {
            return;
        }

        self.state = BackendState::Finishing;
        self.everything_finished = true;
        self.socket.close();
        debug!(
            "debug pipe {} {} finished, {} bytes up, {} bytes down",
            self.request.operation(),
            self.request.url(),
            self.pump.uploaded(),
            self.bytes_downloaded
        );
        self.events.push_back(BackendEvent::Finished);
        self.state = BackendState::Finished;
    }

    fn fail(&mut self, code: NetworkError, message: String) {
        self.state = BackendState::Erroring;
        warn!("debug pipe {}: {message}", self.request.url());
        self.events
            .push_back(BackendEvent::Error(BackendError::new(code, message)));
        self.events.push_back(BackendEvent::Finished);
        self.state = BackendState::Finished;
    }

    fn on_socket_error(&mut self, e: SocketError) {
        let code = match e.kind() {
            // a disconnect event follows
            SocketErrorKind::RemoteHostClosed => return,
            SocketErrorKind::Network => NetworkError::UnknownNetwork,
            _ => NetworkError::ProtocolFailure,
        };
        let msg = format!("Socket error on {}: {e}", self.request.url());
        self.fail(code, msg);
    }

    fn on_socket_disconnected(&mut self) {
        if self.socket.bytes_to_write() == 0 {
            return;
        }
        // let the consumer drain what was received before the close
        self.events.push_back(BackendEvent::ReadyRead);
        let msg = format!(
            "Remote host closed the connection prematurely on {}",
            self.request.url()
        );
        self.fail(NetworkError::RemoteHostClosed, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::{BufferedSocket, SocketState};
    use bytes::Bytes;
    use netaccess_io::upload_channel;
    use std::io;
    use url::Url;

    fn new_backend(operation: Operation, url: &str) -> DebugPipeBackend<BufferedSocket> {
        let request = NetworkRequest::new(operation, Url::parse(url).unwrap());
        DebugPipeBackend::new(request, PipeConfig::default(), BufferedSocket::new())
    }

    fn drain_events(backend: &mut DebugPipeBackend<BufferedSocket>) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        while let Some(ev) = backend.poll_event() {
            events.push(ev);
        }
        events
    }

    fn connect(backend: &mut DebugPipeBackend<BufferedSocket>) {
        backend.socket_mut().set_connected();
        backend.dispatch(SocketEvent::Connected);
        assert_eq!(backend.state(), BackendState::Active);
    }

    #[test]
    fn open_peer() {
        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/?bare=1");
        backend.open();
        assert_eq!(backend.state(), BackendState::Opening);
        assert_eq!(backend.socket().peer(), Some(("localhost", 12345)));
        assert_eq!(backend.socket().state(), SocketState::Connecting);
        assert!(backend.is_bare_protocol());
        assert!(backend.take_posted().is_none());

        let mut backend = new_backend(Operation::Get, "debugpipe://127.0.0.1:4000/?bare=0");
        backend.open();
        assert_eq!(backend.socket().peer(), Some(("127.0.0.1", 4000)));
        assert!(!backend.is_bare_protocol());
    }

    #[test]
    fn download_finish_once() {
        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/");
        backend.open();
        connect(&mut backend);

        backend.socket_mut().feed(b"hello");
        backend.dispatch(SocketEvent::DataReady);
        assert_eq!(drain_events(&mut backend), vec![BackendEvent::ReadyRead]);
        assert_eq!(backend.bytes_available(), 5);

        let mut buf = [0u8; 16];
        assert_eq!(backend.read(&mut buf), Some(5));
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(backend.read(&mut buf), Some(0));
        assert!(!backend.download_finished());

        backend.socket_mut().set_read_eof();
        backend.dispatch(SocketEvent::DataReady);
        backend.dispatch(SocketEvent::Disconnected);
        assert_eq!(backend.read(&mut buf), None);
        assert!(backend.download_finished());
        assert!(backend.everything_finished());
        assert_eq!(backend.read(&mut buf), None);

        assert_eq!(
            drain_events(&mut backend),
            vec![BackendEvent::ReadyRead, BackendEvent::Finished]
        );
        assert!(backend.is_finished());
        assert_eq!(backend.bytes_downloaded(), 5);
        assert_eq!(backend.socket().state(), SocketState::Closed);

        backend.dispatch(SocketEvent::DataReady);
        assert!(drain_events(&mut backend).is_empty());
    }

    #[test]
    fn upload_deferred_until_posted() {
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost/");
        backend.set_upload_source(Box::new(BytesUploadSource::new(Bytes::from_static(b"abc"))));
        backend.open();
        assert_eq!(backend.socket().bytes_to_write(), 0);

        let posted = backend.take_posted().unwrap();
        assert_eq!(posted, SocketEvent::UploadReady);
        connect(&mut backend);
        backend.dispatch(posted);

        assert!(backend.upload_finished());
        assert_eq!(backend.bytes_uploaded(), 3);
        assert_eq!(drain_events(&mut backend), vec![BackendEvent::Finished]);
        assert_eq!(backend.socket().state(), SocketState::Closing);
        assert_eq!(backend.socket().pending_write(), b"abc");

        backend.dispatch(SocketEvent::UploadReady);
        assert!(drain_events(&mut backend).is_empty());
    }

    #[test]
    fn put_without_source() {
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost/");
        backend.open();
        connect(&mut backend);
        let posted = backend.take_posted().unwrap();
        backend.dispatch(posted);
        assert_eq!(drain_events(&mut backend), vec![BackendEvent::Finished]);
        assert_eq!(backend.bytes_uploaded(), 0);
    }

    #[test]
    fn upload_backpressure() {
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost/");
        backend.set_upload_source(Box::new(BytesUploadSource::from(vec![1u8; 40000])));
        backend.open();
        connect(&mut backend);
        backend.dispatch(SocketEvent::UploadReady);
        assert_eq!(backend.socket().bytes_to_write(), 16384);

        // no write completion, no more data accepted
        backend.dispatch(SocketEvent::UploadReady);
        assert_eq!(backend.socket().bytes_to_write(), 16384);

        backend.socket_mut().consume_written(16384);
        backend.dispatch(SocketEvent::WriteCompleted(16384));
        assert_eq!(backend.socket().bytes_to_write(), 16384);
        assert_eq!(backend.bytes_uploaded(), 32768);

        backend.socket_mut().consume_written(10000);
        backend.dispatch(SocketEvent::WriteCompleted(10000));
        assert_eq!(backend.bytes_uploaded(), 40000);
        assert!(backend.upload_finished());
        assert_eq!(drain_events(&mut backend), vec![BackendEvent::Finished]);
    }

    #[tokio::test]
    async fn premature_close() {
        let (sender, source) = upload_channel(4);
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost:1/");
        backend.set_upload_source(Box::new(source));
        backend.open();
        connect(&mut backend);
        sender.send(Bytes::from_static(b"pending")).await.unwrap();
        backend.dispatch(SocketEvent::UploadReady);
        assert_eq!(backend.bytes_uploaded(), 7);

        backend.socket_mut().set_disconnected();
        backend.dispatch(SocketEvent::Disconnected);
        let events = drain_events(&mut backend);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], BackendEvent::ReadyRead);
        let BackendEvent::Error(e) = &events[1] else {
            panic!("not an error event");
        };
        assert_eq!(e.code(), NetworkError::RemoteHostClosed);
        assert_eq!(
            e.message(),
            "Remote host closed the connection prematurely on debugpipe://localhost:1/"
        );
        assert_eq!(events[2], BackendEvent::Finished);
        assert!(!backend.everything_finished());

        backend.dispatch(SocketEvent::Disconnected);
        assert!(drain_events(&mut backend).is_empty());
    }

    #[test]
    fn clean_disconnect() {
        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/");
        backend.open();
        connect(&mut backend);
        backend.dispatch(SocketEvent::Disconnected);
        assert!(drain_events(&mut backend).is_empty());
        assert!(!backend.is_finished());
    }

    #[test]
    fn socket_error_code() {
        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/");
        backend.open();
        backend.dispatch(SocketEvent::Error(SocketError::new(
            SocketErrorKind::RemoteHostClosed,
            "closed",
        )));
        assert!(drain_events(&mut backend).is_empty());

        backend.dispatch(SocketEvent::Error(SocketError::new(
            SocketErrorKind::Network,
            "unreachable",
        )));
        let events = drain_events(&mut backend);
        let BackendEvent::Error(e) = &events[0] else {
            panic!("not an error event");
        };
        assert_eq!(e.code(), NetworkError::UnknownNetwork);
        assert_eq!(
            e.message(),
            "Socket error on debugpipe://localhost/: network error: unreachable"
        );
        assert_eq!(events[1], BackendEvent::Finished);

        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/");
        backend.open();
        backend.dispatch(SocketEvent::Error(SocketError::new(
            SocketErrorKind::ConnectionRefused,
            "refused",
        )));
        let events = drain_events(&mut backend);
        assert!(matches!(&events[0], BackendEvent::Error(e) if e.code() == NetworkError::ProtocolFailure));
    }

    #[tokio::test]
    async fn write_failure() {
        let (sender, source) = upload_channel(4);
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost/");
        backend.set_upload_source(Box::new(source));
        backend.open();
        connect(&mut backend);
        backend.socket_mut().set_disconnected();

        sender.send(Bytes::from_static(b"data")).await.unwrap();
        backend.dispatch(SocketEvent::UploadReady);
        let events = drain_events(&mut backend);
        let BackendEvent::Error(e) = &events[0] else {
            panic!("not an error event");
        };
        assert_eq!(e.code(), NetworkError::ProtocolFailure);
        assert!(e.message().starts_with("Write error writing to debugpipe://localhost/"));
        assert_eq!(events[1], BackendEvent::Finished);
        assert_eq!(backend.bytes_uploaded(), 0);
    }

    #[tokio::test]
    async fn aborted_upload() {
        let (sender, source) = upload_channel(4);
        let mut backend = new_backend(Operation::Put, "debugpipe://localhost/");
        backend.set_upload_source(Box::new(source));
        backend.open();
        connect(&mut backend);

        sender.send(Bytes::from_static(b"head")).await.unwrap();
        backend.dispatch(SocketEvent::UploadReady);
        assert_eq!(backend.bytes_uploaded(), 4);

        sender
            .abort(io::Error::new(io::ErrorKind::InvalidData, "input gone"))
            .await;
        backend.dispatch(SocketEvent::UploadReady);
        let events = drain_events(&mut backend);
        let BackendEvent::Error(e) = &events[0] else {
            panic!("not an error event");
        };
        assert_eq!(e.code(), NetworkError::ProtocolFailure);
        assert!(
            e.message()
                .starts_with("Read error reading upload data for debugpipe://localhost/")
        );
        assert_eq!(events[1], BackendEvent::Finished);
        assert!(!backend.upload_finished());
        assert!(!backend.everything_finished());
    }

    #[test]
    fn close_keeps_session() {
        let mut backend = new_backend(Operation::Get, "debugpipe://localhost/");
        backend.open();
        connect(&mut backend);
        backend.close();
        assert_eq!(backend.state(), BackendState::Active);
        assert_eq!(backend.socket().state(), SocketState::Connected);
    }
}
