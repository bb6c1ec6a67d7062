/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::future;
use std::io;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use url::Url;

use netaccess_io::UploadSource;
use netaccess_types::net::{
    ProxyDescriptor, ProxyQuery, ProxySelector, SocketError, SocketErrorKind,
};
use netaccess_types::{BackendError, NetworkRequest, Operation};

use crate::connect::connect_via;
use crate::socket::SocketState;
use crate::{AnyBackend, BackendEvent, BackendFactory, PipeConfig, SocketEvent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no backend for {0} {1}")]
    Unsupported(Operation, String),
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("session aborted before finish")]
    SessionAborted,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyEvent {
    Data(Bytes),
    /// always followed by `Finished`
    Error(BackendError),
    Finished { uploaded: u64, downloaded: u64 },
}

enum ReplyControl {
    Close,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PipeOutcome {
    pub body: Bytes,
    pub uploaded: u64,
    pub downloaded: u64,
}

/// Consumer side of a running session.
pub struct PipeReply {
    events: mpsc::UnboundedReceiver<ReplyEvent>,
    control: mpsc::UnboundedSender<ReplyControl>,
}

impl PipeReply {
    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        self.events.recv().await
    }

    /// Close the consumer channel, the transfer itself goes on.
    pub fn close(&self) {
        let _ = self.control.send(ReplyControl::Close);
    }

    pub async fn read_to_end(mut self) -> Result<PipeOutcome, ClientError> {
        let mut body = BytesMut::new();
        let mut error = None;
        while let Some(ev) = self.events.recv().await {
            match ev {
                ReplyEvent::Data(data) => body.extend_from_slice(&data),
                ReplyEvent::Error(e) => error = Some(e),
                ReplyEvent::Finished {
                    uploaded,
                    downloaded,
                } => {
                    if let Some(e) = error {
                        return Err(ClientError::Backend(e));
                    }
                    return Ok(PipeOutcome {
                        body: body.freeze(),
                        uploaded,
                        downloaded,
                    });
                }
            }
        }
        Err(ClientError::SessionAborted)
    }
}

/// Drives one backend over a real tcp connection.
pub struct PipeSession {
    backend: AnyBackend,
    config: PipeConfig,
    selector: ProxySelector,
    reply_tx: mpsc::UnboundedSender<ReplyEvent>,
    control_rx: mpsc::UnboundedReceiver<ReplyControl>,
}

impl PipeSession {
    pub fn new(backend: AnyBackend, config: PipeConfig, selector: ProxySelector) -> (Self, PipeReply) {
        let (reply_tx, events) = mpsc::unbounded_channel();
        let (control, control_rx) = mpsc::unbounded_channel();
        let session = PipeSession {
            backend,
            config,
            selector,
            reply_tx,
            control_rx,
        };
        (session, PipeReply { events, control })
    }

    pub async fn run(self) {
        let PipeSession {
            mut backend,
            config,
            selector,
            reply_tx,
            mut control_rx,
        } = self;

        let mut read_buf = vec![0u8; config.read_buffer_size()];
        backend.open();
        let Some((host, port)) = backend.socket().peer().map(|(h, p)| (h.to_string(), p)) else {
            return;
        };
        let request = backend.request().clone();
        let upload_notify = backend.upload_notify();

        let connected = match tokio::time::timeout(
            config.connect_timeout(),
            connect(&request, &selector, &host, port),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(SocketError::new(
                SocketErrorKind::Timeout,
                format!("connect to {host}:{port} timed out"),
            )),
        };
        let (mut stream, early_data) = match connected {
            Ok(r) => r,
            Err(e) => {
                debug!("debug pipe {} connect failed: {e}", request.url());
                let remote_closed = e.kind() == SocketErrorKind::RemoteHostClosed;
                let socket = backend.socket_mut();
                socket.set_error(e.clone());
                socket.set_disconnected();
                backend.dispatch(SocketEvent::Error(e));
                if remote_closed {
                    backend.dispatch(SocketEvent::Disconnected);
                }
                forward_events(&mut backend, &reply_tx, &mut read_buf);
                return;
            }
        };
        backend.socket_mut().set_connected();
        backend.dispatch(SocketEvent::Connected);
        if !early_data.is_empty() {
            backend.socket_mut().feed(&early_data);
            backend.dispatch(SocketEvent::DataReady);
        }

        let mut control_open = true;
        loop {
            while let Some(ev) = backend.take_posted() {
                backend.dispatch(ev);
            }
            forward_events(&mut backend, &reply_tx, &mut read_buf);
            if backend.is_finished() {
                break;
            }

            let want_read = backend.socket().wants_read();
            let want_write = backend.socket().has_pending_write();
            let want_upload = upload_notify.is_some() && !backend.upload_finished();

            tokio::select! {
                biased;

                ctl = control_rx.recv(), if control_open => {
                    if let Some(ReplyControl::Close) = ctl {
                        backend.close();
                    }
                    control_open = false;
                }
                r = stream.readable(), if want_read => match r {
                    Ok(_) => {
                        let len = read_buf.len().min(backend.socket().read_capacity());
                        match stream.try_read(&mut read_buf[..len]) {
                            Ok(0) => {
                                backend.socket_mut().set_read_eof();
                                // a half closed peer may still take the rest of an upload
                                let half_closed = request.operation() == Operation::Put
                                    && !backend.upload_finished();
                                if half_closed {
                                    debug!("debug pipe {} peer half closed", request.url());
                                } else {
                                    backend.socket_mut().set_disconnected();
                                }
                                backend.dispatch(SocketEvent::DataReady);
                                if !half_closed {
                                    backend.dispatch(SocketEvent::Disconnected);
                                }
                            }
                            Ok(n) => {
                                backend.socket_mut().feed(&read_buf[..n]);
                                backend.dispatch(SocketEvent::DataReady);
                            }
                            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                            Err(e) => on_io_error(&mut backend, e),
                        }
                    }
                    Err(e) => on_io_error(&mut backend, e),
                },
                r = stream.writable(), if want_write => match r {
                    Ok(_) => match stream.try_write(backend.socket().pending_write()) {
                        Ok(n) => {
                            backend.socket_mut().consume_written(n);
                            backend.dispatch(SocketEvent::WriteCompleted(n));
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                        Err(e) => on_io_error(&mut backend, e),
                    },
                    Err(e) => on_io_error(&mut backend, e),
                },
                _ = wait_notify(upload_notify.as_deref()), if want_upload => {
                    backend.dispatch(SocketEvent::UploadReady);
                }
                else => {
                    warn!("debug pipe {} stalled before finish", request.url());
                    break;
                }
            }
        }

        if backend.socket().state() == SocketState::Closing {
            let pending = Bytes::copy_from_slice(backend.socket().pending_write());
            match stream.write_all(&pending).await {
                Ok(_) => backend.socket_mut().consume_written(pending.len()),
                Err(e) => debug!("debug pipe {} flush failed: {e}", request.url()),
            }
        }
        if let Err(e) = stream.shutdown().await {
            debug!("debug pipe {} shutdown failed: {e}", request.url());
        }
        debug!("debug pipe {} session done", request.url());
    }
}

async fn wait_notify(notify: Option<&Notify>) {
    match notify {
        Some(notify) => notify.notified().await,
        None => future::pending().await,
    }
}

async fn connect(
    request: &NetworkRequest,
    selector: &ProxySelector,
    host: &str,
    port: u16,
) -> Result<(TcpStream, Bytes), SocketError> {
    let proxies = match request.proxy_query_type() {
        Some(query_type) => {
            let query = ProxyQuery::new(query_type, request.scheme(), host, port);
            selector.select(&query)
        }
        None => vec![ProxyDescriptor::no_proxy()],
    };

    let mut last_err = None;
    for proxy in &proxies {
        match connect_via(proxy, host, port).await {
            Ok(r) => {
                debug!("connected to {host}:{port} via {proxy}");
                return Ok(r);
            }
            Err(e) => {
                debug!("connect to {host}:{port} via {proxy} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| SocketError::new(SocketErrorKind::Unknown, "no proxy to use")))
}

fn on_io_error(backend: &mut AnyBackend, e: io::Error) {
    let e = SocketError::from(e);
    let remote_closed = e.kind() == SocketErrorKind::RemoteHostClosed;
    let socket = backend.socket_mut();
    socket.set_error(e.clone());
    if remote_closed {
        socket.set_read_eof();
    }
    socket.set_disconnected();
    backend.dispatch(SocketEvent::Error(e));
    if remote_closed {
        backend.dispatch(SocketEvent::DataReady);
        backend.dispatch(SocketEvent::Disconnected);
    }
}

fn forward_events(
    backend: &mut AnyBackend,
    reply_tx: &mpsc::UnboundedSender<ReplyEvent>,
    buf: &mut [u8],
) {
    while let Some(ev) = backend.poll_event() {
        let reply = match ev {
            BackendEvent::ReadyRead => {
                while let Some(n) = backend.read(buf) {
                    if n == 0 {
                        break;
                    }
                    let _ = reply_tx.send(ReplyEvent::Data(Bytes::copy_from_slice(&buf[..n])));
                }
                continue;
            }
            BackendEvent::Error(e) => ReplyEvent::Error(e),
            BackendEvent::Finished => ReplyEvent::Finished {
                uploaded: backend.bytes_uploaded(),
                downloaded: backend.bytes_downloaded(),
            },
        };
        let _ = reply_tx.send(reply);
    }
}

/// Starts sessions for requests on the current tokio runtime.
pub struct PipeClient {
    factory: BackendFactory,
    selector: ProxySelector,
}

impl PipeClient {
    pub fn new(config: PipeConfig, selector: ProxySelector) -> Self {
        PipeClient::with_factory(BackendFactory::with_defaults(config), selector)
    }

    pub fn with_factory(factory: BackendFactory, selector: ProxySelector) -> Self {
        PipeClient { factory, selector }
    }

    pub fn start(
        &self,
        request: NetworkRequest,
        upload: Option<Box<dyn UploadSource>>,
    ) -> Result<PipeReply, ClientError> {
        let operation = request.operation();
        let url = request.url().to_string();
        let mut backend = self
            .factory
            .create(request)
            .ok_or(ClientError::Unsupported(operation, url))?;
        if let Some(source) = upload {
            backend.set_upload_source(source);
        }

        let (session, reply) =
            PipeSession::new(backend, *self.factory.config(), self.selector.clone());
        tokio::spawn(session.run());
        Ok(reply)
    }

    pub async fn execute(
        &self,
        request: NetworkRequest,
        upload: Option<Box<dyn UploadSource>>,
    ) -> Result<PipeOutcome, ClientError> {
        self.start(request, upload)?.read_to_end().await
    }

    pub async fn get(&self, url: Url) -> Result<PipeOutcome, ClientError> {
        self.execute(NetworkRequest::new(Operation::Get, url), None)
            .await
    }

    pub async fn put(
        &self,
        url: Url,
        source: Box<dyn UploadSource>,
    ) -> Result<PipeOutcome, ClientError> {
        self.execute(NetworkRequest::new(Operation::Put, url), Some(source))
            .await
    }
}
