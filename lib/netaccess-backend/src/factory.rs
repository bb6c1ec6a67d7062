/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use tokio::sync::Notify;

use netaccess_io::UploadSource;
use netaccess_types::{NetworkRequest, Operation};

use crate::pipe::{BackendState, DEBUG_PIPE_SCHEME, DebugPipeBackend};
use crate::socket::BufferedSocket;
use crate::{BackendEvent, PipeConfig, SocketEvent};

/// All backend implementations.
pub enum AnyBackend {
    DebugPipe(DebugPipeBackend<BufferedSocket>),
}

macro_rules! for_each_backend {
    ($self:expr, $b:ident => $e:expr) => {
        match $self {
            AnyBackend::DebugPipe($b) => $e,
        }
    };
}

impl AnyBackend {
    pub fn scheme(&self) -> &'static str {
        match self {
            AnyBackend::DebugPipe(_) => DEBUG_PIPE_SCHEME,
        }
    }

    pub fn request(&self) -> &NetworkRequest {
        for_each_backend!(self, b => b.request())
    }

    pub fn state(&self) -> BackendState {
        for_each_backend!(self, b => b.state())
    }

    pub fn is_finished(&self) -> bool {
        for_each_backend!(self, b => b.is_finished())
    }

    pub fn set_upload_source(&mut self, source: Box<dyn UploadSource>) {
        for_each_backend!(self, b => b.set_upload_source(source))
    }

    pub fn upload_notify(&self) -> Option<Arc<Notify>> {
        for_each_backend!(self, b => b.upload_notify())
    }

    pub fn is_bare_protocol(&self) -> bool {
        for_each_backend!(self, b => b.is_bare_protocol())
    }

    pub fn upload_finished(&self) -> bool {
        for_each_backend!(self, b => b.upload_finished())
    }

    pub fn open(&mut self) {
        for_each_backend!(self, b => b.open())
    }

    pub fn take_posted(&mut self) -> Option<SocketEvent> {
        for_each_backend!(self, b => b.take_posted())
    }

    pub fn poll_event(&mut self) -> Option<BackendEvent> {
        for_each_backend!(self, b => b.poll_event())
    }

    pub fn dispatch(&mut self, event: SocketEvent) {
        for_each_backend!(self, b => b.dispatch(event))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        for_each_backend!(self, b => b.read(buf))
    }

    pub fn bytes_available(&self) -> usize {
        for_each_backend!(self, b => b.bytes_available())
    }

    pub fn close(&mut self) {
        for_each_backend!(self, b => b.close())
    }

    pub fn bytes_uploaded(&self) -> u64 {
        for_each_backend!(self, b => b.bytes_uploaded())
    }

    pub fn bytes_downloaded(&self) -> u64 {
        for_each_backend!(self, b => b.bytes_downloaded())
    }

    pub fn socket(&self) -> &BufferedSocket {
        for_each_backend!(self, b => b.socket())
    }

    pub fn socket_mut(&mut self) -> &mut BufferedSocket {
        for_each_backend!(self, b => b.socket_mut())
    }
}

pub type BackendPredicate = fn(&str, Operation) -> bool;
pub type BackendConstructor = fn(NetworkRequest, &PipeConfig) -> AnyBackend;

struct BackendEntry {
    scheme: &'static str,
    predicate: BackendPredicate,
    constructor: BackendConstructor,
}

/// Ordered registration table, the first matching entry wins.
pub struct BackendFactory {
    config: PipeConfig,
    entries: Vec<BackendEntry>,
}

impl BackendFactory {
    pub fn new(config: PipeConfig) -> Self {
        BackendFactory {
            config,
            entries: Vec::new(),
        }
    }

    pub fn with_defaults(config: PipeConfig) -> Self {
        let mut factory = BackendFactory::new(config);
        factory.register(DEBUG_PIPE_SCHEME, debug_pipe_accepts, debug_pipe_create);
        factory
    }

    pub fn register(
        &mut self,
        scheme: &'static str,
        predicate: BackendPredicate,
        constructor: BackendConstructor,
    ) {
        self.entries.push(BackendEntry {
            scheme,
            predicate,
            constructor,
        });
    }

    #[inline]
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    pub fn supported_schemes(&self) -> Vec<&'static str> {
        let mut schemes: Vec<&'static str> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !schemes.contains(&entry.scheme) {
                schemes.push(entry.scheme);
            }
        }
        schemes
    }

    pub fn create(&self, request: NetworkRequest) -> Option<AnyBackend> {
        let entry = self
            .entries
            .iter()
            .find(|e| (e.predicate)(request.scheme(), request.operation()))?;
        Some((entry.constructor)(request, &self.config))
    }
}

fn debug_pipe_accepts(scheme: &str, operation: Operation) -> bool {
    matches!(operation, Operation::Get | Operation::Put) && scheme == DEBUG_PIPE_SCHEME
}

fn debug_pipe_create(request: NetworkRequest, config: &PipeConfig) -> AnyBackend {
    AnyBackend::DebugPipe(DebugPipeBackend::new(
        request,
        *config,
        BufferedSocket::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(operation: Operation, url: &str) -> NetworkRequest {
        NetworkRequest::new(operation, Url::parse(url).unwrap())
    }

    #[test]
    fn debug_pipe_only_get_put() {
        let factory = BackendFactory::with_defaults(PipeConfig::default());
        assert_eq!(factory.supported_schemes(), vec!["debugpipe"]);

        let backend = factory
            .create(request(Operation::Get, "debugpipe://localhost/"))
            .unwrap();
        assert_eq!(backend.scheme(), "debugpipe");
        assert_eq!(backend.state(), BackendState::Created);
        assert!(
            factory
                .create(request(Operation::Put, "DebugPipe://localhost/"))
                .is_some()
        );
        assert!(
            factory
                .create(request(Operation::Post, "debugpipe://localhost/"))
                .is_none()
        );
        assert!(
            factory
                .create(request(Operation::Get, "http://localhost/"))
                .is_none()
        );
    }

    #[test]
    fn first_match_wins() {
        fn any_delete(_scheme: &str, operation: Operation) -> bool {
            operation == Operation::Delete
        }

        let mut factory = BackendFactory::new(PipeConfig::default());
        assert!(factory.supported_schemes().is_empty());
        assert!(
            factory
                .create(request(Operation::Get, "debugpipe://localhost/"))
                .is_none()
        );

        factory.register(DEBUG_PIPE_SCHEME, any_delete, debug_pipe_create);
        factory.register(DEBUG_PIPE_SCHEME, debug_pipe_accepts, debug_pipe_create);
        assert_eq!(factory.supported_schemes(), vec!["debugpipe"]);
        let backend = factory
            .create(request(Operation::Delete, "debugpipe://localhost/"))
            .unwrap();
        assert_eq!(backend.request().operation(), Operation::Delete);
    }
}
