/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use netaccess_types::BackendError;
use netaccess_types::net::SocketError;

/// Input of the backend state machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SocketEvent {
    Connected,
    /// new bytes in the socket read buffer, or end of stream
    DataReady,
    /// that many bytes left the socket write buffer
    WriteCompleted(usize),
    Error(SocketError),
    Disconnected,
    /// the upload source may have more data, also posted once by open()
    UploadReady,
}

/// Output of the backend state machine, towards the consumer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackendEvent {
    ReadyRead,
    Error(BackendError),
    Finished,
}
