/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod config;
mod event;
mod factory;
mod pipe;
mod session;

pub mod connect;
pub mod socket;

pub use config::PipeConfig;
pub use event::{BackendEvent, SocketEvent};
pub use factory::{AnyBackend, BackendConstructor, BackendFactory, BackendPredicate};
pub use pipe::{BackendState, DEBUG_PIPE_SCHEME, DebugPipeBackend};
pub use session::{ClientError, PipeClient, PipeOutcome, PipeReply, PipeSession, ReplyEvent};
