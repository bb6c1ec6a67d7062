/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod error;
mod request;

pub mod net;

pub use error::{BackendError, NetworkError};
pub use request::{NetworkRequest, Operation};
