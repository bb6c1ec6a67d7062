/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod config;
mod pump;
pub mod upload;

pub use config::PumpConfig;
pub use pump::{ByteDevicePump, PumpProgress, PumpSink};
pub use upload::{BytesUploadSource, ChannelUploadSource, UploadSender, UploadSource, upload_channel};
