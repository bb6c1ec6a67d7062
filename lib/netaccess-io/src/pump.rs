/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use log::{debug, trace};

use crate::{PumpConfig, UploadSource};

/// The write side of an upload.
pub trait PumpSink {
    /// Bytes accepted by `write` but not yet acknowledged by the peer side.
    fn bytes_to_write(&self) -> usize;

    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

#[derive(Debug)]
pub enum PumpProgress {
    /// the sink has reached the high-water mark, wait for a write completion
    Blocked,
    /// the source has no data right now
    Starved,
    /// the source reached end of stream
    Finished,
    ReadFailed(io::Error),
    WriteFailed(io::Error),
}

/// Moves bytes from an upload source to a sink under a bounded outbound buffer.
pub struct ByteDevicePump {
    chunk: Box<[u8]>,
    high_water_mark: usize,
    uploaded: u64,
    finished: bool,
    blocked: bool,
}

impl ByteDevicePump {
    pub fn new(config: &PumpConfig) -> Self {
        ByteDevicePump {
            chunk: vec![0; config.chunk_size()].into_boxed_slice(),
            high_water_mark: config.high_water_mark(),
            uploaded: 0,
            finished: false,
            blocked: false,
        }
    }

    #[inline]
    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the source into the sink until blocked, starved, finished or failed.
    pub fn pump<S, W>(&mut self, source: &mut S, sink: &mut W) -> PumpProgress
    where
        S: UploadSource + ?Sized,
        W: PumpSink + ?Sized,
    {
        if self.finished {
            return PumpProgress::Finished;
        }

        loop {
            let queued = sink.bytes_to_write();
            if queued >= self.high_water_mark {
                return self.enter_blocked(queued);
            }
            self.blocked = false;

            let len = match source.peek(&mut self.chunk) {
                Ok(None) => {
                    self.finished = true;
                    trace!("upload pump finished after {} bytes", self.uploaded);
                    return PumpProgress::Finished;
                }
                Ok(Some(0)) => return PumpProgress::Starved,
                Ok(Some(n)) => n,
                Err(e) => {
                    debug!("upload pump read failed after {} bytes: {e}", self.uploaded);
                    return PumpProgress::ReadFailed(e);
                }
            };

            match sink.write(&self.chunk[..len]) {
                Ok(0) => return self.enter_blocked(queued),
                Ok(nw) => {
                    let skipped = source.skip(nw);
                    debug_assert_eq!(skipped, nw);
                    self.uploaded += nw as u64;
                }
                Err(e) => {
                    debug!("upload pump write failed after {} bytes: {e}", self.uploaded);
                    return PumpProgress::WriteFailed(e);
                }
            }
        }
    }

    fn enter_blocked(&mut self, queued: usize) -> PumpProgress {
        if !self.blocked {
            self.blocked = true;
            trace!(
                "upload pump blocked after {} bytes with {queued} bytes queued",
                self.uploaded
            );
        }
        PumpProgress::Blocked
    }
}
