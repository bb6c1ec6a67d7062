/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::UploadSource;

/// Create an upload source fed by data sent from elsewhere.
///
/// At most `capacity` chunks wait in the channel, `send` waits for room
/// beyond that. The stream ends when the sender is finished or dropped.
pub fn upload_channel(capacity: usize) -> (UploadSender, ChannelUploadSource) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let notify = Arc::new(Notify::new());
    (
        UploadSender {
            sender,
            notify: Arc::clone(&notify),
        },
        ChannelUploadSource {
            receiver,
            notify,
            front: VecDeque::new(),
            closed: false,
            error: None,
            aborted: false,
        },
    )
}

pub struct UploadSender {
    sender: mpsc::Sender<io::Result<Bytes>>,
    notify: Arc<Notify>,
}

impl UploadSender {
    /// Fails once the upload source is gone.
    pub async fn send(&self, data: Bytes) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.sender
            .send(Ok(data))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "upload source dropped"))?;
        self.notify.notify_one();
        Ok(())
    }

    pub fn finish(self) {
        // close in drop
    }

    /// End the stream with an error instead of a clean end.
    pub async fn abort(self, e: io::Error) {
        let _ = self.sender.send(Err(e)).await;
    }
}

impl Drop for UploadSender {
    fn drop(&mut self) {
        self.notify.notify_one();
    }
}

pub struct ChannelUploadSource {
    receiver: mpsc::Receiver<io::Result<Bytes>>,
    notify: Arc<Notify>,
    front: VecDeque<Bytes>,
    closed: bool,
    error: Option<io::Error>,
    aborted: bool,
}

impl ChannelUploadSource {
    fn front_len(&self) -> usize {
        self.front.iter().map(Bytes::len).sum()
    }

    /// Pull chunks off the channel until `want` bytes are held.
    fn fill(&mut self, want: usize) {
        let mut held = self.front_len();
        while held < want && !self.closed {
            match self.receiver.try_recv() {
                Ok(Ok(chunk)) => {
                    held += chunk.len();
                    self.front.push_back(chunk);
                }
                Ok(Err(e)) => {
                    self.error = Some(e);
                    self.closed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
    }
}

impl UploadSource for ChannelUploadSource {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if self.aborted {
            return Err(io::Error::other("upload stream aborted"));
        }
        self.fill(buf.len());
        if let Some(e) = self.error.take() {
            self.front.clear();
            self.aborted = true;
            return Err(e);
        }
        if self.front.is_empty() {
            return Ok(if self.closed { None } else { Some(0) });
        }

        let mut copied = 0;
        for chunk in self.front.iter() {
            let left = buf.len() - copied;
            if left == 0 {
                break;
            }
            let len = left.min(chunk.len());
            buf[copied..copied + len].copy_from_slice(&chunk[..len]);
            copied += len;
        }
        Ok(Some(copied))
    }

    fn skip(&mut self, n: usize) -> usize {
        let mut skipped = 0;
        while skipped < n {
            let Some(chunk) = self.front.front_mut() else {
                break;
            };
            let len = (n - skipped).min(chunk.len());
            chunk.advance(len);
            skipped += len;
            if chunk.is_empty() {
                self.front.pop_front();
            }
        }
        skipped
    }

    fn ready_notify(&self) -> Option<Arc<Notify>> {
        Some(Arc::clone(&self.notify))
    }
}
