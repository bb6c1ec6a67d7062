/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::Context;
use bytes::BytesMut;
use clap::{Arg, ArgMatches, Command, ValueHint, value_parser};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};

use netaccess_io::{UploadSender, upload_channel};
use netaccess_types::Operation;

use crate::ProcArgs;

pub const COMMAND: &str = "put";

const ARG_FILE: &str = "file";

const UPLOAD_QUEUE_CHUNKS: usize = 4;

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Upload to a debug pipe peer")
        .arg(super::url_arg())
        .arg(
            Arg::new(ARG_FILE)
                .help("Upload this file instead of stdin")
                .value_name("FILE")
                .short('f')
                .long(ARG_FILE)
                .num_args(1)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(super::proxy_query_arg("proxy-query").help("Resolve a proxy for this query type"))
}

async fn feed_upload<R>(mut input: R, sender: UploadSender, chunk_size: usize)
where
    R: AsyncRead + Unpin,
{
    let mut total = 0usize;
    loop {
        let mut buf = BytesMut::with_capacity(chunk_size);
        match input.read_buf(&mut buf).await {
            Ok(0) => {
                debug!("upload input finished after {total} bytes");
                sender.finish();
                return;
            }
            Ok(n) => {
                total += n;
                if let Err(e) = sender.send(buf.freeze()).await {
                    debug!("upload stopped after {total} bytes: {e}");
                    return;
                }
            }
            Err(e) => {
                warn!("failed to read upload input after {total} bytes: {e}");
                sender.abort(e).await;
                return;
            }
        }
    }
}

pub async fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<()> {
    let request = super::parse_request(Operation::Put, args)?;
    let chunk_size = proc_args.config().pipe().pump().chunk_size();

    let (sender, source) = upload_channel(UPLOAD_QUEUE_CHUNKS);
    match args.get_one::<PathBuf>(ARG_FILE) {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .context(format!("failed to open upload file {}", path.display()))?;
            tokio::spawn(feed_upload(file, sender, chunk_size));
        }
        None => {
            tokio::spawn(feed_upload(tokio::io::stdin(), sender, chunk_size));
        }
    }

    let reply = proc_args
        .pipe_client()
        .start(request, Some(Box::new(source)))?;
    super::drain_reply(reply, &mut tokio::io::stdout()).await
}
