/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use clap::{Arg, ArgMatches, Command, ValueHint, value_parser};
use log::{info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::ProcArgs;

pub const COMMAND: &str = "serve";

const ARG_LISTEN: &str = "listen";
const ARG_REPLY: &str = "reply";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Run a debug pipe peer")
        .arg(
            Arg::new(ARG_LISTEN)
                .help("Listen address, the configured default port on loopback if not set")
                .value_name("ADDR")
                .short('l')
                .long(ARG_LISTEN)
                .num_args(1)
                .value_parser(value_parser!(SocketAddr)),
        )
        .arg(
            Arg::new(ARG_REPLY)
                .help("Send the content of this file to each connection")
                .value_name("FILE")
                .short('r')
                .long(ARG_REPLY)
                .num_args(1)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf)),
        )
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, reply: Bytes) {
    let (mut r, mut w) = stream.split();
    let mut sink = tokio::io::sink();
    let (received, sent) = tokio::join!(tokio::io::copy(&mut r, &mut sink), async {
        w.write_all(&reply).await?;
        w.shutdown().await
    });
    match received {
        Ok(n) => info!("received {n} bytes from {peer}"),
        Err(e) => warn!("read from {peer} failed: {e}"),
    }
    if let Err(e) = sent {
        warn!("reply to {peer} failed: {e}");
    }
}

pub async fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<()> {
    let addr = args.get_one::<SocketAddr>(ARG_LISTEN).copied().unwrap_or_else(|| {
        SocketAddr::new(
            Ipv4Addr::LOCALHOST.into(),
            proc_args.config().pipe().default_port(),
        )
    });
    let reply = match args.get_one::<PathBuf>(ARG_REPLY) {
        Some(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .context(format!("failed to read reply file {}", path.display()))?,
        None => Bytes::new(),
    };

    let listener = TcpListener::bind(addr)
        .await
        .context(format!("failed to listen on {addr}"))?;
    info!("serving debug pipe on {addr}");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                return Ok(());
            }
            r = listener.accept() => match r {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, reply.clone()));
                }
                Err(e) => warn!("accept failed: {e}"),
            },
        }
    }
}
