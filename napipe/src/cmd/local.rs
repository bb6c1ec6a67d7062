/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command};
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use netaccess_local::registry::FileRegistry;
use netaccess_local::{LocalServer, LocalSocket};

use crate::ProcArgs;

pub const COMMAND: &str = "local";

const COMMAND_LISTEN: &str = "listen";
const COMMAND_CONNECT: &str = "connect";
const COMMAND_REMOVE: &str = "remove";

const ARG_NAME: &str = "name";

const ACCEPT_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

fn name_arg() -> Arg {
    Arg::new(ARG_NAME)
        .help("Local server name")
        .value_name("NAME")
        .required(true)
        .num_args(1)
}

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Named local servers")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LISTEN)
                .about("Listen and echo back every connection")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new(COMMAND_CONNECT)
                .about("Connect and pipe stdin / stdout")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new(COMMAND_REMOVE)
                .about("Remove a stale server name")
                .arg(name_arg()),
        )
}

async fn echo(socket: LocalSocket) {
    let peer = socket.peer_addr().ok();
    let (mut r, mut w) = tokio::io::split(socket);
    match tokio::io::copy(&mut r, &mut w).await {
        Ok(n) => debug!("echoed {n} bytes to {peer:?}"),
        Err(e) => warn!("echo to {peer:?} failed: {e}"),
    }
    let _ = w.shutdown().await;
}

async fn listen(proc_args: &ProcArgs, name: &str) -> anyhow::Result<()> {
    let registry = Arc::new(proc_args.file_registry()?);
    let mut server = LocalServer::new(registry, *proc_args.config().local_server());
    server.listen(name)?;
    info!(
        "local server {} listening on port {}",
        server.full_server_name(),
        server.server_port().unwrap_or_default()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = server.wait_for_new_connection(ACCEPT_WAIT_TIMEOUT) => {}
        }
        while server.accept_pending() {}
        while let Some(socket) = server.next_pending_connection() {
            tokio::spawn(echo(socket));
        }
    }

    server.close_server();
    Ok(())
}

async fn connect(proc_args: &ProcArgs, name: &str) -> anyhow::Result<()> {
    let registry = proc_args.file_registry()?;
    let socket = LocalSocket::connect_to_server(&registry, name).await?;
    let (mut r, mut w) = tokio::io::split(socket);

    let upload = async {
        let n = tokio::io::copy(&mut tokio::io::stdin(), &mut w).await?;
        w.shutdown().await?;
        Ok::<u64, std::io::Error>(n)
    };
    let mut stdout = tokio::io::stdout();
    let download = tokio::io::copy(&mut r, &mut stdout);
    let (sent, received) = tokio::join!(upload, download);
    let sent = sent.context("failed to send stdin")?;
    let received = received.context("failed to write stdout")?;
    debug!("sent {sent} bytes, received {received} bytes");
    Ok(())
}

fn remove(proc_args: &ProcArgs, name: &str) -> anyhow::Result<()> {
    let registry = proc_args.file_registry()?;
    if LocalServer::<FileRegistry>::remove_server(&registry, name) {
        info!("removed local server name {name}");
    }
    Ok(())
}

pub async fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<()> {
    let (subcommand, sub_args) = args
        .subcommand()
        .ok_or_else(|| anyhow!("no local subcommand found"))?;
    let name = sub_args
        .get_one::<String>(ARG_NAME)
        .ok_or_else(|| anyhow!("no server name set"))?;

    match subcommand {
        COMMAND_LISTEN => listen(proc_args, name).await,
        COMMAND_CONNECT => connect(proc_args, name).await,
        COMMAND_REMOVE => remove(proc_args, name),
        cmd => Err(anyhow!("invalid local subcommand {cmd}")),
    }
}
