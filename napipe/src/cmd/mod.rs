/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches};
use log::info;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use netaccess_backend::{ClientError, PipeReply, ReplyEvent};
use netaccess_types::net::ProxyQueryType;
use netaccess_types::{NetworkRequest, Operation};

pub mod get;
pub mod local;
pub mod proxy;
pub mod put;
pub mod serve;

const ARG_URL: &str = "url";
const ARG_PROXY_QUERY: &str = "proxy-query";

fn url_arg() -> Arg {
    Arg::new(ARG_URL)
        .help("Target url, like debugpipe://127.0.0.1:12345")
        .value_name("URL")
        .required(true)
        .num_args(1)
}

fn proxy_query_arg(long: &'static str) -> Arg {
    Arg::new(ARG_PROXY_QUERY)
        .value_name("QUERY TYPE")
        .long(long)
        .num_args(1)
        .value_parser(["tcp", "udp", "server", "url"])
}

fn parse_url(args: &ArgMatches) -> anyhow::Result<Url> {
    let url = args
        .get_one::<String>(ARG_URL)
        .ok_or_else(|| anyhow!("no target url set"))?;
    Url::parse(url).context(format!("invalid url {url}"))
}

fn parse_proxy_query_type(args: &ArgMatches) -> anyhow::Result<Option<ProxyQueryType>> {
    match args.get_one::<String>(ARG_PROXY_QUERY) {
        Some(s) => ProxyQueryType::from_str(s)
            .map(Some)
            .map_err(|_| anyhow!("invalid proxy query type {s}")),
        None => Ok(None),
    }
}

fn parse_request(operation: Operation, args: &ArgMatches) -> anyhow::Result<NetworkRequest> {
    let url = parse_url(args)?;
    let request = NetworkRequest::new(operation, url);
    match parse_proxy_query_type(args)? {
        Some(query_type) => Ok(request.with_proxy_query(query_type)),
        None => Ok(request),
    }
}

/// Copy the downloaded body to `output` until the session finishes.
async fn drain_reply<W>(mut reply: PipeReply, output: &mut W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut error = None;
    while let Some(ev) = reply.next_event().await {
        match ev {
            ReplyEvent::Data(data) => output
                .write_all(&data)
                .await
                .context("failed to write output")?,
            ReplyEvent::Error(e) => error = Some(e),
            ReplyEvent::Finished {
                uploaded,
                downloaded,
            } => {
                output.flush().await.context("failed to flush output")?;
                if let Some(e) = error {
                    return Err(ClientError::Backend(e).into());
                }
                info!("finished: {uploaded} bytes uploaded, {downloaded} bytes downloaded");
                return Ok(());
            }
        }
    }
    Err(ClientError::SessionAborted.into())
}
