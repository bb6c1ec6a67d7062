/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgMatches, Command, ValueHint, value_parser};

use netaccess_types::Operation;

use crate::ProcArgs;

pub const COMMAND: &str = "get";

const ARG_OUTPUT: &str = "output";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Download from a debug pipe peer")
        .arg(super::url_arg())
        .arg(
            Arg::new(ARG_OUTPUT)
                .help("Write the body to this file instead of stdout")
                .value_name("FILE")
                .short('o')
                .long(ARG_OUTPUT)
                .num_args(1)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(super::proxy_query_arg("proxy-query").help("Resolve a proxy for this query type"))
}

pub async fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<()> {
    let request = super::parse_request(Operation::Get, args)?;
    let reply = proc_args.pipe_client().start(request, None)?;

    match args.get_one::<PathBuf>(ARG_OUTPUT) {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .context(format!("failed to create output file {}", path.display()))?;
            super::drain_reply(reply, &mut file).await
        }
        None => super::drain_reply(reply, &mut tokio::io::stdout()).await,
    }
}
