/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use clap::{ArgMatches, Command};

use netaccess_types::net::{ProxyQuery, ProxyQueryType};

use crate::ProcArgs;

pub const COMMAND: &str = "proxy";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Show the proxies selected for a url")
        .arg(super::url_arg())
        .arg(
            super::proxy_query_arg("query-type")
                .help("Query type")
                .default_value("tcp"),
        )
}

pub fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<()> {
    let url = super::parse_url(args)?;
    let query_type = super::parse_proxy_query_type(args)?.unwrap_or(ProxyQueryType::TcpSocket);
    let query = ProxyQuery::from_url(query_type, &url);

    for proxy in proc_args.proxy_selector().select(&query) {
        println!("{proxy}");
    }
    Ok(())
}
