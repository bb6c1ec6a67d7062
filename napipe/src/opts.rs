/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};

use netaccess_backend::PipeClient;
use netaccess_local::registry::FileRegistry;
use netaccess_types::net::ProxySelector;

use crate::AppConfig;

const GLOBAL_ARG_CONFIG_FILE: &str = "config-file";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

pub struct ProcArgs {
    pub verbose_level: u8,
    config: AppConfig,
}

impl ProcArgs {
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn proxy_selector(&self) -> ProxySelector {
        ProxySelector::new(self.config.proxy_env().cloned())
    }

    pub fn pipe_client(&self) -> PipeClient {
        PipeClient::new(*self.config.pipe(), self.proxy_selector())
    }

    pub fn file_registry(&self) -> anyhow::Result<FileRegistry> {
        FileRegistry::with_scope(self.config.registry())
            .context("unable to locate the server registry file")
    }
}

pub fn add_global_args(app: Command) -> Command {
    app.arg(
        Arg::new(GLOBAL_ARG_CONFIG_FILE)
            .help("Config file in yaml format")
            .value_name("CONFIG FILE")
            .short('c')
            .long("config")
            .global(true)
            .num_args(1)
            .value_hint(ValueHint::FilePath)
            .value_parser(value_parser!(PathBuf)),
    )
    .arg(
        Arg::new(GLOBAL_ARG_VERBOSE)
            .help("Show verbose output")
            .short('v')
            .long(GLOBAL_ARG_VERBOSE)
            .global(true)
            .action(ArgAction::Count),
    )
}

pub fn parse_global_args(args: &ArgMatches) -> anyhow::Result<ProcArgs> {
    let verbose_level = args.get_count(GLOBAL_ARG_VERBOSE);
    let config = match args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG_FILE) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    Ok(ProcArgs {
        verbose_level,
        config,
    })
}
