/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use clap_complete::Shell;

use napipe::cmd;

const COMMAND_VERSION: &str = "version";
const COMMAND_COMPLETION: &str = "completion";

fn build_cli_args() -> Command {
    napipe::add_global_args(Command::new(napipe::build::PKG_NAME))
        .subcommand_required(true)
        .subcommand(Command::new(COMMAND_VERSION).override_help("Show version"))
        .subcommand(
            Command::new(COMMAND_COMPLETION).arg(
                Arg::new("target")
                    .value_name("SHELL")
                    .required(true)
                    .num_args(1)
                    .value_parser(value_parser!(Shell)),
            ),
        )
        .subcommand(cmd::get::command())
        .subcommand(cmd::put::command())
        .subcommand(cmd::proxy::command())
        .subcommand(cmd::serve::command())
        .subcommand(cmd::local::command())
}

fn main() -> anyhow::Result<ExitCode> {
    let args = build_cli_args().get_matches();

    let (subcommand, sub_args) = args
        .subcommand()
        .ok_or_else(|| anyhow!("no subcommand found"))?;

    match subcommand {
        COMMAND_VERSION => {
            napipe::build::print_version();
            return Ok(ExitCode::SUCCESS);
        }
        COMMAND_COMPLETION => {
            generate_completion(sub_args);
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let proc_args = napipe::parse_global_args(&args)?;
    let _log_guard = napipe::log::setup(proc_args.verbose_level)
        .context("failed to setup logger")?;

    if subcommand == cmd::proxy::COMMAND {
        cmd::proxy::run(&proc_args, sub_args)?;
        return Ok(ExitCode::SUCCESS);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start main runtime")?;
    rt.block_on(async move {
        match subcommand {
            cmd::get::COMMAND => cmd::get::run(&proc_args, sub_args).await,
            cmd::put::COMMAND => cmd::put::run(&proc_args, sub_args).await,
            cmd::serve::COMMAND => cmd::serve::run(&proc_args, sub_args).await,
            cmd::local::COMMAND => cmd::local::run(&proc_args, sub_args).await,
            other => Err(anyhow!("invalid subcommand {other}")),
        }
    })?;
    Ok(ExitCode::SUCCESS)
}

fn generate_completion(args: &ArgMatches) {
    if let Some(target) = args.get_one::<Shell>("target") {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
    }
}
