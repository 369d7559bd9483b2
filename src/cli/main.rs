// SPDX-License-Identifier: Apache-2.0

mod diff;
mod error;
mod get;
mod keyfile;
mod sandbox;
mod validate;

use std::path::Path;

use nplan::NplanConf;

pub(crate) use self::error::CliError;
use self::{
    diff::CommandDiff, get::CommandGet, keyfile::CommandKeyfile,
    validate::CommandValidate,
};

fn main() -> Result<(), CliError> {
    let mut cli_cmd = clap::Command::new("nplan")
        .about("Declarative network configuration tool")
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .action(clap::ArgAction::SetTrue)
                .help("Disable logging")
                .global(true),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .action(clap::ArgAction::Count)
                .help("Increase verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("ROOT_DIR")
                .long("root-dir")
                .short('r')
                .help("Search for and write documents under this directory")
                .global(true),
        )
        .subcommand(CommandKeyfile::new_cmd())
        .subcommand(CommandGet::new_cmd())
        .subcommand(CommandValidate::new_cmd())
        .subcommand(CommandDiff::new_cmd());

    let matches = cli_cmd.get_matches_mut();

    let (log_groups, log_level) = match matches.get_count("verbose") {
        0 => (vec!["nplan"], log::LevelFilter::Info),
        1 => (vec!["nplan"], log::LevelFilter::Debug),
        2 => (vec!["nplan"], log::LevelFilter::Trace),
        _ => (vec![""], log::LevelFilter::Trace),
    };

    if !matches.get_flag("quiet") {
        let mut log_builder = env_logger::Builder::new();
        for log_group in log_groups {
            if log_group.is_empty() {
                log_builder.filter(None, log_level);
            } else {
                log_builder.filter(Some(log_group), log_level);
            }
        }
        log_builder.init();
    }

    log::debug!("nplan version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = call_subcommand(&matches) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

fn call_subcommand(matches: &clap::ArgMatches) -> Result<(), CliError> {
    if let Some(matches) = matches.subcommand_matches(CommandKeyfile::CMD) {
        CommandKeyfile::handle(matches)
    } else if let Some(matches) = matches.subcommand_matches(CommandGet::CMD)
    {
        CommandGet::handle(matches)
    } else if let Some(matches) =
        matches.subcommand_matches(CommandValidate::CMD)
    {
        CommandValidate::handle(matches)
    } else if let Some(matches) = matches.subcommand_matches(CommandDiff::CMD)
    {
        CommandDiff::handle(matches)
    } else {
        Err(CliError::from("Unknown command"))
    }
}

pub(crate) fn conf_from_matches(matches: &clap::ArgMatches) -> NplanConf {
    NplanConf::new(matches.get_one::<String>("ROOT_DIR").map(Path::new))
}
