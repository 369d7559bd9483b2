// SPDX-License-Identifier: Apache-2.0

use nplan::{Parser, State};

use crate::{conf_from_matches, CliError};

pub(crate) struct CommandGet;

impl CommandGet {
    pub(crate) const CMD: &str = "get";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new("get")
            .alias("g")
            .about("Show the merged and validated configuration")
            .arg(
                clap::Arg::new("ID")
                    .required(false)
                    .index(1)
                    .help("Only show this definition"),
            )
            .arg(
                clap::Arg::new("JSON")
                    .long("json")
                    .short('j')
                    .action(clap::ArgAction::SetTrue)
                    .help("Show in JSON format"),
            )
    }

    pub(crate) fn handle(matches: &clap::ArgMatches) -> Result<(), CliError> {
        let conf = conf_from_matches(matches);
        let mut parser = Parser::new(&conf);
        parser.load_hierarchy()?;
        let state = State::new(parser)?;

        let value = match matches.get_one::<String>("ID") {
            Some(id) => state.netdef_to_value(id)?,
            None => state.to_value()?,
        };
        if matches.get_flag("JSON") {
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            print!("{}", serde_yaml::to_string(&value)?);
        }
        Ok(())
    }
}
