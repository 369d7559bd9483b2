// SPDX-License-Identifier: Apache-2.0

use nplan::{Parser, State, SystemState};

use crate::{conf_from_matches, CliError};

pub(crate) struct CommandDiff;

impl CommandDiff {
    pub(crate) const CMD: &str = "diff";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new("diff")
            .about(
                "Show differences between the configuration and a system \
                 state report",
            )
            .arg(
                clap::Arg::new("SYSTEM_STATE")
                    .required(true)
                    .index(1)
                    .help("YAML or JSON interface report of the system"),
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
        let path = matches
            .get_one::<String>("SYSTEM_STATE")
            .ok_or(CliError::from("No system state file given"))?;
        let system = SystemState::new(&std::fs::read_to_string(path)?)?;

        let conf = conf_from_matches(matches);
        let mut parser = Parser::new(&conf);
        parser.load_hierarchy()?;
        let state = State::new(parser)?;

        let diff = state.diff(&system);
        if matches.get_flag("JSON") {
            println!("{}", serde_json::to_string_pretty(&diff)?);
        } else {
            print!("{}", serde_yaml::to_string(&diff)?);
        }
        Ok(())
    }
}
