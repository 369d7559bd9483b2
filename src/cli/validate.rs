// SPDX-License-Identifier: Apache-2.0

use nplan::{Parser, State};

use crate::{conf_from_matches, CliError};

pub(crate) struct CommandValidate;

impl CommandValidate {
    pub(crate) const CMD: &str = "validate";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new("validate")
            .alias("v")
            .about("Load, resolve and validate all documents")
            .arg(
                clap::Arg::new("IGNORE_ERRORS")
                    .long("ignore-errors")
                    .action(clap::ArgAction::SetTrue)
                    .help(
                        "Skip unparsable documents instead of failing, as \
                         done when generating configuration during boot",
                    ),
            )
    }

    pub(crate) fn handle(matches: &clap::ArgMatches) -> Result<(), CliError> {
        let conf = conf_from_matches(matches)
            .ignore_errors(matches.get_flag("IGNORE_ERRORS"));
        let mut parser = Parser::new(&conf);
        parser.load_hierarchy()?;

        let diagnostics = State::check(&parser)?;
        for diagnostic in diagnostics.iter() {
            eprintln!("{diagnostic}");
        }
        let fatal_count = diagnostics.iter().filter(|d| d.is_fatal()).count();
        if fatal_count > 0 {
            Err(CliError::from(format!(
                "{fatal_count} fatal problem(s) found"
            )))
        } else {
            log::info!("{} definition(s) valid", parser.defs().len());
            Ok(())
        }
    }
}
