// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use nplan::{keyfile::delete_connection, Parser, State};

use crate::{conf_from_matches, sandbox::restrict_process, CliError};

pub(crate) struct CommandKeyfile;

impl CommandKeyfile {
    pub(crate) const CMD: &str = "keyfile";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new("keyfile")
            .alias("k")
            .about(
                "Import a NetworkManager keyfile into the writable tier, \
                 or remove the document generated for it",
            )
            .arg(
                clap::Arg::new("KEYFILE")
                    .long("keyfile")
                    .short('k')
                    .required(true)
                    .help("Path of the NetworkManager profile"),
            )
            .arg(
                clap::Arg::new("DELETE")
                    .long("delete")
                    .short('d')
                    .action(clap::ArgAction::SetTrue)
                    .help("Remove the document belonging to the profile"),
            )
            .arg(
                clap::Arg::new("SSID")
                    .long("ssid")
                    .short('s')
                    .help("SSID of a wireless profile, used with --delete"),
            )
    }

    pub(crate) fn handle(matches: &clap::ArgMatches) -> Result<(), CliError> {
        let conf = conf_from_matches(matches);
        let path = matches
            .get_one::<String>("KEYFILE")
            .map(Path::new)
            .ok_or_else(|| CliError::from("Missing --keyfile argument"))?;

        if matches.get_flag("DELETE") {
            let ssid = matches.get_one::<String>("SSID").map(String::as_str);
            return match delete_connection(&conf, path, ssid)? {
                Some(true) => Ok(()),
                Some(false) => {
                    log::warn!("No document to remove for {}", path.display());
                    Ok(())
                }
                None => Err(CliError::from(format!(
                    "Cannot derive a definition identifier from {}",
                    path.display()
                ))),
            };
        }

        restrict_process()?;
        let mut parser = Parser::new(&conf);
        parser.load_hierarchy()?;
        let imported = parser.load_keyfile(path)?;
        let filename = imported.filename(&parser).ok_or_else(|| {
            CliError::from(format!("Definition {} vanished", imported.id))
        })?;
        let state = State::new(parser)?;
        state.persist(&conf, &filename)?;
        println!("{filename}");
        Ok(())
    }
}
