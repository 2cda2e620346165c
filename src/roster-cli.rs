//! A small operations tool for identity roster files.
//! Validate a roster before deploying it, or compute the stored digest for a
//! given national ID when investigating a registration.

use clap::{Arg, ArgAction, ArgMatches, Command};

use civix_backend::model::api::NationalId;
use civix_backend::roster::{IdentityRoster, RosterError};

const PROGRAM_NAME: &str = "roster-cli";

const ABOUT_TEXT: &str = "Inspect and debug identity roster files.

EXIT CODES:
     0: Success.
   255: Ran successfully, but the roster is invalid.
 Other: Error.";

const CHECK: &str = "check";
const DIGEST: &str = "digest";

const ROSTER_PATH: &str = "ROSTER_PATH";
const ROSTER_PATH_HELP: &str = "The path to a roster JSON file,\n\
as loaded by the server's `roster_path` config";

const NATIONAL_ID: &str = "NATIONAL_ID";
const HMAC_SECRET: &str = "HMAC_SECRET";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CHECK).about("Validate a roster file").arg(
                Arg::new(ROSTER_PATH)
                    .help(ROSTER_PATH_HELP)
                    .action(ArgAction::Set)
                    .required(true),
            ),
        )
        .subcommand(
            Command::new(DIGEST)
                .about("Compute the digest stored for a national ID")
                .arg(
                    Arg::new(NATIONAL_ID)
                        .help("The twelve-digit national ID to digest")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(HMAC_SECRET)
                        .help("The `hmac_secret` the server is configured with")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
}

/// Validate the roster file at the given path.
fn check(path: &str) -> u8 {
    match IdentityRoster::from_file(path) {
        Ok(roster) => {
            println!("Roster OK: {} entries", roster.len());
            0
        }
        Err(RosterError::Io(err)) => {
            println!("IO error: {err}");
            1
        }
        Err(err) => {
            println!("Invalid roster: {err}");
            255
        }
    }
}

/// Print the digest the server would store and look up for this ID.
fn digest(national_id: &str, secret: &str) -> u8 {
    match national_id.parse::<NationalId>() {
        Ok(id) => {
            println!("{}", id.hmac_with_key(secret.as_bytes()));
            0
        }
        Err(err) => {
            println!("Invalid national ID: {err}");
            1
        }
    }
}

/// Dispatch to the requested subcommand and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    match args.subcommand() {
        Some((CHECK, sub)) => {
            // Required arguments are guaranteed to be present.
            let path: &String = sub.get_one(ROSTER_PATH).unwrap();
            check(path)
        }
        Some((DIGEST, sub)) => {
            let national_id: &String = sub.get_one(NATIONAL_ID).unwrap();
            let secret: &String = sub.get_one(HMAC_SECRET).unwrap();
            digest(national_id, secret)
        }
        _ => unreachable!("Subcommand is required"),
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
