#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod roster;

pub use config::Config;

/// Construct the rocket instance with all routes and fairings attached.
/// The fairings do the heavy lifting of config loading, database connection,
/// and collaborator setup during ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::AwsFairing)
        .attach(config::RosterFairing)
        .attach(config::LedgerFairing)
        .attach(logging::LoggerFairing)
}
