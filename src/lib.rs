//! Signing and verification of DNSSEC zones.
//!
//! The [`zone`] module holds the data model of a zone file, [`dnssec`] the
//! engine that adds authenticated denial of existence, signatures, and
//! zone digests, and [`keys`] the providers of signing keys. The
//! [`commands`] tie them together into the command line tool.

pub mod args;
pub mod commands;
pub mod context;
pub mod dnssec;
pub mod duration;
pub mod env;
pub mod error;
pub mod keys;
pub mod log;
pub mod parse;
pub mod util;
pub mod zone;

use clap::Parser;

pub use args::Args;
use env::Env;
use error::Error;

pub fn parse_args(env: impl Env) -> Result<Args, Error> {
    Args::try_parse_from(env.args_os()).map_err(Error::from)
}

/// Run the program in the given environment, returning the exit code.
pub fn run(env: impl Env) -> u8 {
    let res = parse_args(&env).and_then(|args| args.execute(&env));
    match res {
        Ok(()) => 0,
        Err(err) => {
            err.pretty_print(&env);
            err.exit_code()
        }
    }
}
