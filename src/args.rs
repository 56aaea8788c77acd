use tracing_subscriber::filter::LevelFilter;

use crate::env::Env;
use crate::error::Error;
use crate::log;

use super::commands::Command;

#[derive(Clone, Debug, clap::Parser)]
#[command(version, disable_help_subcommand = true)]
pub struct Args {
    /// Verbosity of the log output on stderr
    #[arg(
        short = 'v',
        long = "verbosity",
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = log::parse_level,
    )]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        let _guard = log::init(&env, self.verbosity);
        self.command.execute(env)
    }
}
