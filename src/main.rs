use std::process::ExitCode;

fn main() -> ExitCode {
    zonesigner::run(zonesigner::env::RealEnv).into()
}
