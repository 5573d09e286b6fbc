use std::process::ExitCode;

use clap::Parser;

use retouch::cli;

fn main() -> ExitCode {
    // Session log (overwrites the previous session's log)
    retouch::logger::init();

    let args = cli::CliArgs::parse();
    cli::run(args)
}
