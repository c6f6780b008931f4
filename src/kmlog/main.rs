use clap::Parser;
use console::{ConsoleOptions, run_console};
use kmbench::{error::KmResult, util::init_tracing};

mod console;

/// Serial console that logs everything the device prints
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    console: ConsoleOptions,
}

fn main() -> KmResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.console.verbose);

    run_console(cli.console)
}
