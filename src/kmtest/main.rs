use clap::Parser;
use harness::{HarnessOptions, run_harness};
use kmbench::{error::KmResult, util::init_tracing};

mod harness;

/// Drive km.* mouse firmware from the keyboard
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    harness: HarnessOptions,
}

fn main() -> KmResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.harness.verbose);

    run_harness(cli.harness)
}
