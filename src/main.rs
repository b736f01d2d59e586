use clap::Parser;
use trendsim::cli::{Cli, run};
use trendsim::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "info" });
    run(cli)
}
