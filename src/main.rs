use clap::Parser;
use levtrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
