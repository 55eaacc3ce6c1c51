use clap::Parser;

use estimator_lib::Cli;

fn main() -> anyhow::Result<()> {
    estimator_lib::run(Cli::parse())
}
