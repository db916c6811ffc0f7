use clap::Parser;
use neurolearn_app::platform::{self, cli::Cli};

fn main() -> anyhow::Result<()> {
    platform::run(Cli::parse())
}
