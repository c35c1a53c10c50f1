use clap::Parser;
use vidna::{cli::Cli, commands, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    vidna::init_logger();
    config::init()?;

    commands::run(cli.command, config::all()).await
}
