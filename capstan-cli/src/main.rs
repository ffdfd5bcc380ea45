use capstan_cli::commands;
use capstan_core::cli::{Cli, Command, CreateResource};
use capstan_core::logging;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.clone());

    match &cli.command {
        Command::Create {
            resource: CreateResource::Cluster(args),
        } => commands::create::run(args)?,
    }
    Ok(())
}
