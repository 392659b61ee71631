use clap::Parser;
use governance_scripts::{cli::Cli, errors::ScriptError};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli { command } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    command.run().await
}
