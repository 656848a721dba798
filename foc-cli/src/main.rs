//! FOC CLI - Command line tool for farm operation cost templates.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "foc-cli",
    version,
    about = "Farm Operations Center cost template toolkit"
)]
struct Cli {
    /// Path to the SQLite store holding templates and session state
    #[arg(long, global = true, default_value = "operations.sqlite")]
    store: String,

    #[command(subcommand)]
    command: foc_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    foc_cmd::run(&cli.store, cli.command)
}
