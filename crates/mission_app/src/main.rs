use std::process::ExitCode;

use clap::Parser;
use mission_app::app::{init_tracing, run, AppConfig};
use mission_app::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config.with_data_dir(cli.data_dir),
        Err(err) => {
            eprintln!("habitjoy: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    if let Err(err) = run(config, cli.command) {
        tracing::error!(%err, "command failed");
        eprintln!("habitjoy: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
