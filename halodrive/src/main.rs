mod application;

mod presentation {
    pub mod cli;
}

use std::process::ExitCode;

use clap::Parser;
use halo_core::settings::Settings;
use tracing_subscriber::EnvFilter;

use crate::presentation::cli::Cli;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref());
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    init_tracing(&settings.log_filter);

    match application::run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_retryable() {
                eprintln!("nothing was changed; the command can be retried");
            }
            ExitCode::FAILURE
        }
    }
}
