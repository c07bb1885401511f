use clap::Parser;
use std::process::ExitCode;

use skyledger_api::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries the JSON result only.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyledger_api=debug,skyledger_booking=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(output) => {
            println!("{:#}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let report = err.report();
            match serde_json::to_string(&report) {
                Ok(line) => eprintln!("{}", line),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::from(err.exit_code())
        }
    }
}
