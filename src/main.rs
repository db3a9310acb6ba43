use clap::Parser;
use guidebuilder::app::App;
use guidebuilder::cli::Args;
use guidebuilder::config::Config;
use guidebuilder::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Config is needed before logging, so report load failures directly
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        lineups = config.lineups.len(),
        "starting guidebuilder"
    );

    let app = App::new(config, args.output, !args.no_cache_prune);
    match app.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "Guide build failed");
            ExitCode::FAILURE
        }
    }
}
