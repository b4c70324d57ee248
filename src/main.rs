use anyhow::Result;
use clap::Parser;
use tracing::error;

use wordshot::api::{ApiConfig, HealthClient, HealthServer};
use wordshot::args::{Cli, Commands};
use wordshot::ocr::TesseractCli;
use wordshot::{frequency, screenshot, utils};

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::setup_logging(cli.verbose);
    utils::validate_args(&cli)?;

    match run(cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(action = "abort", component = "cli", err = %e, "Command failed");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Words(args) => {
            let recognizer = TesseractCli::with_language(&args.language)?;
            screenshot::extract_words(&args, &recognizer)
        }
        Commands::Frequency(args) => {
            let analysis = frequency::analyze(&args)?;
            frequency::print_analysis_results(&analysis, &args);
            Ok(())
        }
        Commands::Serve(args) => {
            let cfg = ApiConfig::load(args.config.as_deref())?;
            HealthServer::new(cfg)?.run()
        }
        Commands::Healthcheck(args) => {
            let cfg = ApiConfig::load(args.config.as_deref())?;
            let client =
                HealthClient::with_timeout(&cfg, std::time::Duration::from_secs(args.timeout))?;

            let status = client.check_health()?;
            if !status.is_success() {
                anyhow::bail!("health check returned {status}");
            }
            println!("Server OK ({status})");
            Ok(())
        }
    }
}
