use anyhow::{Context, Result};
use price_insights::config::PipelineSettings;
use price_insights::dashboard::{run_cli_check, serve};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    price_insights::init_logging();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let settings = PipelineSettings::load(PipelineSettings::config_path_from_args(&args))
        .context("Failed to load pipeline configuration")?;

    if args.iter().any(|arg| arg == "--cli") {
        return Ok(match run_cli_check(&settings, &mut std::io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                println!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        });
    }

    serve(&settings).await?;
    Ok(ExitCode::SUCCESS)
}
