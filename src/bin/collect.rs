use anyhow::{Context, Result};
use price_insights::config::PipelineSettings;
use price_insights::pipeline::run_collect;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    price_insights::init_logging();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let mut settings = PipelineSettings::load(PipelineSettings::config_path_from_args(&args))
        .context("Failed to load pipeline configuration")?;

    if let Some(query) = flag_value(&args, "--query") {
        settings.collector.scraping.query = query.to_string();
    }
    if let Some(pages) = flag_value(&args, "--pages") {
        settings.collector.scraping.max_pages = pages
            .parse()
            .with_context(|| format!("--pages expects a positive number, got '{}'", pages))?;
    }

    run_collect(&settings).await?;
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(|s| s.as_str())
}
