use clap::Parser;
use page_harvester::browser::ChromiumFetcher;
use page_harvester::config::{Args, Config};
use page_harvester::{crawler, sink, Extractor};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,chromiumoxide=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    let config = Config::from_path(&args.config)?;
    let extractor = Extractor::new(&config.content)?;
    info!(
        "Loaded {} urls and {} fields from {}",
        config.urls.len(),
        config.content.len(),
        args.config.display()
    );

    let mut fetcher = ChromiumFetcher::launch(&config.browser).await?;
    let mut records = Vec::with_capacity(config.urls.len());
    let processed = crawler::process(&mut fetcher, &config.urls, &extractor, &mut records).await;
    let closed = fetcher.close().await;

    crawler::settle(processed, closed, records.len(), config.urls.len())?;

    sink::save(&records, &config.output).await?;
    Ok(())
}
