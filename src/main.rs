use clap::Parser;
use ratings_scrape::config::{load_cookies, Args, RunConfig};
use ratings_scrape::logging::init_logger;
use ratings_scrape::process::process_ratings;
use ratings_scrape::request::HttpFetcher;
use ratings_scrape::Result;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logger(&args.log_file);

    let res = run(&args).await;
    if let Err(e) = &res {
        error!("Run failed: {e:?}");
    }
    res
}

async fn run(args: &Args) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let cookies = load_cookies(&args.cookies).await?;
    let fetcher = HttpFetcher::new(&cookies)?;

    process_ratings(&config, &fetcher).await?;
    Ok(())
}
