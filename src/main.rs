use anyhow::Result;
use clap::Parser;
use salesmart::{cli::Args, config::Config, fetch::s3::S3Store, pipeline::Pipeline};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) parse args + load config ─────────────────────────────────
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    info!(
        source = %format!("s3://{}/{}", config.source_bucket, config.source_key),
        bucket = %config.bucket,
        warehouse = %config.warehouse_endpoint,
        "configured"
    );

    // ─── 3) build collaborators ──────────────────────────────────────
    let store = S3Store::from_env().await;

    // ─── 4) run the pipeline ─────────────────────────────────────────
    let start = Instant::now();
    let pipeline = Pipeline::new(config, store);
    if let Err(e) = pipeline.run().await {
        error!(stage = %e.stage, "run failed: {e}");
        return Err(e.into());
    }

    info!(elapsed = ?start.elapsed(), "all done");
    Ok(())
}
