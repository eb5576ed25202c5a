use clap::Parser;

/// Normalize a flat retail-sales extract into a star schema and load the
/// warehouse from it.
#[derive(Parser, Debug, Clone)]
#[command(name = "salesmart")]
#[command(about = "Star-schema ETL for retail sales data", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, default_value = "salesmart.json")]
    pub config: String,
}
