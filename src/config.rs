use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Run configuration. Everything a run needs arrives through this struct;
/// nothing is read from ambient globals.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bucket receiving the produced files; the warehouse COPYs from here.
    pub bucket: String,
    /// IAM role ARN the warehouse assumes when reading the bucket.
    pub iam_role: String,

    /// Location of the source dataset.
    pub source_bucket: String,
    pub source_key: String,

    // Warehouse connection parameters.
    pub warehouse_endpoint: String,
    pub warehouse_port: u16,
    pub warehouse_db: String,
    pub warehouse_user: String,
    pub warehouse_password: String,

    /// Local directory the transform writes to. Blob keys stay fixed at
    /// `data/<file>` regardless of this setting.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config `{path}`"))?;
        let config =
            serde_json::from_str(&content).with_context(|| format!("parsing config `{path}`"))?;
        Ok(config)
    }
}
