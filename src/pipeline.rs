//! Run orchestration: extract → transform → upload → load, strictly
//! sequential, stopping at the first failure with the stage attached.

use tracing::info;

use crate::config::Config;
use crate::error::{PipelineError, Stage};
use crate::fetch::{self, ObjectStore};
use crate::load::{self, warehouse::RedshiftWarehouse};
use crate::process;

/// One full ETL run over one dataset. No state survives between runs;
/// concurrent runs against the same warehouse must be serialized by the
/// operator.
pub struct Pipeline<S: ObjectStore> {
    config: Config,
    store: S,
}

impl<S: ObjectStore> Pipeline<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self { config, store }
    }

    pub async fn run(&self) -> Result<(), PipelineError> {
        // extract
        let table = fetch::fetch_sales_table(
            &self.store,
            &self.config.source_bucket,
            &self.config.source_key,
        )
        .await
        .map_err(|e| PipelineError::new(Stage::Extract, e))?;

        // transform, persisting the star schema locally
        let schema =
            process::transform(&table).map_err(|e| PipelineError::new(Stage::Transform, e))?;
        let written = schema
            .write(&self.config.data_dir)
            .map_err(|e| PipelineError::new(Stage::Transform, e))?;
        info!(files = written.len(), "transform complete");

        // upload
        load::upload_outputs(&self.store, &self.config.bucket, &self.config.data_dir)
            .await
            .map_err(|e| PipelineError::new(Stage::Upload, e))?;

        // load; the connection is first needed here, so connectivity
        // failures surface as load-stage errors
        let warehouse = RedshiftWarehouse::connect(&self.config)
            .await
            .map_err(|e| PipelineError::new(Stage::Load, e))?;
        load::warehouse::load_warehouse(&warehouse, &self.config)
            .await
            .map_err(|e| PipelineError::new(Stage::Load, e))?;

        Ok(())
    }
}
