//! Load stage: push the produced files to the blob store, then bulk-load
//! the warehouse from them.

pub mod warehouse;

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::EtlError;
use crate::fetch::ObjectStore;
use crate::process::OUTPUT_FILES;

/// Upload every produced file to `s3://{bucket}/data/<file>`, mirroring
/// the local layout. Each transfer is independent; an early failure does
/// not roll back prior puts.
pub async fn upload_outputs(
    store: &impl ObjectStore,
    bucket: &str,
    dir: &Path,
) -> Result<(), EtlError> {
    for name in OUTPUT_FILES {
        let path = dir.join(name);
        let data = fs::read(&path).await?;
        let key = format!("data/{name}");
        store.put(bucket, &key, data).await?;
        info!(bucket, key, "uploaded");
    }
    Ok(())
}
