//! Extract stage: pull the source object out of the blob store and parse
//! it into an in-memory table.

pub mod s3;

use async_trait::async_trait;
use tracing::info;

use crate::error::EtlError;
use crate::table::Table;

/// Blob-store collaborator: plain get/put of whole objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError>;
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), EtlError>;
}

/// Fetch `s3://{bucket}/{key}` and parse it as a header-first CSV.
pub async fn fetch_sales_table(
    store: &impl ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Table, EtlError> {
    let bytes = store.get(bucket, key).await?;
    info!(bucket, key, bytes = bytes.len(), "fetched source object");

    let table = Table::from_csv_bytes(&bytes)?;
    info!(
        rows = table.rows.len(),
        columns = table.headers.len(),
        "parsed source table"
    );
    Ok(table)
}
