use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{primitives::ByteStream, Client};

use super::ObjectStore;
use crate::error::EtlError;

/// S3-backed blob store.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default credential chain (env, profile,
    /// instance metadata).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transfer(bucket, key, e))?;

        let collected = resp
            .body
            .collect()
            .await
            .map_err(|e| transfer(bucket, key, e))?;
        Ok(collected.into_bytes().to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), EtlError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| transfer(bucket, key, e))?;
        Ok(())
    }
}

fn transfer(bucket: &str, key: &str, err: impl std::fmt::Display) -> EtlError {
    EtlError::Transfer {
        bucket: bucket.to_string(),
        key: key.to_string(),
        reason: err.to_string(),
    }
}
