//! 🪣🚀 S3 backend: the real bucket, with the real invoice.
//!
//! INT. AWS CONSOLE, NIGHT. A lone bucket in us-east-1, slowly filling with
//! weekly charts. Every Monday a collector drops a file. Every so often the
//! consolidator wanders by, lists everything, reads what's new, and leaves a
//! note (`metadata/watermark.txt`) saying where it got to.
//!
//! 🧠 Knowledge graph:
//! - Transport: AWS SDK `ListObjectsV2` (paginated), `GetObject`, `PutObject`
//! - Credentials: the usual chain (env vars → ~/.aws/config → IAM role → hope)
//! - `NoSuchKey` on `GetObject` means absent, which is `Ok(None)`
//! - `PutObject` is whole-object replace, which is the atomicity we need

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::backends::ObjectStore;
use crate::error::ChartError;

/// 🔧 Which bucket, which region.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    /// 🪣 The bucket name. Defaults to `data-engineering`.
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    /// 🌎 Defaults to us-east-1. If you don't choose a region, the region chooses you.
    #[serde(default = "default_s3_region")]
    pub region: String,
}

fn default_s3_bucket() -> String {
    "data-engineering".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

pub(crate) struct S3Store {
    client: aws_sdk_s3::Client,
    config: S3StoreConfig,
}

// 🐛 the SDK client's Debug output is a novel; we only print the config
impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("config", &self.config)
            .finish()
    }
}

impl S3Store {
    /// 🚀 Build the AWS config from the environment and wrap a client.
    ///
    /// No network traffic happens here. The first real call finds out whether
    /// the credentials were a lie.
    pub(crate) async fn new(config: S3StoreConfig) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;
        let client = aws_sdk_s3::Client::new(&aws_config);
        debug!("🪣 S3 store ready for s3://{}", config.bucket);
        Self { client, config }
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.config.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_keys(&self) -> Result<Vec<String>, ChartError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| ChartError::storage(self.uri(""), e))?;
            keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_string)));
        }
        trace!("🪣 listed {} keys in s3://{}", keys.len(), self.config.bucket);
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChartError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(ChartError::storage(self.uri(key), service_error));
            }
        };
        let body = response
            .body
            .collect()
            .await
            .map_err(|e| ChartError::storage(self.uri(key), e))?;
        let bytes = body.into_bytes().to_vec();
        trace!("🪣 hauled {} bytes from {}", bytes.len(), self.uri(key));
        Ok(Some(bytes))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChartError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ChartError::storage(self.uri(key), e.into_service_error()))?;
        debug!("🪣 uploaded {} bytes to {}", size, self.uri(key));
        Ok(())
    }
}
