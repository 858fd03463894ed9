use std::collections::BTreeMap;

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStoreExt, PutOptions, PutPayload, TagSet,
};

use crate::keys::validate_key;
use crate::traits::{PutObject, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    fn map_error(key: &str, err: object_store::Error) -> StorageError {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::BackendError(other.to_string()),
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put_object(&self, object: PutObject) -> StorageResult<String> {
        validate_key(&object.key)?;
        let location = Path::from(object.key.clone());
        let size = object.data.len() as u64;

        let mut tags = TagSet::default();
        for (key, value) in &object.tags {
            tags.push(key, value);
        }

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, object.content_type.into());
        for (key, value) in object.metadata {
            attributes.insert(Attribute::Metadata(key.into()), value.into());
        }

        let opts = PutOptions {
            tags,
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result = object_store::ObjectStore::put_opts(
            &self.store,
            &location,
            PutPayload::from(object.data),
            opts,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %object.key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %object.key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        // Prefer the version id, then the ETag, then the key itself
        Ok(result.version.or(result.e_tag).unwrap_or(object.key))
    }

    async fn get_object(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        let location = Path::from(key.to_string());

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| Self::map_error(key, e))?;

        let mut content_type = None;
        let mut metadata = BTreeMap::new();
        for (attribute, value) in result.attributes.iter() {
            match attribute {
                Attribute::ContentType => content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    metadata.insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }

        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(StoredObject {
            data,
            content_type,
            metadata,
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let location = Path::from(key.to_string());

        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let location = Path::from(key.to_string());
        let opts = GetOptions {
            head: true,
            ..Default::default()
        };

        match object_store::ObjectStore::get_opts(&self.store, &location, opts).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(Self::map_error(key, e)),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
