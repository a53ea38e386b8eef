use object_store::{
    aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder, local::LocalFileSystem,
    path::Path as ObjectPath, ObjectStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::error::InsightsError;

/// Reads a whole CSV source: a local path, or a `file://`, `s3://` or `gs://` URL.
pub async fn read_source(source_path: &str) -> Result<Vec<u8>, InsightsError> {
    let (store, object_path) = open_source(source_path)?;

    info!("Reading source {} as {}", source_path, object_path);

    let bytes = store.get(&object_path).await?.bytes().await?;

    info!("Read {} bytes from {}", bytes.len(), source_path);
    Ok(bytes.to_vec())
}

fn open_source(source_path: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath), InsightsError> {
    let url = match Url::parse(source_path) {
        // Single-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => url,
        _ => return open_local(Path::new(source_path)),
    };

    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| InsightsError::UnsupportedInput {
                    message: format!("Invalid file URL: {}", source_path),
                })?;
            open_local(&path)
        }
        "s3" => {
            let bucket = bucket_of(&url, "S3")?;
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| InsightsError::ConfigError {
                    message: format!("Failed to create S3 client: {}", e),
                })?;
            Ok((Arc::new(store), object_path_of(&url)))
        }
        "gs" => {
            let bucket = bucket_of(&url, "GCS")?;
            let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket);
            if let Ok(service_account_path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
                builder = builder.with_service_account_path(service_account_path);
            }
            let store = builder.build().map_err(|e| InsightsError::ConfigError {
                message: format!("Failed to create GCS client for bucket '{}': {}", bucket, e),
            })?;
            Ok((Arc::new(store), object_path_of(&url)))
        }
        scheme => Err(InsightsError::UnsupportedInput {
            message: format!("Unsupported storage scheme: {}", scheme),
        }),
    }
}

fn open_local(path: &Path) -> Result<(Arc<dyn ObjectStore>, ObjectPath), InsightsError> {
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let object_path =
        ObjectPath::from_filesystem_path(&absolute).map_err(|_| InsightsError::SourceNotFound {
            path: absolute.display().to_string(),
        })?;

    Ok((Arc::new(LocalFileSystem::new()), object_path))
}

fn bucket_of<'a>(url: &'a Url, provider: &str) -> Result<&'a str, InsightsError> {
    url.host_str().ok_or_else(|| InsightsError::UnsupportedInput {
        message: format!("Invalid {} URL: missing bucket", provider),
    })
}

fn object_path_of(url: &Url) -> ObjectPath {
    ObjectPath::from(url.path().trim_start_matches('/'))
}
