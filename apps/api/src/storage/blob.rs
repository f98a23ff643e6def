use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::config::S3Config;
use crate::errors::AppError;

/// Original uploads (resume documents, company logos) in S3 / MinIO.
#[derive(Clone)]
pub struct BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl BlobStore {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "intellihire-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        info!("S3 client initialized (bucket: {})", config.bucket);
        Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Stores `body` under `<prefix>/<owner>/<uuid>-<file_name>` and returns the key.
    pub async fn upload(
        &self,
        prefix: &str,
        owner: &str,
        file_name: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<String, AppError> {
        let key = object_key(prefix, owner, file_name, Uuid::new_v4());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("put {key}: {e}")))?;
        Ok(key)
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete {key}: {e}")))?;
        info!("Deleted orphaned object {key}");
        Ok(())
    }
}

fn object_key(prefix: &str, owner: &str, file_name: &str, id: Uuid) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{prefix}/{owner}/{id}-{safe_name}")
}
