//! Turns captured screenshot bytes into the `previewImage` string carried
//! by a project. Production uploads to object storage; the inline store
//! keeps everything in the document as a data URL.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::info;

use super::RenderError;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists PNG bytes for `(owner, repo)` and returns the string to
    /// embed as the project's preview image.
    async fn store_png(&self, owner: &str, repo: &str, bytes: Vec<u8>)
        -> Result<String, RenderError>;
}

fn object_key(owner: &str, repo: &str) -> String {
    format!("previews/{owner}/{repo}.png")
}

/// Uploads previews to S3-compatible storage and returns their public URL.
pub struct S3ImageStore {
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageStore {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            s3,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store_png(
        &self,
        owner: &str,
        repo: &str,
        bytes: Vec<u8>,
    ) -> Result<String, RenderError> {
        let key = object_key(owner, repo);

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("image/png")
            .send()
            .await
            .map_err(|e| RenderError::Upload(e.to_string()))?;

        info!("Uploaded preview to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{key}", self.public_base_url))
    }
}

/// Embeds the screenshot directly in the document as a base64 data URL.
/// No external storage involved, at the cost of document size.
pub struct InlineImageStore;

#[async_trait]
impl ImageStore for InlineImageStore {
    async fn store_png(
        &self,
        _owner: &str,
        _repo: &str,
        bytes: Vec<u8>,
    ) -> Result<String, RenderError> {
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_is_namespaced_by_owner_and_repo() {
        assert_eq!(object_key("ada", "gitfolio"), "previews/ada/gitfolio.png");
    }

    #[tokio::test]
    async fn test_inline_store_produces_data_url() {
        let image = InlineImageStore
            .store_png("ada", "gitfolio", vec![0x89, 0x50, 0x4e, 0x47])
            .await
            .unwrap();
        assert_eq!(image, "data:image/png;base64,iVBORw==");
    }
}
