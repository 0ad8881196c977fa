use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug)]
pub struct ImageHostError(pub String);

impl std::fmt::Display for ImageHostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ImageHostError {}

/// Returns the content type when the payload starts with a known
/// image signature. Validation happens before any upstream call.
#[must_use]
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    None
}

#[async_trait]
pub trait ImageHost: Send + Sync + 'static {
    /// Single synchronous round trip to the host; returns the public
    /// URL of the stored image.
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, ImageHostError>;
}

pub struct HttpImageHost {
    client: reqwest::Client,
    upload_url: String,
    api_key: Option<String>,
}

impl HttpImageHost {
    pub fn new(
        upload_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageHostError(format!("image client build failed: {e}")))?;
        Ok(Self {
            client,
            upload_url,
            api_key,
        })
    }
}

#[derive(serde::Deserialize)]
struct UploadReply {
    url: String,
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, ImageHostError> {
        let mut req = self
            .client
            .post(&self.upload_url)
            .header("content-type", content_type)
            .body(bytes.to_vec());
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ImageHostError(format!("image upload failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(ImageHostError(format!(
                "image host returned {}",
                resp.status()
            )));
        }
        let reply: UploadReply = resp
            .json()
            .await
            .map_err(|e| ImageHostError(format!("image host reply malformed: {e}")))?;
        Ok(reply.url)
    }
}

/// Test double: accepts anything image-shaped and returns a
/// deterministic URL.
#[derive(Default)]
pub struct FakeImageHost;

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, ImageHostError> {
        let suffix = match content_type {
            "image/png" => "png",
            "image/gif" => "gif",
            _ => "jpg",
        };
        Ok(format!("https://img.invalid/u-{}.{suffix}", bytes.len()))
    }
}
