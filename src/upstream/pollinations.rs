use super::{GenerationBackend, ImageDimensions};
use crate::error::UpstreamError;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_IMAGE_API_URL: &str = "https://image.pollinations.ai/prompt";
pub const DEFAULT_TEXT_API_URL: &str = "https://text.pollinations.ai";
pub const DEFAULT_IMAGE_MODEL: &str = "flux";

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Prompt is appended as the last path segment.
    pub image_base_url: String,
    pub text_base_url: String,
    pub image_model: String,
    /// Transport timeout for the whole request.
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            image_base_url: DEFAULT_IMAGE_API_URL.to_string(),
            text_base_url: DEFAULT_TEXT_API_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// HTTP client for the image and text generation API.
pub struct PollinationsClient {
    client: Client,
    config: UpstreamConfig,
}

impl PollinationsClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        for base in [&config.image_base_url, &config.text_base_url] {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(UpstreamError::InvalidBaseUrl(base.clone()));
            }
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn image_url(&self, prompt: &str, dimensions: ImageDimensions) -> String {
        format!(
            "{}/{}?width={}&height={}&model={}&nologo=true&enhance=true",
            self.config.image_base_url.trim_end_matches('/'),
            urlencoding::encode(prompt),
            dimensions.width,
            dimensions.height,
            urlencoding::encode(&self.config.image_model),
        )
    }

    pub fn text_url(&self, prompt: &str) -> String {
        format!(
            "{}/{}",
            self.config.text_base_url.trim_end_matches('/'),
            urlencoding::encode(prompt)
        )
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, UpstreamError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "upstream responded");
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl GenerationBackend for PollinationsClient {
    async fn generate_image(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<Vec<u8>, UpstreamError> {
        let response = self.fetch(&self.image_url(prompt, dimensions)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, UpstreamError> {
        let response = self.fetch(&self.text_url(prompt)).await?;
        Ok(response.text().await?)
    }
}
