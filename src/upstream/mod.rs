//! Calls out to the external generation API.

pub mod pollinations;

pub use pollinations::{PollinationsClient, UpstreamConfig};

use crate::error::UpstreamError;

/// Pixel size requested from the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One upstream attempt per call; implementations do not retry.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Raw image bytes for `prompt`.
    async fn generate_image(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<Vec<u8>, UpstreamError>;

    async fn generate_text(&self, prompt: &str) -> Result<String, UpstreamError>;
}
