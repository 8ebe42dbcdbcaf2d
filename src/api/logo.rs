use super::{AppState, LOGO_ROUTE, present};
use crate::error::ApiError;
use crate::middleware::ClientId;
use crate::upstream::ImageDimensions;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const PROMPT_REQUIRED: &str = "Prompt is required";

const STYLE_QUALIFIERS: &str = concat!(
    "professional logo design, clean and modern, transparent background, ",
    "high quality, commercial use, vector style, scalable"
);

#[derive(Debug, Default, Deserialize)]
pub struct LogoRequest {
    pub prompt: Option<String>,
    pub ratio: Option<String>,
    pub slogan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoResponse {
    pub success: bool,
    /// PNG as a `data:` URI.
    pub image: String,
    pub prompt: String,
}

/// Supported output shapes; anything else is treated as square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape16x9,
    Portrait9x16,
    Landscape4x3,
    Portrait3x4,
    Wide2x1,
    Tall1x2,
}

impl AspectRatio {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "1:1" => Some(Self::Square),
            "16:9" => Some(Self::Landscape16x9),
            "9:16" => Some(Self::Portrait9x16),
            "4:3" => Some(Self::Landscape4x3),
            "3:4" => Some(Self::Portrait3x4),
            "2:1" => Some(Self::Wide2x1),
            "1:2" => Some(Self::Tall1x2),
            _ => None,
        }
    }

    /// Missing or unknown tokens fall back to square.
    pub fn resolve(token: Option<&str>) -> Self {
        token.and_then(Self::parse).unwrap_or_default()
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Wide2x1 => "2:1",
            Self::Tall1x2 => "1:2",
        }
    }

    pub fn dimensions(self) -> ImageDimensions {
        match self {
            Self::Square => ImageDimensions::new(512, 512),
            Self::Landscape16x9 => ImageDimensions::new(640, 360),
            Self::Portrait9x16 => ImageDimensions::new(360, 640),
            Self::Landscape4x3 => ImageDimensions::new(512, 384),
            Self::Portrait3x4 => ImageDimensions::new(384, 512),
            Self::Wide2x1 => ImageDimensions::new(640, 320),
            Self::Tall1x2 => ImageDimensions::new(320, 640),
        }
    }
}

/// Builds the text sent to the image model.
pub fn build_logo_prompt(prompt: &str, slogan: Option<&str>, ratio: AspectRatio) -> String {
    let text = match slogan.filter(|s| !s.is_empty()) {
        Some(slogan) => format!("incorporate the exact text \"{slogan}\" as a tagline"),
        None => "no text unless specified".to_string(),
    };
    format!(
        "{prompt}, {STYLE_QUALIFIERS}, {text}, {} aspect ratio, balanced composition",
        ratio.token()
    )
}

pub fn encode_png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

pub async fn generate_logo_handler(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<LogoRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<LogoResponse>), ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::Validation(PROMPT_REQUIRED))?;
    let prompt = present(request.prompt).ok_or(ApiError::Validation(PROMPT_REQUIRED))?;

    let headers = state.admit(LOGO_ROUTE, &client, &state.limits.logo).await?;

    let ratio = AspectRatio::resolve(request.ratio.as_deref());
    let full_prompt = build_logo_prompt(&prompt, request.slogan.as_deref(), ratio);
    let dimensions = ratio.dimensions();
    info!(
        client = %client.as_str(),
        width = dimensions.width,
        height = dimensions.height,
        "generating logo"
    );

    let bytes = state
        .backend
        .generate_image(&full_prompt, dimensions)
        .await
        .map_err(ApiError::LogoGeneration)?;

    Ok((
        headers,
        Json(LogoResponse {
            success: true,
            image: encode_png_data_uri(&bytes),
            prompt: full_prompt,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_table() {
        let cases = [
            ("1:1", 512, 512),
            ("16:9", 640, 360),
            ("9:16", 360, 640),
            ("4:3", 512, 384),
            ("3:4", 384, 512),
            ("2:1", 640, 320),
            ("1:2", 320, 640),
        ];
        for (token, width, height) in cases {
            let ratio = AspectRatio::resolve(Some(token));
            assert_eq!(ratio.token(), token);
            assert_eq!(ratio.dimensions(), ImageDimensions::new(width, height));
        }
    }

    #[test]
    fn unknown_ratio_falls_back_to_square() {
        assert_eq!(AspectRatio::resolve(Some("5:4")), AspectRatio::Square);
        assert_eq!(AspectRatio::resolve(None).dimensions(), ImageDimensions::new(512, 512));
    }

    #[test]
    fn prompt_without_slogan() {
        let prompt = build_logo_prompt("a red fox", Some(""), AspectRatio::Landscape16x9);

        assert!(prompt.starts_with("a red fox, professional logo design"));
        assert!(prompt.contains("no text unless specified"));
        assert!(prompt.ends_with("16:9 aspect ratio, balanced composition"));
    }

    #[test]
    fn prompt_with_slogan() {
        let prompt = build_logo_prompt("a bakery", Some("Fresh Daily"), AspectRatio::Square);

        assert!(prompt.contains("\"Fresh Daily\" as a tagline"));
        assert!(!prompt.contains("no text unless specified"));
        assert!(prompt.ends_with("1:1 aspect ratio, balanced composition"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_logo_prompt("owl", Some("Night"), AspectRatio::Tall1x2);
        let b = build_logo_prompt("owl", Some("Night"), AspectRatio::Tall1x2);
        assert_eq!(a, b);
    }

    #[test]
    fn data_uri_prefix() {
        assert_eq!(encode_png_data_uri(b"png"), "data:image/png;base64,cG5n");
    }
}
