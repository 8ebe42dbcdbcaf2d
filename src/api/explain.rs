use super::{AppState, EXPLAIN_ROUTE, present};
use crate::error::ApiError;
use crate::middleware::ClientId;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MISSING_FIELDS: &str = "Missing required fields: code, language, and level are required";

#[derive(Debug, Default, Deserialize)]
pub struct ExplainRequest {
    pub code: Option<String>,
    pub language: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub data: String,
    pub success: bool,
}

/// Builds the instruction sent to the text model.
///
/// `level` is matched case-sensitively for the extra numbered item.
pub fn build_explain_prompt(code: &str, language: &str, level: &str) -> String {
    let mut prompt = format!(
        "Explain the following {language} code for a {} level programmer.\n\n\
         ```{}\n{code}\n```\n\n\
         Please provide:\n\
         1. A brief overview of what the code does\n\
         2. A step-by-step breakdown of how it works\n\
         3. Key concepts and patterns used\n\
         4. Potential issues or improvements",
        level.to_lowercase(),
        language.to_lowercase(),
    );
    match level {
        "Beginner" => prompt.push_str("\n5. Basic terminology explanations"),
        "Advanced" | "Expert" => {
            prompt.push_str("\n5. Performance considerations and best practices")
        }
        _ => {}
    }
    prompt
}

pub async fn explain_code_handler(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<ExplainResponse>), ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::Validation(MISSING_FIELDS))?;
    let (Some(code), Some(language), Some(level)) = (
        present(request.code),
        present(request.language),
        present(request.level),
    ) else {
        return Err(ApiError::Validation(MISSING_FIELDS));
    };

    let headers = match &state.limits.explain {
        Some(limit) => state.admit(EXPLAIN_ROUTE, &client, limit).await?,
        None => HeaderMap::new(),
    };

    let prompt = build_explain_prompt(&code, &language, &level);
    info!(
        client = %client.as_str(),
        language = %language,
        level = %level,
        "explaining code"
    );

    let data = state
        .backend
        .generate_text(&prompt)
        .await
        .map_err(ApiError::CodeExplanation)?;

    Ok((
        headers,
        Json(ExplainResponse {
            data,
            success: true,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beginner_gets_terminology() {
        let prompt = build_explain_prompt("x=1", "Python", "Beginner");

        assert!(prompt.starts_with(
            "Explain the following Python code for a beginner level programmer."
        ));
        assert!(prompt.contains("```python\nx=1\n```"));
        assert!(prompt.contains("5. Basic terminology explanations"));
        assert!(!prompt.contains("Performance considerations"));
    }

    #[test]
    fn expert_and_advanced_get_performance() {
        for level in ["Expert", "Advanced"] {
            let prompt = build_explain_prompt("x=1", "Python", level);
            assert!(prompt.contains("Performance considerations and best practices"));
            assert!(!prompt.contains("Basic terminology explanations"));
        }
    }

    #[test]
    fn level_match_is_case_sensitive() {
        let prompt = build_explain_prompt("x=1", "Python", "beginner");

        assert!(prompt.ends_with("4. Potential issues or improvements"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(
            build_explain_prompt("fn main() {}", "Rust", "Intermediate"),
            build_explain_prompt("fn main() {}", "Rust", "Intermediate")
        );
    }
}
