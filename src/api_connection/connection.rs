use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::{debug, warn};

use super::endpoints::{AvailableModel, Provider, ResponsesRequest, ResponsesResponse, OPENAI_MODELS, OPENAI_RESPONSES_URL};

/// Error bodies are cut to this many characters before being reported.
pub const ERROR_BODY_LIMIT: usize = 400;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("API returned no text output")]
    EmptyResponse,
}

/// First `limit` characters of `body`.
pub fn truncate_body(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

impl Provider {
    pub fn openai(api_key_env_var_name: &str) -> Self {
        dotenv().ok();
        Self::OpenAi {
            api_key: api_key_env_var_name.to_string(),
            base_url: OPENAI_RESPONSES_URL.to_string(),
            available_models: OPENAI_MODELS.to_vec(),
        }
    }

    /// Same provider against another Responses-compatible endpoint.
    pub fn with_base_url(self, url: impl Into<String>) -> Self {
        match self {
            Provider::OpenAi {
                api_key,
                available_models,
                ..
            } => Provider::OpenAi {
                api_key,
                base_url: url.into(),
                available_models,
            },
        }
    }

    pub fn get_available_models(&self) -> Vec<AvailableModel> {
        match self {
            Provider::OpenAi {
                available_models, ..
            } => available_models.clone(),
        }
    }

    /// Sends one Responses API call and returns the generated text.
    ///
    /// Any non-200 status fails with the status and the start of the body.
    pub async fn call_responses(&self, request: &ResponsesRequest) -> Result<String, ApiConnectionError> {
        match self {
            Provider::OpenAi {
                api_key: api_key_env_var_name,
                base_url,
                ..
            } => {
                dotenv().ok();
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                debug!("POST {} with model {}", base_url, request.model);
                let response = Client::new()
                    .post(base_url)
                    .bearer_auth(actual_api_key)
                    .header("Content-Type", "application/json")
                    .json(request)
                    .send()
                    .await?;

                let status = response.status();
                let body = response.text().await?;
                if status != reqwest::StatusCode::OK {
                    warn!("Generator answered {}", status);
                    return Err(ApiConnectionError::ApiError {
                        status,
                        error_body: truncate_body(&body, ERROR_BODY_LIMIT),
                    });
                }

                let parsed: ResponsesResponse = serde_json::from_str(&body)?;
                let text = parsed.text();
                if text.trim().is_empty() {
                    return Err(ApiConnectionError::EmptyResponse);
                }
                Ok(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_counts_chars() {
        let body = "é".repeat(500);
        let cut = truncate_body(&body, ERROR_BODY_LIMIT);
        assert_eq!(cut.chars().count(), 400);
        assert_eq!(truncate_body("short", ERROR_BODY_LIMIT), "short");
    }

    #[test]
    fn test_api_error_message_has_status() {
        let err = ApiConnectionError::ApiError {
            status: reqwest::StatusCode::UNAUTHORIZED,
            error_body: "invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "API error 401 Unauthorized: invalid key");
    }

    #[test]
    fn test_provider_models() {
        let provider = Provider::openai("SOME_KEY_VAR");
        assert!(provider
            .get_available_models()
            .iter()
            .any(|m| m.model_name == "gpt-4.1-mini"));
    }
}
