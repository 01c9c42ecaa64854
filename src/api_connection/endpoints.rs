use serde::{Deserialize, Serialize};

pub const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

#[derive(Clone, Debug, Serialize)]
pub struct AvailableModel {
    pub model_name: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub enum Provider {
    OpenAi {
        /// Name of the environment variable holding the key, not the key itself.
        api_key: String,
        base_url: String,
        available_models: Vec<AvailableModel>,
    },
}

pub const OPENAI_MODELS: &[AvailableModel] = &[
    AvailableModel {
        model_name: "gpt-4.1-mini",
        description: "default, fast and cheap",
    },
    AvailableModel {
        model_name: "gpt-4.1",
        description: "better at following strict portions",
    },
    AvailableModel {
        model_name: "gpt-4o-mini",
        description: "legacy",
    },
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

impl InputMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TextFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TextOptions {
    pub format: TextFormat,
}

impl TextOptions {
    pub fn json_object() -> Self {
        Self {
            format: TextFormat {
                format_type: "json_object".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOptions>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputContent {
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

impl ResponsesResponse {
    /// The generated text: `output_text` when present, otherwise every text
    /// part of `output`, newline-joined.
    pub fn text(&self) -> String {
        if let Some(text) = &self.output_text {
            return text.clone();
        }
        self.output
            .iter()
            .flat_map(|o| &o.content)
            .filter_map(|c| c.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
