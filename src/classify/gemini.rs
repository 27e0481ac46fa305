use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::classify::parser::parse_classification;
use crate::classify::prompts::{ClassificationRequest, SYSTEM_PROMPT};
use crate::classify::provider::ClassifierProvider;
use crate::error::{Error, Result};
use crate::taxonomy::CategorySet;

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    fn text_content(text: &str) -> Content {
        Content {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[async_trait]
impl ClassifierProvider for GeminiProvider {
    async fn classify(&self, request: &ClassificationRequest) -> Result<CategorySet> {
        let prompt = request.to_prompt();
        tracing::debug!(
            "Classifying inspection {} ({} chars of observation text)",
            request.inspection_id,
            request.observation_text.len()
        );

        let body = GenerateContentRequest {
            system_instruction: Self::text_content(SYSTEM_PROMPT),
            contents: vec![Self::text_content(&prompt)],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(Error::RateLimited(retry_after));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Failed to parse response body: {}", e)))?;

        if let Some(error) = result.error {
            return Err(Error::ExternalService(error.message));
        }

        let text = result
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(Error::ExternalService("Empty response from Gemini".to_string()));
        }

        parse_classification(&text)
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}
