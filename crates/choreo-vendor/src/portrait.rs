//! Character portrait generation via a text-to-image service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use choreo_models::{Character, CharacterRequest};

use crate::config::AiConfig;
use crate::error::{VendorError, VendorResult};

pub const PORTRAIT_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default, alias = "b64_json")]
    base64: Option<String>,
}

/// Generates character portraits synchronously.
#[derive(Debug, Clone)]
pub struct PortraitClient {
    http: Client,
    config: AiConfig,
}

impl PortraitClient {
    pub fn new(http: Client, config: AiConfig) -> Self {
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Validate the request, generate a portrait and return the new character.
    pub async fn generate(&self, request: &CharacterRequest) -> VendorResult<Character> {
        request.validate_request()?;
        let api_key = self.config.require_api_key()?;
        let prompt = request.portrait_prompt();

        let url = format!("{}/images/generations", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&ImageRequest {
                model: &self.config.image_model,
                prompt: &prompt,
                size: PORTRAIT_SIZE,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::upstream(Some(status.as_u16()), message));
        }

        let image: ImageResponse = response.json().await?;
        let base64 = image
            .data
            .into_iter()
            .next()
            .and_then(|d| d.base64)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| VendorError::invalid_response("Failed to generate character image"))?;

        info!(name = %request.name.trim(), "Generated character portrait");
        Ok(Character::new(request.name.trim(), request.description.trim()).with_portrait(base64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PortraitClient {
        PortraitClient::new(
            Client::new(),
            AiConfig {
                api_key: Some("ai-key".into()),
                base_url: server.uri(),
                ..AiConfig::default()
            },
        )
    }

    fn request() -> CharacterRequest {
        CharacterRequest {
            name: "Joey".into(),
            description: "a scrappy street fighter".into(),
        }
    }

    #[tokio::test]
    async fn test_generate_returns_character_with_portrait() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"base64": "aGVsbG8="}]})))
            .expect(1)
            .mount(&server)
            .await;

        let character = client(&server).generate(&request()).await.unwrap();
        assert_eq!(character.name, "Joey");
        assert_eq!(character.image_base64.as_deref(), Some("aGVsbG8="));
        assert!(character.id.starts_with("char-"));
    }

    #[tokio::test]
    async fn test_generate_validates_before_calling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(&CharacterRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VendorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_generate_empty_data_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, VendorError::InvalidResponse(_)));
    }
}
