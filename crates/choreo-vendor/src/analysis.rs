//! Natural-language scene analysis via a chat-completion service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use choreo_models::ActionAnalysis;

use crate::config::AiConfig;
use crate::error::{VendorError, VendorResult};

const SYSTEM_PROMPT: &str = "You are an expert action choreographer and fight director with deep \
knowledge of cinematography and visual storytelling.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Prompt asking for a structured breakdown of `text`.
pub fn build_analysis_prompt(text: &str, context: Option<&str>) -> String {
    let context = context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("No additional context provided");

    format!(
        r#"You are an expert action choreographer and fight director. Analyze the following action description and extract structured information:

Text: "{text}"

Context: {context}

Please provide a JSON response with the following structure:
{{
  "actions": [
    {{
      "character": "character_name",
      "action": "specific_action_description",
      "intent": "attack|defend|move|interact|emote",
      "intensity": "low|medium|high",
      "camera_suggestion": "suggested_camera_movement",
      "lighting_suggestion": "suggested_lighting",
      "duration_estimate": estimated_duration_in_seconds
    }}
  ],
  "scene_analysis": {{
    "overall_tone": "dramatic|intense|chaotic|tactical|emotional",
    "pacing": "slow|medium|fast|variable",
    "suggested_camera_work": ["camera_suggestion_1", "camera_suggestion_2"],
    "suggested_lighting": "lighting_suggestion",
    "complexity_score": score_1_10,
    "estimated_duration": total_estimated_duration
  }},
  "enhanced_description": "enhanced_cinematic_description",
  "storyboard_suggestions": ["suggestion_1", "suggestion_2", "suggestion_3"]
}}

Focus on:
1. Identifying specific characters and their actions
2. Understanding the intent and intensity of each action
3. Suggesting appropriate camera movements and lighting
4. Estimating realistic durations for each action
5. Providing cinematic enhancements to the description
6. Breaking down complex sequences into individual storyboard nodes

Return only valid JSON."#
    )
}

/// Strip a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse a model reply into an [`ActionAnalysis`].
pub fn parse_analysis(content: &str) -> VendorResult<ActionAnalysis> {
    serde_json::from_str(strip_code_fence(content)).map_err(|e| {
        warn!(error = %e, "Failed to parse analysis JSON");
        VendorError::invalid_response(format!("Invalid analysis format: {e}"))
    })
}

/// Chat-completion client that turns action prose into storyboard beats.
#[derive(Debug, Clone)]
pub struct SceneAnalyzer {
    http: Client,
    config: AiConfig,
}

impl SceneAnalyzer {
    pub fn new(http: Client, config: AiConfig) -> Self {
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub async fn analyze(&self, text: &str, context: Option<&str>) -> VendorResult<ActionAnalysis> {
        let api_key = self.config.require_api_key()?;
        let prompt = build_analysis_prompt(text, context);

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::upstream(Some(status.as_u16()), message));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| VendorError::invalid_response("No analysis generated"))?;

        let analysis = parse_analysis(&content)?;
        info!(actions = analysis.actions.len(), "Scene analysis complete");
        Ok(analysis)
    }
}
