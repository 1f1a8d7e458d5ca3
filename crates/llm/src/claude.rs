//! Anthropic Messages API backend: the default `Llm` implementation wired
//! into the binary when no other backend is configured. Every capability
//! method (`generate_question`, `evaluate_response`, `generate_debrief`,
//! `generate_text`) is a single-turn non-tool call against the same
//! endpoint; only the prompt and response parsing differ.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::traits::{EvaluationResult, EvaluationVerdict, Llm, TextStream};

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    pub endpoint: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            endpoint: "https://api.anthropic.com".to_string(),
        }
    }
}

pub struct ClaudeLlm {
    config: ClaudeConfig,
    client: Client,
}

impl ClaudeLlm {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.endpoint))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(parsed.content.into_iter().map(|block| block.text).collect::<Vec<_>>().join(""))
    }
}

#[async_trait]
impl Llm for ClaudeLlm {
    async fn generate_question(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    fn generate_question_streaming<'a>(&'a self, prompt: &'a str) -> TextStream<'a> {
        Box::pin(async_stream::stream! {
            match self.complete(prompt).await {
                Ok(text) => yield Ok(text),
                Err(e) => yield Err(e),
            }
        })
    }

    async fn evaluate_response(&self, prompt: &str) -> Result<EvaluationResult, LlmError> {
        let raw = self.complete(prompt).await?;
        parse_evaluation(&raw)
    }

    async fn generate_debrief(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    verdict: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    follow_up_question: Option<String>,
}

/// Evaluation prompts (`prompts::build_evaluation_prompt`) ask the model for
/// a JSON object with `verdict`/`reasoning`/`follow_up_question` — the same
/// defensive-parse convention `llm::claims` uses for its JSON payloads.
/// Anything that fails to parse, or names an unrecognized verdict, defaults
/// to satisfied rather than leaving an exchange stuck.
fn parse_evaluation(raw: &str) -> Result<EvaluationResult, LlmError> {
    let json_slice = extract_json_object(raw).unwrap_or(raw.trim());
    let parsed: RawEvaluation = match serde_json::from_str(json_slice) {
        Ok(v) => v,
        Err(_) => {
            return Ok(EvaluationResult {
                verdict: EvaluationVerdict::Satisfied,
                reasoning: String::new(),
                follow_up_question: None,
            })
        }
    };

    let verdict = match parsed.verdict.to_lowercase().as_str() {
        "follow_up" => EvaluationVerdict::FollowUp,
        "escalate" => EvaluationVerdict::Escalate,
        _ => EvaluationVerdict::Satisfied,
    };

    Ok(EvaluationResult {
        verdict,
        reasoning: parsed.reasoning,
        follow_up_question: parsed.follow_up_question,
    })
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_satisfied_by_default_on_garbage_input() {
        let result = parse_evaluation("Looks good, that fully answers it.").unwrap();
        assert_eq!(result.verdict, EvaluationVerdict::Satisfied);
        assert!(result.follow_up_question.is_none());
    }

    #[test]
    fn parses_satisfied_verdict_and_reasoning() {
        let result = parse_evaluation(
            r#"{"verdict": "satisfied", "reasoning": "cited a named source", "follow_up_question": null}"#,
        )
        .unwrap();
        assert_eq!(result.verdict, EvaluationVerdict::Satisfied);
        assert_eq!(result.reasoning, "cited a named source");
        assert!(result.follow_up_question.is_none());
    }

    #[test]
    fn parses_follow_up_verdict() {
        let result = parse_evaluation(
            r#"{"verdict": "follow_up", "reasoning": "dodged the question", "follow_up_question": "But what about churn?"}"#,
        )
        .unwrap();
        assert_eq!(result.verdict, EvaluationVerdict::FollowUp);
        assert_eq!(result.reasoning, "dodged the question");
        assert_eq!(result.follow_up_question.as_deref(), Some("But what about churn?"));
    }

    #[test]
    fn parses_escalate_verdict() {
        let result = parse_evaluation(
            r#"{"verdict": "escalate", "reasoning": "contradicts slide 3", "follow_up_question": "That contradicts slide 3, which is it?"}"#,
        )
        .unwrap();
        assert_eq!(result.verdict, EvaluationVerdict::Escalate);
        assert_eq!(result.follow_up_question.as_deref(), Some("That contradicts slide 3, which is it?"));
    }

    #[test]
    fn tolerates_surrounding_prose_around_the_json_object() {
        let result = parse_evaluation(
            "Sure, here's my assessment:\n{\"verdict\": \"follow_up\", \"reasoning\": \"vague\", \"follow_up_question\": \"Can you clarify?\"}\nLet me know if you need more.",
        )
        .unwrap();
        assert_eq!(result.verdict, EvaluationVerdict::FollowUp);
        assert_eq!(result.follow_up_question.as_deref(), Some("Can you clarify?"));
    }

    #[test]
    fn default_config_reads_model_and_endpoint() {
        let config = ClaudeConfig::default();
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.endpoint, "https://api.anthropic.com");
    }
}
