//! A vendor-agnostic HTTP `BatchSttTransport`: POSTs a raw PCM16 utterance to
//! a configured transcription endpoint and expects back the transcript text.
//! Mirrors the request/response idiom of `llm::claude`/`llm::tts` — a real
//! `reqwest` client against a configurable endpoint, no vendor SDK.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::stt::{BatchSttTransport, SttError};

#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    pub api_key: String,
    pub sample_rate: u32,
    pub timeout: Duration,
    pub endpoint: String,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("STT_API_KEY").unwrap_or_default(),
            sample_rate: 16_000,
            timeout: Duration::from_secs(15),
            endpoint: std::env::var("STT_ENDPOINT").unwrap_or_else(|_| "https://stt.local".to_string()),
        }
    }
}

pub struct HttpBatchSttTransport {
    config: HttpSttConfig,
    client: Client,
}

impl HttpBatchSttTransport {
    pub fn new(config: HttpSttConfig) -> Result<Self, SttError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SttError::Send(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    pcm16: &'a [i16],
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
}

#[async_trait]
impl BatchSttTransport for HttpBatchSttTransport {
    async fn transcribe(&self, pcm_block: &[i16]) -> Result<String, SttError> {
        let request = TranscribeRequest {
            pcm16: pcm_block,
            sample_rate: self.config.sample_rate,
        };

        let response = self
            .client
            .post(format!("{}/v1/transcribe", self.config.endpoint))
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| SttError::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Send(format!("HTTP {status}: {body}")));
        }

        let parsed: TranscribeResponse = response.json().await.map_err(|e| SttError::Send(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reads_env_or_falls_back() {
        let config = HttpSttConfig::default();
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.endpoint, std::env::var("STT_ENDPOINT").unwrap_or_else(|_| "https://stt.local".to_string()));
    }
}
