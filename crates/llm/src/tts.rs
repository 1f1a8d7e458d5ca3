//! A vendor-agnostic HTTP `Tts` backend: POSTs text to a configured
//! synthesis endpoint and expects back a JSON body carrying the URL of the
//! rendered clip, matching `CandidateQuestion::audio_urls`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::TtsError;
use crate::traits::Tts;

#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub timeout: Duration,
    pub endpoint: String,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("TTS_API_KEY").unwrap_or_default(),
            voice_id: std::env::var("TTS_VOICE_ID").unwrap_or_else(|_| "default".to_string()),
            timeout: Duration::from_secs(15),
            endpoint: std::env::var("TTS_ENDPOINT").unwrap_or_else(|_| "https://tts.local".to_string()),
        }
    }
}

pub struct HttpTts {
    config: HttpTtsConfig,
    client: Client,
}

impl HttpTts {
    pub fn new(config: HttpTtsConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TtsError::Synthesis(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    audio_url: String,
}

#[async_trait]
impl Tts for HttpTts {
    async fn synthesize(&self, text: &str) -> Result<String, TtsError> {
        let request = SynthesizeRequest {
            text,
            voice_id: &self.config.voice_id,
        };

        let response = self
            .client
            .post(format!("{}/v1/synthesize", self.config.endpoint))
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| TtsError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Synthesis(format!("HTTP {status}: {body}")));
        }

        let parsed: SynthesizeResponse = response.json().await.map_err(|e| TtsError::Synthesis(e.to_string()))?;
        Ok(parsed.audio_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reads_env_or_falls_back() {
        let config = HttpTtsConfig::default();
        assert_eq!(config.voice_id, std::env::var("TTS_VOICE_ID").unwrap_or_else(|_| "default".to_string()));
    }
}
