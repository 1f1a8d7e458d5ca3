//! Per-session configuration, loaded via layered TOML + environment overrides.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Friendly,
    Moderate,
    Adversarial,
}

impl Intensity {
    /// Maximum presenter turns per exchange before a forced `TURN_LIMIT`.
    pub fn max_turns(&self) -> usize {
        match self {
            Intensity::Friendly => 2,
            Intensity::Moderate => 3,
            Intensity::Adversarial => 4,
        }
    }
}

fn default_warmup_words() -> usize {
    50
}

fn default_interaction_mode() -> String {
    "voice".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_interaction_mode")]
    pub interaction_mode: String,
    pub intensity: Intensity,
    pub agents: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub duration_secs: u64,
    #[serde(default = "default_warmup_words")]
    pub agent_warmup_words: usize,
}

impl SessionConfig {
    pub fn max_turns(&self) -> usize {
        self.intensity.max_turns()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load session config: {0}")]
    Load(#[from] config::ConfigError),
}

/// Layers an optional base TOML file with `VOICE_BOARDROOM_`-prefixed
/// environment variables (double underscore as the nesting separator),
/// matching the `config` crate's layered-source convention.
pub fn load_session_config(path: Option<&str>) -> Result<SessionConfig, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("VOICE_BOARDROOM")
            .separator("__")
            .try_parsing(true),
    );
    let settled = builder.build()?;
    Ok(settled.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn intensity_maps_to_max_turns() {
        assert_eq!(Intensity::Friendly.max_turns(), 2);
        assert_eq!(Intensity::Moderate.max_turns(), 3);
        assert_eq!(Intensity::Adversarial.max_turns(), 4);
    }

    #[test]
    fn loads_from_toml_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
            intensity = "moderate"
            agents = ["skeptic", "analyst"]
            duration_secs = 900
            "#
        )
        .unwrap();
        let path = file.path().to_path_buf();

        let cfg = load_session_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.agents, vec!["skeptic", "analyst"]);
        assert_eq!(cfg.agent_warmup_words, 50);
        assert_eq!(cfg.max_turns(), 3);
    }
}
