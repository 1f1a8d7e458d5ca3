//! Persona + prompt templates, loaded once at startup into an immutable map.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

const PERSONAS_TOML: &str = include_str!("../templates/personas.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaTemplate {
    pub agent_id: String,
    pub name: String,
    pub role: String,
    pub title: String,
    pub system_prompt_fragment: String,
    pub satisfaction_criteria: String,
    pub fallback_questions: Vec<String>,
    pub moderator_transition_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PersonaFile {
    #[serde(rename = "persona")]
    personas: Vec<PersonaTemplate>,
}

static PERSONAS: Lazy<HashMap<String, PersonaTemplate>> = Lazy::new(|| {
    let file: PersonaFile =
        toml::from_str(PERSONAS_TOML).expect("bundled personas.toml must parse");
    file.personas
        .into_iter()
        .map(|p| (p.agent_id.clone(), p))
        .collect()
});

/// Returns the immutable persona template map, warming the lazy cache on
/// first call. Matches the original's template-cache-preload step during
/// an agent's LOADING phase.
pub fn get_agent_templates(agent_id: &str) -> Option<&'static PersonaTemplate> {
    PERSONAS.get(agent_id)
}

pub fn all_templates() -> &'static HashMap<String, PersonaTemplate> {
    &PERSONAS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_personas_load() {
        let skeptic = get_agent_templates("skeptic").expect("skeptic persona present");
        assert_eq!(skeptic.name, "Jordan Ellis");
        assert!(!skeptic.fallback_questions.is_empty());
    }

    #[test]
    fn unknown_agent_is_none() {
        assert!(get_agent_templates("nonexistent").is_none());
    }
}
