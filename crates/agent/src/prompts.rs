//! Prompt assembly: persona fragments plus the sliding context window are
//! composed into the two prompts an agent ever sends an LLM — one to draft a
//! question, one to judge whether a presenter's answer settles it.

use boardroom_config::{Intensity, PersonaTemplate, SessionConfig};
use boardroom_core::{Claim, Exchange, Speaker};
use boardroom_pipeline::AgentPromptContext;

use crate::observation::OtherAgentQuestion;

const MAX_EXCHANGES_IN_HISTORY: usize = 3;
const MAX_CROSS_AGENT_QUESTIONS: usize = 5;
const CROSS_AGENT_TRUNCATE_CHARS: usize = 120;

/// Renders the last few resolved exchanges as transcript-style turns, so the
/// model sees what's already been asked and how it landed before drafting
/// another question.
pub fn format_exchange_history(exchanges: &[Exchange]) -> String {
    let start = exchanges.len().saturating_sub(MAX_EXCHANGES_IN_HISTORY);
    exchanges[start..]
        .iter()
        .enumerate()
        .map(|(i, exchange)| {
            let mut block = format!("### Exchange {}\nQuestion: {}\n", i + 1, exchange.question_text);
            for turn in &exchange.turns {
                let label = match turn.speaker {
                    Speaker::Agent => "You",
                    Speaker::Presenter => "Presenter",
                };
                block.push_str(&format!("{label}: {}\n", turn.text));
            }
            if let Some(outcome) = exchange.outcome {
                block.push_str(&format!("Outcome: {}\n", outcome.as_str()));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarizes what other panelists have recently asked, so this agent
/// doesn't duplicate a question a sibling already raised.
pub fn format_cross_agent_summary(questions: &[OtherAgentQuestion]) -> String {
    let start = questions.len().saturating_sub(MAX_CROSS_AGENT_QUESTIONS);
    questions[start..]
        .iter()
        .map(|q| {
            let persona_name = boardroom_config::get_agent_templates(&q.agent_id)
                .map(|p| p.name.as_str())
                .unwrap_or(q.agent_id.as_str());
            let mut text = q.text.clone();
            if text.chars().count() > CROSS_AGENT_TRUNCATE_CHARS {
                text = text.chars().take(CROSS_AGENT_TRUNCATE_CHARS).collect::<String>() + "...";
            }
            format!("- {persona_name}: {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First claim on the current slide this agent hasn't already challenged.
pub fn get_target_claim(claims_for_slide: &[Claim], challenged: &[String]) -> Option<String> {
    claims_for_slide
        .iter()
        .find(|c| !challenged.contains(&c.text))
        .map(|c| c.text.clone())
}

pub fn get_fallback_question(persona: Option<&PersonaTemplate>, question_count: usize) -> String {
    match persona.filter(|p| !p.fallback_questions.is_empty()) {
        Some(persona) => {
            let idx = question_count % persona.fallback_questions.len();
            persona.fallback_questions[idx].clone()
        }
        None => "Can you say more about that?".to_string(),
    }
}

fn intensity_label(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::Friendly => "friendly and encouraging, but still curious",
        Intensity::Moderate => "direct and probing",
        Intensity::Adversarial => "sharply adversarial and unwilling to let vague answers pass",
    }
}

pub struct AgentPromptInputs<'a> {
    pub persona: &'a PersonaTemplate,
    pub session_config: &'a SessionConfig,
    pub context: &'a AgentPromptContext,
    pub exchange_history: &'a [Exchange],
    pub cross_agent_questions: &'a [OtherAgentQuestion],
    pub presenter_profile_text: &'a str,
    pub target_claim: Option<&'a str>,
    pub previous_questions: &'a [String],
}

/// Assembles the full question-drafting prompt: persona voice, session
/// intensity and focus areas, the current sliding context, cross-agent and
/// presenter history, and an explicit one-question instruction.
pub fn build_agent_prompt(inputs: &AgentPromptInputs<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str(inputs.persona.system_prompt_fragment.trim());
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Your tone should be {}.\n",
        intensity_label(inputs.session_config.intensity)
    ));
    if !inputs.session_config.focus_areas.is_empty() {
        prompt.push_str(&format!(
            "Focus particularly on: {}.\n",
            inputs.session_config.focus_areas.join(", ")
        ));
    }
    prompt.push('\n');

    prompt.push_str(&format!("Current slide: {}\n", inputs.context.current_slide_title));
    if !inputs.context.current_slide_text.is_empty() {
        prompt.push_str(&format!("{}\n", inputs.context.current_slide_text));
    }
    if !inputs.context.current_slide_speech.is_empty() {
        prompt.push_str(&format!(
            "What the presenter has said on this slide so far:\n{}\n",
            inputs.context.current_slide_speech
        ));
    }
    if !inputs.context.presentation_summary.is_empty() {
        prompt.push_str(&format!(
            "\nEarlier in the presentation:\n{}\n",
            inputs.context.presentation_summary
        ));
    }
    if !inputs.context.transcript_text.is_empty() {
        prompt.push_str(&format!("\nRecent transcript:\n{}\n", inputs.context.transcript_text));
    }

    if let Some(claim) = inputs.target_claim {
        prompt.push_str(&format!("\nA specific claim worth challenging: \"{claim}\"\n"));
    }

    if !inputs.previous_questions.is_empty() {
        prompt.push_str(&format!(
            "\nQuestions you've already asked (don't repeat these):\n{}\n",
            inputs.previous_questions.iter().map(|q| format!("- {q}")).collect::<Vec<_>>().join("\n")
        ));
    }

    let cross_agent = format_cross_agent_summary(inputs.cross_agent_questions);
    if !cross_agent.is_empty() {
        prompt.push_str(&format!("\nOther panelists have recently asked:\n{cross_agent}\n"));
    }

    let history = format_exchange_history(inputs.exchange_history);
    if !history.is_empty() {
        prompt.push_str(&format!("\nYour prior exchanges this session:\n{history}\n"));
    }

    if !inputs.presenter_profile_text.is_empty() {
        prompt.push_str(&format!("\nPresenter profile: {}\n", inputs.presenter_profile_text));
    }

    prompt.push_str(&format!(
        "\nElapsed time: {:.0} seconds.\n",
        inputs.context.elapsed_seconds
    ));
    prompt.push_str("\nAsk exactly ONE focused question. Do not preface it or explain your reasoning.\n");
    prompt
}

pub struct EvaluationPromptInputs<'a> {
    pub persona: &'a PersonaTemplate,
    pub question_text: &'a str,
    pub exchange: &'a Exchange,
    pub max_turns: usize,
}

/// Assembles the prompt used to judge a presenter's answer against this
/// persona's satisfaction bar, after each presenter turn within an exchange.
pub fn build_evaluation_prompt(inputs: &EvaluationPromptInputs<'_>) -> String {
    let history = format_exchange_history(std::slice::from_ref(inputs.exchange));
    format!(
        "{}\n\nYou asked: \"{}\"\n\nConversation so far:\n{}\n\n\
         This exchange is on turn {} of a maximum {}.\n\n\
         Respond with a JSON object: {{\"verdict\": one of \"satisfied\", \"follow_up\", \"escalate\", \
         \"reasoning\": a short explanation of your verdict, \
         \"follow_up_question\": the next question to ask if not satisfied, else null}}.",
        inputs.persona.satisfaction_criteria.trim(),
        inputs.question_text,
        history,
        inputs.exchange.presenter_turn_count(),
        inputs.max_turns,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_core::{ClaimType, ExchangeOutcome, ExchangeTurn};

    fn claim(text: &str) -> Claim {
        Claim {
            text: text.to_string(),
            claim_type: ClaimType::Financial,
            confidence: 0.9,
        }
    }

    #[test]
    fn target_claim_skips_already_challenged() {
        let claims = vec![claim("40% growth"), claim("$5B TAM")];
        let challenged = vec!["40% growth".to_string()];
        assert_eq!(get_target_claim(&claims, &challenged), Some("$5B TAM".to_string()));
    }

    #[test]
    fn target_claim_none_when_all_challenged() {
        let claims = vec![claim("40% growth")];
        let challenged = vec!["40% growth".to_string()];
        assert_eq!(get_target_claim(&claims, &challenged), None);
    }

    #[test]
    fn exchange_history_renders_turns_and_outcome() {
        let mut exchange = Exchange::new("skeptic", "What's your TAM?", None, 0);
        exchange.turns.push(ExchangeTurn::presenter("It's $5B"));
        exchange.outcome = Some(ExchangeOutcome::Satisfied);

        let text = format_exchange_history(std::slice::from_ref(&exchange));
        assert!(text.contains("Question: What's your TAM?"));
        assert!(text.contains("Presenter: It's $5B"));
        assert!(text.contains("Outcome: satisfied"));
    }

    #[test]
    fn exchange_history_keeps_only_last_three() {
        let exchanges: Vec<Exchange> = (0..5)
            .map(|i| Exchange::new("skeptic", format!("question {i}"), None, 0))
            .collect();
        let text = format_exchange_history(&exchanges);
        assert!(!text.contains("question 0"));
        assert!(!text.contains("question 1"));
        assert!(text.contains("question 4"));
    }

    #[test]
    fn cross_agent_summary_truncates_long_questions() {
        let long_text = "a".repeat(200);
        let questions = vec![OtherAgentQuestion {
            agent_id: "analyst".to_string(),
            text: long_text,
        }];
        let summary = format_cross_agent_summary(&questions);
        assert!(summary.contains("..."));
        assert!(summary.len() < 200);
    }

    #[test]
    fn fallback_question_cycles_through_persona_list() {
        let persona = PersonaTemplate {
            agent_id: "skeptic".into(),
            name: "Jordan".into(),
            role: "role".into(),
            title: "title".into(),
            system_prompt_fragment: String::new(),
            satisfaction_criteria: String::new(),
            fallback_questions: vec!["Q1".into(), "Q2".into()],
            moderator_transition_phrases: vec![],
        };
        assert_eq!(get_fallback_question(Some(&persona), 0), "Q1");
        assert_eq!(get_fallback_question(Some(&persona), 1), "Q2");
        assert_eq!(get_fallback_question(Some(&persona), 2), "Q1");
    }

    #[test]
    fn fallback_question_without_persona_uses_generic() {
        assert_eq!(get_fallback_question(None, 0), "Can you say more about that?");
    }
}
