//! The `should_ask` heuristic: decides whether an agent interrupts now,
//! pulled out as a pure function so the trigger order can be tested without
//! standing up a whole runner.

const COOLDOWN_SECS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskReason {
    Cooldown,
    InsufficientGrowth,
    FirstQuestion,
    UnchallengedClaims,
    TranscriptGrowthWithTimePressure,
    HighTranscriptGrowth,
    NoTrigger,
}

pub struct ShouldAskInput {
    pub elapsed_secs: f64,
    pub last_question_time: Option<f64>,
    pub transcript_growth: i64,
    pub has_any_transcript: bool,
    pub unchallenged_claim_count: usize,
    pub session_duration_secs: f64,
    pub question_count: usize,
}

pub struct ShouldAskOutcome {
    pub should_ask: bool,
    pub reason: AskReason,
}

pub fn evaluate_should_ask(input: &ShouldAskInput) -> ShouldAskOutcome {
    if let Some(last) = input.last_question_time {
        if input.elapsed_secs - last < COOLDOWN_SECS {
            return ShouldAskOutcome {
                should_ask: false,
                reason: AskReason::Cooldown,
            };
        }
    }

    if !input.has_any_transcript {
        return ShouldAskOutcome {
            should_ask: false,
            reason: AskReason::InsufficientGrowth,
        };
    }

    if input.transcript_growth < 2 && input.unchallenged_claim_count == 0 {
        return ShouldAskOutcome {
            should_ask: false,
            reason: AskReason::InsufficientGrowth,
        };
    }

    let time_pressure = input.elapsed_secs / input.session_duration_secs.max(1.0);

    if input.question_count == 0 && input.transcript_growth >= 2 {
        return ShouldAskOutcome {
            should_ask: true,
            reason: AskReason::FirstQuestion,
        };
    }
    if input.unchallenged_claim_count > 0 {
        return ShouldAskOutcome {
            should_ask: true,
            reason: AskReason::UnchallengedClaims,
        };
    }
    if input.transcript_growth >= 3 && time_pressure > 0.3 {
        return ShouldAskOutcome {
            should_ask: true,
            reason: AskReason::TranscriptGrowthWithTimePressure,
        };
    }
    if input.transcript_growth >= 5 {
        return ShouldAskOutcome {
            should_ask: true,
            reason: AskReason::HighTranscriptGrowth,
        };
    }

    ShouldAskOutcome {
        should_ask: false,
        reason: AskReason::NoTrigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> ShouldAskInput {
        ShouldAskInput {
            elapsed_secs: 100.0,
            last_question_time: None,
            transcript_growth: 0,
            has_any_transcript: true,
            unchallenged_claim_count: 0,
            session_duration_secs: 600.0,
            question_count: 0,
        }
    }

    #[test]
    fn within_cooldown_blocks_asking() {
        let mut input = base_input();
        input.last_question_time = Some(90.0);
        input.transcript_growth = 5;
        let outcome = evaluate_should_ask(&input);
        assert!(!outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::Cooldown);
    }

    #[test]
    fn first_question_is_aggressive() {
        let mut input = base_input();
        input.transcript_growth = 2;
        let outcome = evaluate_should_ask(&input);
        assert!(outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::FirstQuestion);
    }

    #[test]
    fn unchallenged_claim_triggers_even_after_first_question() {
        let mut input = base_input();
        input.question_count = 3;
        input.transcript_growth = 2;
        input.unchallenged_claim_count = 1;
        let outcome = evaluate_should_ask(&input);
        assert!(outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::UnchallengedClaims);
    }

    #[test]
    fn growth_with_time_pressure_triggers() {
        let mut input = base_input();
        input.question_count = 1;
        input.transcript_growth = 3;
        input.elapsed_secs = 250.0;
        let outcome = evaluate_should_ask(&input);
        assert!(outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::TranscriptGrowthWithTimePressure);
    }

    #[test]
    fn high_growth_alone_triggers_without_time_pressure() {
        let mut input = base_input();
        input.question_count = 1;
        input.transcript_growth = 5;
        input.elapsed_secs = 10.0;
        let outcome = evaluate_should_ask(&input);
        assert!(outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::HighTranscriptGrowth);
    }

    #[test]
    fn modest_growth_without_pressure_does_not_trigger() {
        let mut input = base_input();
        input.question_count = 1;
        input.transcript_growth = 2;
        input.elapsed_secs = 10.0;
        let outcome = evaluate_should_ask(&input);
        assert!(!outcome.should_ask);
        assert_eq!(outcome.reason, AskReason::NoTrigger);
    }
}
