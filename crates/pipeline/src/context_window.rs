//! Sliding transcript window: per-slide speech tracking, key-claim heuristics,
//! and the running presentation summary used to assemble agent prompts.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::{Deserialize, Serialize};

const MAX_TRANSCRIPT_CHARS: usize = 8000;
const FIVE_MINUTES_SECS: f64 = 300.0;

static KEY_CLAIM_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\d+%",
        r"(?i)\$[\d,.]+",
        r"(?i)\d+[bmk]\b",
        r"(?i)\d+x\b",
        r"(?i)will\s+\w+",
        r"(?i)expect\w*",
        r"(?i)project\w*",
        r"(?i)target\w*",
    ])
    .expect("static key-claim patterns must compile")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideInfo {
    pub title: String,
    pub notes: String,
    pub body_text: String,
}

/// Assembled context payload handed to an agent when building its next prompt.
#[derive(Debug, Clone, Default)]
pub struct AgentPromptContext {
    pub current_slide_text: String,
    pub current_slide_title: String,
    pub current_slide_notes: String,
    pub transcript_text: String,
    pub key_claims: Vec<String>,
    pub elapsed_seconds: f64,
    pub presentation_summary: String,
    pub current_slide_speech: String,
    pub all_slides_context: String,
}

pub struct ContextWindow {
    max_transcript_chars: usize,
    key_claims: Vec<String>,
    full_transcript: Vec<TranscriptSegment>,
    current_slide_index: usize,
    slide_speech: HashMap<usize, Vec<String>>,
    presentation_summary: Vec<String>,
    summarized_slides: std::collections::HashSet<usize>,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextWindow {
    pub fn new() -> Self {
        Self {
            max_transcript_chars: MAX_TRANSCRIPT_CHARS,
            key_claims: Vec::new(),
            full_transcript: Vec::new(),
            current_slide_index: 0,
            slide_speech: HashMap::new(),
            presentation_summary: Vec::new(),
            summarized_slides: std::collections::HashSet::new(),
        }
    }

    pub fn add_segment(&mut self, segment: TranscriptSegment) {
        let trimmed = segment.text.trim().to_string();
        if !trimmed.is_empty() {
            self.slide_speech
                .entry(self.current_slide_index)
                .or_default()
                .push(trimmed.clone());
            if contains_key_claim(&trimmed) {
                self.key_claims.push(trimmed);
            }
        }
        self.full_transcript.push(segment);
    }

    /// Called when the presenter advances slides: summarizes the outgoing
    /// slide's accumulated speech before moving the window forward.
    pub fn on_slide_change(&mut self, new_slide_index: usize, slides: &[SlideInfo]) {
        let old_slide = self.current_slide_index;
        if !self.summarized_slides.contains(&old_slide) && self.slide_speech.contains_key(&old_slide) {
            self.summarize_slide(old_slide, slides);
        }
        self.current_slide_index = new_slide_index;
    }

    fn summarize_slide(&mut self, slide_index: usize, slides: &[SlideInfo]) {
        self.summarized_slides.insert(slide_index);
        let Some(speech) = self.slide_speech.get(&slide_index) else {
            return;
        };
        if speech.is_empty() {
            return;
        }
        let title = slides
            .get(slide_index)
            .map(|s| s.title.clone())
            .unwrap_or_else(|| format!("Slide {}", slide_index + 1));

        let mut combined = speech.join(" ");
        if combined.len() > 500 {
            combined.truncate(500);
            combined.push_str("...");
        }
        self.presentation_summary
            .push(format!("[Slide {}: {}] {}", slide_index + 1, title, combined));
    }

    pub fn get_context_for_agent(
        &mut self,
        current_slide_index: usize,
        slides: &[SlideInfo],
        elapsed_seconds: f64,
    ) -> AgentPromptContext {
        self.current_slide_index = current_slide_index;
        let current_slide = slides.get(current_slide_index);

        AgentPromptContext {
            current_slide_text: current_slide.map(format_slide).unwrap_or_default(),
            current_slide_title: current_slide.map(|s| s.title.clone()).unwrap_or_default(),
            current_slide_notes: current_slide.map(|s| s.notes.clone()).unwrap_or_default(),
            transcript_text: self.build_transcript_text(elapsed_seconds),
            key_claims: tail(&self.key_claims, 20),
            elapsed_seconds,
            presentation_summary: self.presentation_summary.join("\n"),
            current_slide_speech: self.current_slide_speech(current_slide_index),
            all_slides_context: self.build_all_slides_context(current_slide_index, slides),
        }
    }

    fn current_slide_speech(&self, slide_index: usize) -> String {
        let Some(speech) = self.slide_speech.get(&slide_index) else {
            return String::new();
        };
        if speech.is_empty() {
            return String::new();
        }
        let combined = speech.join(" ");
        if combined.len() > 2000 {
            let tail_start = combined.len() - 2000;
            format!("...{}", &combined[tail_start..])
        } else {
            combined
        }
    }

    fn build_all_slides_context(&self, current_slide_index: usize, slides: &[SlideInfo]) -> String {
        if slides.is_empty() {
            return String::new();
        }
        let mut parts = Vec::new();
        for (i, slide) in slides.iter().enumerate() {
            let marker = if i == current_slide_index { " <-- CURRENT" } else { "" };
            match self.slide_speech.get(&i) {
                Some(speech) if !speech.is_empty() => {
                    let mut combined = speech.join(" ");
                    if combined.len() > 200 {
                        combined.truncate(200);
                        combined.push_str("...");
                    }
                    parts.push(format!(
                        "  Slide {}: {}{marker} — Presenter said: \"{combined}\"",
                        i + 1,
                        slide.title
                    ));
                }
                _ => {
                    if i <= current_slide_index {
                        parts.push(format!(
                            "  Slide {}: {}{marker} — (no speech recorded)",
                            i + 1,
                            slide.title
                        ));
                    } else {
                        parts.push(format!("  Slide {}: {} — (upcoming)", i + 1, slide.title));
                    }
                }
            }
        }
        parts.join("\n")
    }

    fn build_transcript_text(&self, elapsed_seconds: f64) -> String {
        if self.full_transcript.is_empty() {
            return String::new();
        }

        let full_text = format_transcript(&self.full_transcript);
        if full_text.len() <= self.max_transcript_chars {
            return full_text;
        }

        let five_min_ago = elapsed_seconds - FIVE_MINUTES_SECS;
        let (recent, older): (Vec<_>, Vec<_>) = self
            .full_transcript
            .iter()
            .partition(|s| s.start_time >= five_min_ago);

        let mut parts = Vec::new();
        if !older.is_empty() {
            let older_text = format_transcript(older.iter().copied());
            if older_text.len() > 2000 {
                parts.push("[Earlier in the presentation, the presenter discussed:]".to_string());
                for claim in self.key_claims.iter().take(10) {
                    parts.push(format!("- {claim}"));
                }
                parts.push(String::new());
            } else {
                parts.push(older_text);
            }
        }
        if !recent.is_empty() {
            parts.push("[Recent transcript:]".to_string());
            parts.push(format_transcript(recent.iter().copied()));
        }
        parts.join("\n")
    }
}

fn format_transcript<'a>(segments: impl IntoIterator<Item = &'a TranscriptSegment>) -> String {
    segments
        .into_iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_slide(slide: &SlideInfo) -> String {
    let mut parts = Vec::new();
    if !slide.title.is_empty() {
        parts.push(format!("Title: {}", slide.title));
    }
    if !slide.body_text.is_empty() {
        parts.push(format!("Content: {}", slide.body_text));
    }
    parts.join("\n")
}

fn contains_key_claim(text: &str) -> bool {
    KEY_CLAIM_PATTERNS.is_match(text)
}

fn tail(items: &[String], n: usize) -> Vec<String> {
    let start = items.len().saturating_sub(n);
    items[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start_time: start,
            end_time: start + 1.0,
        }
    }

    #[test]
    fn detects_key_claims() {
        let mut window = ContextWindow::new();
        window.add_segment(seg("we project 40% revenue growth", 0.0));
        window.add_segment(seg("the weather is nice today", 1.0));
        assert_eq!(window.key_claims.len(), 1);
    }

    #[test]
    fn slide_change_summarizes_outgoing_slide() {
        let slides = vec![
            SlideInfo { title: "Intro".into(), ..Default::default() },
            SlideInfo { title: "Market".into(), ..Default::default() },
        ];
        let mut window = ContextWindow::new();
        window.add_segment(seg("we have a huge market opportunity here", 0.0));
        window.on_slide_change(1, &slides);
        assert_eq!(window.presentation_summary.len(), 1);
        assert!(window.presentation_summary[0].contains("Intro"));
    }

    #[test]
    fn short_transcript_included_in_full() {
        let mut window = ContextWindow::new();
        window.add_segment(seg("hello there", 0.0));
        let ctx = window.get_context_for_agent(0, &[], 5.0);
        assert_eq!(ctx.transcript_text, "hello there");
    }
}
