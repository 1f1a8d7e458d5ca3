//! Buffers streamed LLM chunks and emits complete sentences for TTS,
//! so the first clip can start playing before the rest of the answer
//! has even been generated.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

const MIN_FRAGMENT_CHARS: usize = 10;
const TERMINATORS: [char; 3] = ['.', '?', '!'];

static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "vs", "etc", "inc", "ltd", "co", "corp",
        "st", "ave", "blvd", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
        "oct", "nov", "dec", "fig", "no", "approx", "e.g", "i.e", "vol", "dept", "u.s",
    ]
    .into_iter()
    .collect()
});

/// The whitespace-delimited token containing position `i`, e.g. for
/// `"see e.g. the"` with `i` at either period, returns `"e.g."` — the whole
/// abbreviation, not just the word split at that one terminator.
fn enclosing_token(chars: &[char], i: usize) -> String {
    let mut start = i;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    let mut end = i + 1;
    while end < chars.len() && !chars[end].is_whitespace() {
        end += 1;
    }
    chars[start..end].iter().collect()
}

fn ends_with_abbreviation(token: &str) -> bool {
    let trimmed = token
        .trim_end_matches(|c: char| TERMINATORS.contains(&c) || c == '"' || c == '\'' || c == ')')
        .to_lowercase();
    !trimmed.is_empty() && ABBREVIATIONS.contains(trimmed.as_str())
}

/// Scans for complete sentences, returning them alongside the raw
/// (whitespace-preserving) trailing fragment that hasn't terminated yet.
fn scan_sentences(text: &str) -> (Vec<String>, String) {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);

        if TERMINATORS.contains(&c) && !ends_with_abbreviation(&enclosing_token(&chars, i)) {
            let mut end = i + 1;
            while end < chars.len() && (chars[end] == '"' || chars[end] == '\'' || chars[end] == ')') {
                current.push(chars[end]);
                end += 1;
            }
            i = end;
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        } else {
            i += 1;
        }
    }

    (sentences, current)
}

/// Splits a complete string into sentences, one shot (no streaming state).
/// Idempotent when re-run over its own output: `split(split(x).join(" ")) == split(x)`
/// for text with no abbreviation-adjacent boundaries re-introduced by joining.
pub fn split_sentences(text: &str) -> Vec<String> {
    let (mut sentences, remainder) = scan_sentences(text);
    let remainder = remainder.trim();
    if !remainder.is_empty() {
        sentences.push(remainder.to_string());
    }
    merge_short_fragments(sentences)
}

fn merge_short_fragments(sentences: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        if sentence.chars().count() < MIN_FRAGMENT_CHARS {
            if let Some(prev) = merged.last_mut() {
                prev.push(' ');
                prev.push_str(&sentence);
                continue;
            }
        }
        merged.push(sentence);
    }
    merged
}

/// Streaming counterpart: call `push` as chunks arrive, `flush` once the
/// model signals end-of-stream.
pub struct SentenceSplitter {
    buffer: Mutex<String>,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(String::new()),
        }
    }

    /// Feed a chunk, returning any sentences now complete. Leaves a partial
    /// trailing fragment buffered, spacing intact, until it is terminated
    /// or `flush`ed.
    pub fn push(&self, chunk: &str) -> Vec<String> {
        let mut buffer = self.buffer.lock();
        buffer.push_str(chunk);
        let (sentences, remainder) = scan_sentences(&buffer);
        *buffer = remainder;
        merge_short_fragments(sentences)
    }

    pub fn flush(&self) -> Option<String> {
        let mut buffer = self.buffer.lock();
        let text = buffer.trim().to_string();
        buffer.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("Is the market large? We understand the risk. Correct.");
        assert_eq!(
            sentences,
            vec!["Is the market large?", "We understand the risk. Correct."]
        );
    }

    #[test]
    fn splits_longer_sentences_without_merging() {
        let sentences = split_sentences("Is the market really large enough? We believe it is sizeable.");
        assert_eq!(
            sentences,
            vec![
                "Is the market really large enough?",
                "We believe it is sizeable."
            ]
        );
    }

    #[test]
    fn does_not_split_on_abbreviation() {
        let sentences = split_sentences("We spoke with Dr. Singh about the roadmap.");
        assert_eq!(sentences, vec!["We spoke with Dr. Singh about the roadmap."]);
    }

    #[test]
    fn does_not_split_on_multi_period_abbreviation() {
        let sentences = split_sentences("We compete with large players, e.g. Acme and Globex.");
        assert_eq!(sentences, vec!["We compete with large players, e.g. Acme and Globex."]);
    }

    #[test]
    fn does_not_split_on_u_s_abbreviation() {
        let sentences = split_sentences("We launched in the U.S. last quarter and expect EU entry next year.");
        assert_eq!(
            sentences,
            vec!["We launched in the U.S. last quarter and expect EU entry next year."]
        );
    }

    #[test]
    fn merges_short_fragments_into_previous_sentence() {
        let sentences = split_sentences("That is correct. Ok. We will proceed as planned.");
        assert!(sentences.iter().all(|s| s.chars().count() >= MIN_FRAGMENT_CHARS));
    }

    #[test]
    fn split_is_idempotent_on_rejoined_output() {
        let text = "The market grew thirty percent. We expect it to continue growing.";
        let once = split_sentences(text);
        let twice = split_sentences(&once.join(" "));
        assert_eq!(once, twice);
    }

    #[test]
    fn streaming_push_emits_only_complete_sentences() {
        let splitter = SentenceSplitter::new();
        assert!(splitter.push("The market ").is_empty());
        let emitted = splitter.push("is large. And growing");
        assert_eq!(emitted, vec!["The market is large."]);
        let rest = splitter.flush().unwrap();
        assert_eq!(rest, "And growing");
    }
}
