//! Deterministic post-processing for model output.
//!
//! Local models drift: they moralise, speak in first person, and pad replies
//! past any prompt-stated limit. Every pond utterance therefore passes
//! through one of the `enforce_*` shapers below, which bound sentence and
//! word counts and scrub the stock phrases the persona prompts forbid.
//! The shapers are pure functions; the model never gets a second chance.

use std::sync::LazyLock;

use regex::Regex;

/// Word cap for the trailing open question of a reflection.
const QUESTION_MAX_WORDS: usize = 30;
/// Word cap for a full two-sentence reflection.
const REFLECTION_MAX_WORDS: usize = 60;

/// Stock imagery and advice-isms the persona prompts forbid. Removed
/// case-insensitively before any word capping.
const BANNED_PHRASES: [&str; 12] = [
    "ripples of",
    "autumn leaves",
    "waters of your heart",
    "ebb and flow",
    "gentle lapping",
    "on my shore",
    "my surface",
    "I reflect",
    "I hold",
    "allow yourself",
    "should",
    "you need to",
];

const FALLBACK_ACK: &str = "You’ve named something clearly.";
const FALLBACK_QUESTION: &str = "What detail stands out most?";
const FALLBACK_SENTENCE: &str = "You described the moment with enough detail to hold it.";
const FALLBACK_PARAGRAPH: &str = "You clarified what happened and how it felt. We’ll carry \
those details and look for patterns next. The aim is understanding, not judgment.";

static BANNED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BANNED_PHRASES
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", regex::escape(p))).expect("static pattern"))
        .collect()
});

// The pond speaks in second person only; standalone first-person tokens are
// stripped outright. Alternation order matters: `I` before `I'm` mirrors the
// leftmost-first match the shaping was tuned against.
static FIRST_PERSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(I|I'm|I am|my|mine)\b").expect("static pattern"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static pattern"));

/// Split `text` into sentences at `.`, `?` or `!` followed by whitespace.
/// Parts are trimmed; empty parts are dropped.
pub fn sentences(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '?' | '!') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let part = current.trim();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
            current.clear();
        }
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// First `n` whitespace-delimited words of `s`, joined by single spaces.
pub fn limit_words(s: &str, n: usize) -> String {
    s.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Scrub banned phrases and first-person tokens, collapse whitespace, and
/// cap at `max_words`. Truncation strips dangling `,`/`;` and closes with a
/// period.
pub fn sanitize_style(text: &str, max_words: usize) -> String {
    let mut t = text.to_string();
    for rx in BANNED.iter() {
        t = rx.replace_all(&t, "").into_owned();
    }
    t = FIRST_PERSON.replace_all(&t, "").into_owned();
    t = MULTI_SPACE.replace_all(&t, " ").trim().to_string();

    let words: Vec<&str> = t.split_whitespace().collect();
    if words.len() > max_words {
        let mut cut = words[..max_words].join(" ");
        let keep = cut.trim_end_matches([',', ';', ' ']).len();
        cut.truncate(keep);
        cut.push('.');
        return cut;
    }
    t
}

/// Shape a reflection reply: exactly two sentences, the second a short open
/// question. S1 falls back to a neutral acknowledgement, S2 to a neutral
/// question, so even an empty completion yields a usable turn.
pub fn enforce_reflection(text: &str) -> String {
    let parts = sentences(text);
    let first = parts
        .first()
        .cloned()
        .unwrap_or_else(|| FALLBACK_ACK.to_string());
    let q_src = parts
        .get(1)
        .cloned()
        .unwrap_or_else(|| FALLBACK_QUESTION.to_string());

    let mut q = limit_words(q_src.trim_end_matches(['.', '!', '…', ' ']).trim(), QUESTION_MAX_WORDS);
    if !q.ends_with('?') {
        q.push('?');
    }
    sanitize_style(&format!("{first} {q}"), REFLECTION_MAX_WORDS)
}

/// Shape a validation line: one sentence, no question, closed with a period.
pub fn enforce_single_sentence(text: &str, max_words: usize) -> String {
    let parts = sentences(text);
    let base = parts.first().map(String::as_str).unwrap_or(FALLBACK_SENTENCE);
    let mut one = base.trim_end_matches(['?', '!', '.', '…', ' ']).to_string();
    one.push('.');
    sanitize_style(&one, max_words)
}

/// Shape a synthesis paragraph: all sentences joined, capped at `max_words`,
/// closed with a period (transitions must not end on a question).
pub fn enforce_paragraph(text: &str, max_words: usize) -> String {
    let joined = sentences(text).join(" ");
    let base = if joined.is_empty() { FALLBACK_PARAGRAPH.to_string() } else { joined };
    let mut s = limit_words(&base, max_words)
        .trim_end_matches(['?', '!', '.', '…', ' '])
        .to_string();
    s.push('.');
    sanitize_style(&s, max_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminators() {
        let parts = sentences("You swam at dawn. The water was cold! Was it worth it? Yes.");
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "You swam at dawn.");
        assert_eq!(parts[2], "Was it worth it?");
    }

    #[test]
    fn sentences_without_terminator_is_one_part() {
        let parts = sentences("no punctuation here");
        assert_eq!(parts, vec!["no punctuation here"]);
    }

    #[test]
    fn sentences_empty_input() {
        assert!(sentences("").is_empty());
        assert!(sentences("   \n ").is_empty());
    }

    #[test]
    fn limit_words_caps_and_rejoins() {
        assert_eq!(limit_words("one  two\nthree four", 3), "one two three");
        assert_eq!(limit_words("short", 10), "short");
    }

    #[test]
    fn sanitize_removes_banned_phrases() {
        let out = sanitize_style("The ripples of memory carry the ebb and flow onward", 50);
        assert!(!out.to_lowercase().contains("ripples of"));
        assert!(!out.to_lowercase().contains("ebb and flow"));
    }

    #[test]
    fn sanitize_strips_first_person() {
        let out = sanitize_style("I see what you mean and my view matters", 50);
        assert!(!out.split_whitespace().any(|w| w == "I" || w == "my"));
        assert!(out.contains("you mean"));
    }

    #[test]
    fn sanitize_truncates_with_clean_period() {
        let text = "alpha beta gamma, delta epsilon";
        let out = sanitize_style(text, 3);
        assert_eq!(out, "alpha beta gamma.");
    }

    #[test]
    fn reflection_has_two_parts_and_question() {
        let out = enforce_reflection("You held the moment still. What color was the sky that morning.");
        assert!(out.ends_with('?'));
        assert!(out.contains("held the moment"));
    }

    #[test]
    fn reflection_empty_input_uses_fallbacks() {
        let out = enforce_reflection("");
        assert!(out.contains("named something clearly"));
        assert!(out.ends_with("stands out most?"));
    }

    #[test]
    fn reflection_missing_question_gets_fallback_question() {
        let out = enforce_reflection("A single statement with no follow-up.");
        assert!(out.ends_with('?'));
    }

    #[test]
    fn single_sentence_drops_question_mark() {
        let out = enforce_single_sentence("Was that hard for you? It seemed so.", 45);
        assert_eq!(out, "Was that hard for you.");
    }

    #[test]
    fn single_sentence_empty_uses_fallback() {
        let out = enforce_single_sentence("", 45);
        assert!(out.contains("enough detail to hold it"));
    }

    #[test]
    fn paragraph_joins_and_caps() {
        let out = enforce_paragraph("First part. Second part. Third part.", 80);
        assert!(out.contains("First part."));
        assert!(out.contains("Second part."));
        assert!(out.ends_with('.'));
        assert!(!out.ends_with(".."));
    }

    #[test]
    fn paragraph_empty_uses_fallback() {
        let out = enforce_paragraph("", 80);
        assert!(out.contains("understanding, not judgment"));
    }

    #[test]
    fn paragraph_word_cap_applies() {
        let long = "word ".repeat(120);
        let out = enforce_paragraph(&long, 20);
        assert!(out.split_whitespace().count() <= 21);
        assert!(out.ends_with('.'));
    }
}
