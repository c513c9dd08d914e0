//! The three-level reflection ritual.
//!
//! A ritual walks one memory through three focuses — Descriptive ("what
//! happened"), Analytic ("why it mattered"), Reflexive ("what it reveals
//! about self or the world") — with up to three rounds of exchange per
//! level, a player decision between levels, and an archival choice
//! (float / sink / hold) at the end.
//!
//! [`RitualState`] is a plain serializable state machine; every transition
//! that needs a pond utterance takes the [`LlmProvider`] as an argument and
//! shapes the completion through the guardrails before storing it. The
//! state never holds provider handles, so sessions round-trip through JSON
//! unchanged.

pub mod guardrails;
pub mod intent;
pub mod prompts;
pub mod render;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::llm::{ChatRequest, LlmProvider};
use guardrails::{enforce_paragraph, enforce_reflection, enforce_single_sentence, sanitize_style, sentences};
use intent::{is_more, is_yes, parse_archive_choice, ArchiveChoice};

/// Rounds of player/pond exchange per level before the close.
const ROUNDS_PER_LEVEL: u8 = 3;

/// Fallback second sentence when the artifact completion came back short.
const ARTIFACT_FALLBACK_SENTENCE: &str = "You will keep this as a clear, simple note.";

// ── Levels ────────────────────────────────────────────────────────────────────

/// A level's fixed presentation: name, what it asks about, and the visual
/// framing shown on every card of that level.
#[derive(Debug)]
pub struct Focus {
    pub name: &'static str,
    pub hint: &'static str,
    pub icon: &'static str,
    pub metaphor: &'static str,
}

pub static FOCUSES: [Focus; 3] = [
    Focus {
        name: "Descriptive",
        hint: "what happened",
        icon: "🌤",
        metaphor: "You’re looking at the surface; ripples reflect what just passed.",
    },
    Focus {
        name: "Analytic",
        hint: "why it mattered",
        icon: "🌊",
        metaphor: "You lean closer, peering under the surface where patterns form.",
    },
    Focus {
        name: "Reflexive",
        hint: "what it reveals about self or the world",
        icon: "🌌",
        metaphor: "You see the whole pond — surface and depth together, connected.",
    },
];

// ── State ─────────────────────────────────────────────────────────────────────

/// Where the ritual currently waits for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Normal round-by-round progression within a level.
    Rounds,
    /// After a level's close: go deeper, or linger with more detail.
    LevelDecision,
    /// After level three: choose float, sink, or hold.
    ArchiveChoice,
    /// Artifact composed; only archiving remains.
    Finished,
}

/// One entry of the session history, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum HistoryEntry {
    Player(String),
    Pond(String),
    /// Final artifact HTML (kept so archiving can reuse it verbatim).
    Artifact(String),
}

/// The transition synthesis recorded when a level closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RitualState {
    title: String,
    offering: String,
    level: usize,
    step: u8,
    history: Vec<HistoryEntry>,
    summaries: Vec<LevelSummary>,
    phase: Phase,
    /// History index where the current level's notes begin.
    level_anchor: usize,
    archive_choice: Option<ArchiveChoice>,
}

impl RitualState {
    pub fn new(title: &str, offering: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            offering: offering.trim().to_string(),
            level: 0,
            step: 0,
            history: Vec::new(),
            summaries: Vec::new(),
            phase: Phase::Rounds,
            level_anchor: 0,
            archive_choice: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn offering(&self) -> &str {
        &self.offering
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn archive_choice(&self) -> Option<ArchiveChoice> {
        self.archive_choice
    }

    pub fn summaries(&self) -> &[LevelSummary] {
        &self.summaries
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn focus(&self) -> &'static Focus {
        &FOCUSES[self.level]
    }

    fn card(&self, round_name: &str, body_html: &str) -> String {
        render::level_card(self.level, self.focus(), round_name, body_html)
    }

    // ── Context bundling ──────────────────────────────────────────────────

    /// The current level's player notes, newline-joined. Level one prepends
    /// the offering so the first reflection has material to work with.
    fn level_player_text(&self) -> String {
        let mut texts: Vec<&str> = self.history[self.level_anchor..]
            .iter()
            .filter_map(|e| match e {
                HistoryEntry::Player(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        if self.level == 0 && !self.offering.is_empty() {
            texts.insert(0, &self.offering);
        }
        let joined = texts.join("\n").trim().to_string();
        if joined.is_empty() {
            self.offering.clone()
        } else {
            joined
        }
    }

    /// Previous level syntheses as concise bullets.
    fn summaries_text(&self) -> String {
        self.summaries
            .iter()
            .map(|s| format!("- {}: {}", s.level, s.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Title + offering + prior level syntheses + current level notes.
    /// Fed to the model for every utterance so later levels remember
    /// earlier ones.
    fn context_bundle(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(format!("Title: {}", self.title));
        }
        if !self.offering.is_empty() {
            parts.push(format!("Offering: {}", self.offering));
        }
        let prev = self.summaries_text();
        if !prev.is_empty() {
            parts.push(format!("Previous level syntheses:\n{prev}"));
        }
        let current = self.level_player_text();
        if !current.is_empty() {
            parts.push(format!("Current level notes:\n{current}"));
        }
        parts.join("\n\n").trim().to_string()
    }

    // ── Pond utterances ───────────────────────────────────────────────────

    fn system_for_level(&self) -> &'static str {
        match self.level {
            0 => prompts::DESCRIPTIVE_SYS,
            1 => prompts::ANALYTIC_SYS,
            _ => prompts::REFLEXIVE_SYS,
        }
    }

    /// Per-round reflection: acknowledgement + short open question.
    async fn reflection(&self, llm: &LlmProvider) -> Result<String, AppError> {
        let bundle = self.context_bundle();
        let raw = llm
            .complete(ChatRequest {
                system: self.system_for_level(),
                user: &bundle,
                temperature: prompts::REFLECTION_TEMPERATURE,
            })
            .await?;
        Ok(enforce_reflection(&raw))
    }

    /// One validating sentence closing the level's rounds.
    async fn close_sentence(&self, llm: &LlmProvider) -> Result<String, AppError> {
        let bundle = self.context_bundle();
        let raw = llm
            .complete(ChatRequest {
                system: prompts::CLOSE_SYS,
                user: &bundle,
                temperature: prompts::CLOSE_TEMPERATURE,
            })
            .await?;
        Ok(enforce_single_sentence(&raw, prompts::CLOSE_MAX_WORDS))
    }

    /// 3–4 sentence synthesis bridging toward `next_level_name`.
    async fn transition_synthesis(
        &self,
        llm: &LlmProvider,
        next_level_name: &str,
    ) -> Result<String, AppError> {
        let bundle = self.context_bundle();
        let user = format!("{bundle}\n\nNext level: {next_level_name}.");
        let raw = llm
            .complete(ChatRequest {
                system: prompts::TRANSITION_SYS,
                user: &user,
                temperature: prompts::TRANSITION_TEMPERATURE,
            })
            .await?;
        Ok(enforce_paragraph(&raw, prompts::TRANSITION_MAX_WORDS))
    }

    /// Compose the final artifact for `choice`, append it to history, and
    /// return its card.
    pub async fn final_artifact(
        &mut self,
        llm: &LlmProvider,
        choice: ArchiveChoice,
    ) -> Result<String, AppError> {
        let joined = self
            .summaries
            .iter()
            .map(|s| s.summary.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let system = prompts::artifact_sys(choice.as_str());
        let raw = llm
            .complete(ChatRequest {
                system: &system,
                user: &joined,
                temperature: prompts::ARTIFACT_TEMPERATURE,
            })
            .await?;

        let mut parts = sentences(&raw);
        if parts.len() < 2 {
            parts.push(ARTIFACT_FALLBACK_SENTENCE.to_string());
        }
        let two = parts[..2.min(parts.len())].join(" ");
        let body = sanitize_style(
            &guardrails::limit_words(&two, prompts::ARTIFACT_MAX_WORDS),
            prompts::ARTIFACT_MAX_WORDS,
        );

        let html = render::artifact_card(&body, choice.stance());
        self.history.push(HistoryEntry::Artifact(html.clone()));
        Ok(html)
    }

    /// Last artifact card in history, if one was composed.
    pub fn last_artifact(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|e| match e {
            HistoryEntry::Artifact(html) => Some(html.as_str()),
            _ => None,
        })
    }

    // ── Main transition ───────────────────────────────────────────────────

    /// Advance the ritual by one player turn and return the pond's card.
    pub async fn advance(
        &mut self,
        llm: &LlmProvider,
        player_reply: &str,
    ) -> Result<String, AppError> {
        debug!(phase = ?self.phase, level = self.level, step = self.step, "ritual advance");

        match self.phase {
            Phase::Finished => Ok(render::complete_card()),
            Phase::ArchiveChoice => self.advance_archive_choice(llm, player_reply).await,
            Phase::LevelDecision => self.advance_level_decision(llm, player_reply).await,
            Phase::Rounds => self.advance_rounds(llm, player_reply).await,
        }
    }

    async fn advance_archive_choice(
        &mut self,
        llm: &LlmProvider,
        player_reply: &str,
    ) -> Result<String, AppError> {
        let Some(choice) = parse_archive_choice(player_reply) else {
            return Ok(self.card(
                "Choice",
                "You can say <b>float</b>, <b>sink</b>, or <b>hold</b> — whichever feels \
right for this memory.",
            ));
        };
        self.archive_choice = Some(choice);
        self.phase = Phase::Finished;
        self.final_artifact(llm, choice).await
    }

    async fn advance_level_decision(
        &mut self,
        llm: &LlmProvider,
        player_reply: &str,
    ) -> Result<String, AppError> {
        let decision = player_reply.trim();

        if is_yes(decision) {
            self.phase = Phase::Rounds;
            self.level += 1;
            self.step = 0;
            self.level_anchor = self.history.len();
            let reply = self.reflection(llm).await?;
            self.history.push(HistoryEntry::Pond(reply.clone()));
            self.step = 1;
            return Ok(self.card("Round 1", &reply));
        }

        if is_more(decision) {
            if !decision.is_empty() {
                self.history.push(HistoryEntry::Player(decision.to_string()));
            }
            let close_line = self.close_sentence(llm).await?;
            self.history.push(HistoryEntry::Pond(close_line.clone()));
            let body = format!(
                "{close_line}<br><br>☁️ The pond grows quiet. Share more, or say \
<b>continue</b> to go deeper."
            );
            return Ok(self.card("Synthesis", &body));
        }

        Ok(self.card(
            "Synthesis",
            "If you'd like to go deeper, say <b>continue</b>. Or add another detail to stay \
a little longer.",
        ))
    }

    async fn advance_rounds(
        &mut self,
        llm: &LlmProvider,
        player_reply: &str,
    ) -> Result<String, AppError> {
        if !player_reply.is_empty() {
            self.history.push(HistoryEntry::Player(player_reply.to_string()));
        }

        if self.step + 1 < ROUNDS_PER_LEVEL {
            if self.step == 0 {
                self.level_anchor = self.history.len();
            }
            let reply = self.reflection(llm).await?;
            self.history.push(HistoryEntry::Pond(reply.clone()));
            self.step += 1;
            let round_name = format!("Round {}", self.step);
            return Ok(self.card(&round_name, &reply));
        }

        // Round 3: close the level, then synthesize the bridge onward.
        let close_line = self.close_sentence(llm).await?;
        self.history.push(HistoryEntry::Pond(close_line));

        if self.level + 1 < FOCUSES.len() {
            let next_name = FOCUSES[self.level + 1].name;
            let trans = self.transition_synthesis(llm, next_name).await?;
            self.history.push(HistoryEntry::Pond(trans.clone()));
            self.summaries.push(LevelSummary {
                level: self.focus().name.to_string(),
                summary: trans.clone(),
            });
            self.phase = Phase::LevelDecision;
            let invite = format!(
                "{trans}<br><br>☁️ The pond grows quiet. Say <b>continue</b> to move to \
Level {}: <b>{next_name}</b>, or add one more detail to linger here.",
                self.level + 2
            );
            Ok(self.card("Transition", &invite))
        } else {
            let trans = self.transition_synthesis(llm, "Archiving").await?;
            self.history.push(HistoryEntry::Pond(trans.clone()));
            self.summaries.push(LevelSummary {
                level: self.focus().name.to_string(),
                summary: trans.clone(),
            });
            self.phase = Phase::ArchiveChoice;
            let closing = format!(
                "{trans}<br><br>🌊 The reflection feels complete.<br>🪶 Do you let it \
<b>float</b>, <b>sink</b>, or <b>hold</b> it awhile longer?"
            );
            Ok(self.card("Transition", &closing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;

    fn dummy() -> LlmProvider {
        LlmProvider::Dummy(DummyProvider)
    }

    fn fresh() -> RitualState {
        RitualState::new("First Swim", "The lake was cold at dawn and it felt like waking up.")
    }

    /// Drive a fresh ritual through a whole level's three rounds.
    async fn run_level_rounds(state: &mut RitualState, llm: &LlmProvider) -> String {
        state.advance(llm, "another detail").await.unwrap();
        state.advance(llm, "a further detail").await.unwrap()
    }

    #[tokio::test]
    async fn begin_produces_round_one_card() {
        let llm = dummy();
        let mut state = fresh();
        let card = state.advance(&llm, "The lake was cold at dawn.").await.unwrap();
        assert!(card.contains("Round 1"));
        assert!(card.contains("Level 1 — Descriptive"));
        assert!(card.contains("pond-l0"));
        assert_eq!(state.phase(), Phase::Rounds);
    }

    #[tokio::test]
    async fn three_rounds_reach_level_decision() {
        let llm = dummy();
        let mut state = fresh();
        let r1 = state.advance(&llm, "The lake was cold at dawn.").await.unwrap();
        assert!(r1.contains("Round 1"));
        let r2 = state.advance(&llm, "My hands went numb first.").await.unwrap();
        assert!(r2.contains("Round 2"));
        let r3 = state.advance(&llm, "And then it felt calm.").await.unwrap();
        assert!(r3.contains("Transition"));
        assert!(r3.contains("<b>Analytic</b>"));
        assert_eq!(state.phase(), Phase::LevelDecision);
        assert_eq!(state.summaries().len(), 1);
        assert_eq!(state.summaries()[0].level, "Descriptive");
    }

    #[tokio::test]
    async fn continue_advances_to_next_level() {
        let llm = dummy();
        let mut state = fresh();
        state.advance(&llm, "offering text").await.unwrap();
        run_level_rounds(&mut state, &llm).await;
        let card = state.advance(&llm, "continue").await.unwrap();
        assert!(card.contains("Level 2 — Analytic"));
        assert!(card.contains("Round 1"));
        assert_eq!(state.phase(), Phase::Rounds);
    }

    #[tokio::test]
    async fn lingering_keeps_level_decision_open() {
        let llm = dummy();
        let mut state = fresh();
        state.advance(&llm, "offering text").await.unwrap();
        run_level_rounds(&mut state, &llm).await;
        let card = state
            .advance(&llm, "one more thing about the cold water that morning")
            .await
            .unwrap();
        assert!(card.contains("Share more, or say <b>continue</b>"));
        assert_eq!(state.phase(), Phase::LevelDecision);
        // The lingering detail is kept as player material.
        assert!(state.history().iter().any(|e| matches!(
            e,
            HistoryEntry::Player(t) if t.contains("cold water")
        )));
    }

    #[tokio::test]
    async fn ambiguous_decision_nudges() {
        let llm = dummy();
        let mut state = fresh();
        state.advance(&llm, "offering text").await.unwrap();
        run_level_rounds(&mut state, &llm).await;
        let card = state.advance(&llm, "hm").await.unwrap();
        assert!(card.contains("say <b>continue</b>"));
        assert_eq!(state.phase(), Phase::LevelDecision);
    }

    async fn run_to_archive_choice(state: &mut RitualState, llm: &LlmProvider) {
        state.advance(llm, "offering text").await.unwrap();
        run_level_rounds(state, llm).await;
        state.advance(llm, "continue").await.unwrap();
        run_level_rounds(state, llm).await;
        state.advance(llm, "continue").await.unwrap();
        run_level_rounds(state, llm).await;
    }

    #[tokio::test]
    async fn full_ritual_reaches_archive_choice() {
        let llm = dummy();
        let mut state = fresh();
        run_to_archive_choice(&mut state, &llm).await;
        assert_eq!(state.phase(), Phase::ArchiveChoice);
        assert_eq!(state.summaries().len(), 3);
    }

    #[tokio::test]
    async fn unparseable_choice_reprompts() {
        let llm = dummy();
        let mut state = fresh();
        run_to_archive_choice(&mut state, &llm).await;
        let card = state.advance(&llm, "maybe tomorrow").await.unwrap();
        assert!(card.contains("<b>float</b>, <b>sink</b>, or <b>hold</b>"));
        assert_eq!(state.phase(), Phase::ArchiveChoice);
    }

    #[tokio::test]
    async fn choice_finishes_with_artifact() {
        let llm = dummy();
        let mut state = fresh();
        run_to_archive_choice(&mut state, &llm).await;
        let card = state.advance(&llm, "let it sink").await.unwrap();
        assert!(card.contains("Memory Artifact"));
        assert!(card.contains("released and set down"));
        assert!(state.is_finished());
        assert_eq!(state.archive_choice(), Some(ArchiveChoice::Sink));
        assert!(state.last_artifact().is_some());
    }

    #[tokio::test]
    async fn finished_ritual_is_idempotent() {
        let llm = dummy();
        let mut state = fresh();
        run_to_archive_choice(&mut state, &llm).await;
        state.advance(&llm, "float").await.unwrap();
        let card = state.advance(&llm, "anything").await.unwrap();
        assert!(card.contains("ritual is complete"));
    }

    #[tokio::test]
    async fn later_levels_see_earlier_syntheses() {
        let llm = dummy();
        let mut state = fresh();
        state.advance(&llm, "offering text").await.unwrap();
        run_level_rounds(&mut state, &llm).await;
        state.advance(&llm, "continue").await.unwrap();
        let bundle = state.context_bundle();
        assert!(bundle.contains("Previous level syntheses:"));
        assert!(bundle.contains("- Descriptive:"));
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = fresh();
        let json = serde_json::to_string(&state).unwrap();
        let back: RitualState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title(), "First Swim");
        assert_eq!(back.phase(), Phase::Rounds);
    }
}
