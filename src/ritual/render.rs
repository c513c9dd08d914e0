//! HTML card rendering.
//!
//! Every reply the service returns is a self-contained `pond-card` fragment;
//! clients (the game UI, a plain browser) drop it into the page as-is. The
//! `pond-l{N}` class keys the per-level background color on the client side.

use super::Focus;

/// One card in the current level's visual style.
pub fn level_card(level: usize, focus: &Focus, round_name: &str, body_html: &str) -> String {
    format!(
        "<div class='pond-card pond-l{level}'>\
  <div class='pond-title'>{icon} <b>Level {n} — {name}</b> · {round_name}</div>\
  <div class='pond-metaphor'><em>{metaphor}</em></div>\
  <div class='pond-body'>{body_html}</div>\
</div>",
        icon = focus.icon,
        n = level + 1,
        name = focus.name,
        metaphor = focus.metaphor,
    )
}

/// The final memory artifact card.
pub fn artifact_card(body: &str, stance: &str) -> String {
    format!(
        "<div class='pond-card pond-l2'>\
<div class='pond-title'>🪶 Memory Artifact</div>\
<div class='pond-body'>{body}<br><br><b>{stance}</b></div>\
</div>"
    )
}

/// A bare-body card without a level header, in the given level style.
fn plain_card(level: usize, body: &str) -> String {
    format!("<div class='pond-card pond-l{level}'><div class='pond-body'>{body}</div></div>")
}

pub fn complete_card() -> String {
    plain_card(2, "The ritual is complete.")
}

pub fn title_missing_card() -> String {
    plain_card(0, "Please give your offering a short title (1–5 words).")
}

pub fn begin_first_card() -> String {
    plain_card(0, "<b>Begin</b> the ritual first.")
}

pub fn finish_first_card() -> String {
    plain_card(2, "Finish the ritual first.")
}

pub fn nothing_stored_card() -> String {
    plain_card(2, "🌫 Nothing stored — the pond remains still.")
}

pub fn saved_card() -> String {
    plain_card(2, "✨ Saved: a small ripple joins the pond archive.")
}
