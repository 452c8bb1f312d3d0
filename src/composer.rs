use crate::config::DAYS_REMAINING_TOKEN;
use crate::types::{ChatMessage, ComposedPrompt, HistoryEntry, Role};

/// Fill the instruction template's days-remaining token.
pub fn render_instruction(template: &str, days_remaining: Option<i64>) -> String {
    match days_remaining {
        Some(days) => template.replace(DAYS_REMAINING_TOKEN, &days.to_string()),
        None => template.to_string(),
    }
}

/// Build the message sequence for one generation call.
///
/// Layout is `instruction, (prior input, prior output) * history, current forecast`,
/// i.e. `2 * history.len() + 2` messages. `history` must already be oldest-first.
pub fn compose(instruction: &str, history: &[HistoryEntry], current_forecast: &str) -> ComposedPrompt {
    let mut messages = Vec::with_capacity(2 * history.len() + 2);
    messages.push(ChatMessage::new(Role::System, instruction));
    for entry in history {
        messages.push(ChatMessage::new(Role::User, entry.input_context.as_str()));
        messages.push(ChatMessage::new(Role::Assistant, entry.generated_output.as_str()));
    }
    messages.push(ChatMessage::new(Role::System, current_forecast));
    ComposedPrompt { messages }
}
