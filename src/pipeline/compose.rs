// src/pipeline/compose.rs
// Prompt composition for the final answer

use crate::message::{ChatMessage, Role};

/// Synthetic assistant reply shown when a turn fails outright.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Build the direct-mode prompt: prior turns rendered as Student / AI Tutor
/// pairs from in-memory state, then the current message.
///
/// Histories are never truncated or summarized; a long conversation grows
/// the prompt accordingly.
pub fn direct_prompt(history: &[ChatMessage], message: &str) -> String {
    if history.is_empty() {
        return message.to_string();
    }

    let mut prompt = String::from("Previous conversation:\n");
    for turn in history {
        let speaker = match turn.role {
            Role::User => "Student",
            Role::Assistant => "AI Tutor",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("\nStudent: ");
    prompt.push_str(message);
    prompt
}
