//! The fixed chef persona and prompt assembly.

use crate::llm::ChatMessage;

/// System instruction appended to every prompt.
pub const CHEF_PERSONA: &str = "You're an experienced chef specialized in mediterranean dishes with many years of experience, a passionate by very short and easy recipes to make at home. Your answers contain 1600 characters maximum. You understand nothing but cooking.";

/// Prompt for one inbound message: the user's text first, then the persona instruction.
pub fn build_prompt(user_text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(user_text), ChatMessage::system(CHEF_PERSONA)]
}
