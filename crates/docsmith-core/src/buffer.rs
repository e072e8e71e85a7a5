//! Conversation buffer with token-budgeted truncation.
//!
//! The buffer always starts with two seed messages (system prompt and user
//! task). Truncation keeps both seeds verbatim and then as many of the most
//! recent messages as fit in the remaining budget; older messages in between
//! are dropped.

use docsmith_providers::{Message, MessageRole};
use tracing::debug;

/// Default hard context limit of the model
pub const DEFAULT_CONTEXT_LIMIT: u32 = 128_000;

/// Default number of tokens kept free for the response
pub const DEFAULT_RESPONSE_RESERVE: u32 = 500;

/// Number of leading messages that survive every truncation
pub const SEED_COUNT: usize = 2;

/// Estimates the token cost of a message from its role and text
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, role: &MessageRole, text: &str) -> u32;
}

impl<F> TokenEstimator for F
where
    F: Fn(&MessageRole, &str) -> u32 + Send + Sync,
{
    fn estimate(&self, role: &MessageRole, text: &str) -> u32 {
        self(role, text)
    }
}

/// Character-count heuristic, no tokenizer required
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

/// Fixed per-message framing cost
const MESSAGE_OVERHEAD: u32 = 4;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, role: &MessageRole, text: &str) -> u32 {
        MESSAGE_OVERHEAD + estimate_text_tokens(role.as_str()) + estimate_text_tokens(text)
    }
}

/// Token estimate for raw text
pub fn estimate_text_tokens(text: &str) -> u32 {
    // ~4 chars per token for prose, ~3 for code/JSON, plus 10%
    let chars = text.chars().count() as f32;
    let base_estimate = if text.contains('{') || text.contains("```") || text.contains("fn ") {
        (chars / 3.0).ceil() as u32
    } else {
        (chars / 4.0).ceil() as u32
    };
    (base_estimate as f32 * 1.1).ceil() as u32
}

/// Budget left for the conversation once the response reserve is set aside
pub fn token_budget(context_limit: u32, response_reserve: u32) -> u32 {
    context_limit.saturating_sub(response_reserve)
}

/// Cost of one message, including any tool calls it carries
pub fn message_cost(estimator: &dyn TokenEstimator, message: &Message) -> u32 {
    if message.tool_calls.is_empty() {
        return estimator.estimate(&message.role, &message.content);
    }

    let mut text = message.content.clone();
    for call in &message.tool_calls {
        text.push('\n');
        text.push_str(&call.tool);
        text.push(' ');
        text.push_str(&call.arguments);
    }
    estimator.estimate(&message.role, &text)
}

/// Ordered conversation whose first two messages (system, user) survive every truncation
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
}

impl ConversationBuffer {
    /// A buffer holding exactly the two seed messages
    pub fn new(system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
        }
    }

    /// Wrap an existing message sequence as-is
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn estimated_tokens(&self, estimator: &dyn TokenEstimator) -> u32 {
        self.messages
            .iter()
            .map(|m| message_cost(estimator, m))
            .fold(0u32, u32::saturating_add)
    }

    /// Seeds plus the longest suffix of later messages that fits `token_budget`
    ///
    /// The seeds are kept even when they alone exceed the budget. With fewer
    /// than two messages the buffer is returned unchanged.
    pub fn truncate(&self, token_budget: u32, estimator: &dyn TokenEstimator) -> Vec<Message> {
        if self.messages.len() < SEED_COUNT {
            return self.messages.clone();
        }

        let (seeds, rest) = self.messages.split_at(SEED_COUNT);
        let seed_cost = seeds
            .iter()
            .map(|m| message_cost(estimator, m))
            .fold(0u32, u32::saturating_add);
        let mut remaining = token_budget.saturating_sub(seed_cost);

        let mut kept = 0;
        for message in rest.iter().rev() {
            let cost = message_cost(estimator, message);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            kept += 1;
        }

        let dropped = rest.len() - kept;
        if dropped > 0 {
            debug!(
                "Truncated conversation: dropped {} of {} messages to fit {} tokens",
                dropped,
                self.messages.len(),
                token_budget
            );
        }

        seeds
            .iter()
            .chain(rest[dropped..].iter())
            .cloned()
            .collect()
    }

    /// Replace the buffer contents with their truncation
    pub fn truncate_in_place(&mut self, token_budget: u32, estimator: &dyn TokenEstimator) {
        self.messages = self.truncate(token_budget, estimator);
    }
}
