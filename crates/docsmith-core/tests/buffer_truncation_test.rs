//! Truncation behaviour of the conversation buffer against a scripted cost model.

use docsmith_core::buffer::{message_cost, ConversationBuffer, HeuristicEstimator, TokenEstimator};
use docsmith_core::{Message, MessageRole, ToolCall};

/// Seeds cost 25 each, every later message costs 80
fn scenario_estimator(role: &MessageRole, _text: &str) -> u32 {
    match role {
        MessageRole::System | MessageRole::User => 25,
        MessageRole::Assistant | MessageRole::Tool => 80,
    }
}

/// Two seeds plus ten alternating assistant / tool-result messages
fn scenario_buffer() -> ConversationBuffer {
    let mut buffer = ConversationBuffer::new("system prompt", "document https://x.test");
    for i in 0..5 {
        let id = format!("call_{}", i);
        buffer.append(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new(&id, "extract_page_content", "{}")],
        ));
        buffer.append(Message::tool_result(&id, format!("page {}", i)));
    }
    buffer
}

fn total_cost(messages: &[Message], estimator: &dyn TokenEstimator) -> u32 {
    messages.iter().map(|m| message_cost(estimator, m)).sum()
}

#[test]
fn test_everything_kept_when_under_budget() {
    let buffer = scenario_buffer();
    assert_eq!(buffer.estimated_tokens(&scenario_estimator), 850);

    let truncated = buffer.truncate(1000, &scenario_estimator);

    assert_eq!(truncated.len(), 12);
    assert_eq!(truncated, buffer.messages());
}

#[test]
fn test_seeds_plus_three_most_recent_at_300() {
    let buffer = scenario_buffer();

    let truncated = buffer.truncate(300, &scenario_estimator);

    assert_eq!(truncated.len(), 5);
    assert_eq!(&truncated[..2], &buffer.messages()[..2]);
    assert_eq!(&truncated[2..], &buffer.messages()[9..]);
    assert_eq!(total_cost(&truncated, &scenario_estimator), 290);
}

#[test]
fn test_budget_is_respected_for_every_budget() {
    let buffer = scenario_buffer();
    for budget in (50..=1000).step_by(7) {
        let truncated = buffer.truncate(budget, &scenario_estimator);
        assert!(
            total_cost(&truncated, &scenario_estimator) <= budget,
            "budget {} exceeded",
            budget
        );
        assert_eq!(&truncated[..2], &buffer.messages()[..2]);
    }
}

#[test]
fn test_result_is_exact_suffix_in_order() {
    let buffer = scenario_buffer();
    let all = buffer.messages();

    for budget in [50, 129, 130, 210, 450, 849] {
        let truncated = buffer.truncate(budget, &scenario_estimator);
        let k = truncated.len() - 2;
        assert_eq!(k as u32, (budget - 50) / 80, "budget {}", budget);
        assert_eq!(&truncated[2..], &all[all.len() - k..]);
    }
}

#[test]
fn test_truncation_is_idempotent() {
    let buffer = scenario_buffer();
    let once = buffer.truncate(450, &scenario_estimator);
    let twice = ConversationBuffer::from_messages(once.clone()).truncate(450, &scenario_estimator);

    assert_eq!(once, twice);
}

#[test]
fn test_truncation_does_not_mutate_buffer() {
    let buffer = scenario_buffer();
    let _ = buffer.truncate(100, &scenario_estimator);
    assert_eq!(buffer.len(), 12);
}

#[test]
fn test_heuristic_estimator_keeps_recent_tool_output() {
    let mut buffer = ConversationBuffer::new("system", "task");
    buffer.append(Message::tool_result("old", "x".repeat(4000)));
    buffer.append(Message::tool_result("new", "recent".to_string()));

    let truncated = buffer.truncate(200, &HeuristicEstimator);

    assert_eq!(truncated.len(), 3);
    assert_eq!(truncated[2].tool_call_id.as_deref(), Some("new"));
}
