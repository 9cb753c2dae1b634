//! Token-bounded, ordered message history for one character.
//!
//! Index `0` is always the system message once one has been set. Every append is followed by
//! an eviction pass: when the approximate token total reaches the budget, the oldest
//! non-system message (index `1`) is dropped. The running total always equals the sum of the
//! per-message counts.
//!
//! Token counts are approximated as `chars / chars_per_token`, which is close enough for
//! budgeting and avoids shipping a tokenizer.

use std::collections::VecDeque;

use crate::client_wrapper::{Message, Role};
use crate::config::{DEFAULT_CHARS_PER_TOKEN, DEFAULT_MAX_TOKENS};

/// How much to evict after an append that pushed the history over budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Drop at most one message per append. The total may stay over budget for a while.
    #[default]
    SingleEvictionPerAppend,
    /// Keep dropping the oldest non-system message until the total fits.
    UntilUnderBudget,
}

#[derive(Clone, Debug)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    token_counts: VecDeque<usize>,
    total_tokens: usize,
    max_token_budget: usize,
    chars_per_token: usize,
    policy: EvictionPolicy,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_TOKENS,
            DEFAULT_CHARS_PER_TOKEN,
            EvictionPolicy::default(),
        )
    }
}

impl ConversationHistory {
    pub fn new(max_token_budget: usize, chars_per_token: usize, policy: EvictionPolicy) -> Self {
        Self {
            messages: VecDeque::new(),
            token_counts: VecDeque::new(),
            total_tokens: 0,
            max_token_budget,
            chars_per_token: chars_per_token.max(1),
            policy,
        }
    }

    /// Approximate token count of a piece of text.
    pub fn estimate_tokens(&self, content: &str) -> usize {
        content.chars().count() / self.chars_per_token
    }

    /// Replace whatever message sits at index 0, of any role, with a new system message, then
    /// evict per the configured policy.
    pub fn set_system_message(&mut self, content: impl Into<String>) {
        let message = Message::system(content);
        let tokens = self.estimate_tokens(&message.content);
        if let Some(old) = self.token_counts.pop_front() {
            self.messages.pop_front();
            self.total_tokens -= old;
        }
        self.messages.push_front(message);
        self.token_counts.push_front(tokens);
        self.total_tokens += tokens;
        self.evict();
    }

    /// Append a message and evict per the configured policy.
    ///
    /// A system message is never appended: it replaces index 0 through
    /// [`set_system_message`](Self::set_system_message) instead.
    pub fn append(&mut self, message: Message) {
        if message.role == Role::System {
            self.set_system_message(message.content);
            return;
        }
        let tokens = self.estimate_tokens(&message.content);
        self.messages.push_back(message);
        self.token_counts.push_back(tokens);
        self.total_tokens += tokens;
        self.evict();
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.append(Message::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.append(Message::assistant(content));
    }

    fn evict(&mut self) {
        const VICTIM: usize = 1;
        loop {
            if self.total_tokens < self.max_token_budget || self.messages.len() <= VICTIM {
                return;
            }
            self.messages.remove(VICTIM);
            if let Some(tokens) = self.token_counts.remove(VICTIM) {
                self.total_tokens -= tokens;
            }
            log::debug!(
                "ConversationHistory: evicted oldest message, total now {} / {}",
                self.total_tokens,
                self.max_token_budget
            );
            if self.policy == EvictionPolicy::SingleEvictionPerAppend {
                return;
            }
        }
    }

    fn has_system_message(&self) -> bool {
        self.messages
            .front()
            .map(|m| m.role == Role::System)
            .unwrap_or(false)
    }

    /// Ordered snapshot for a completion request.
    pub fn to_ordered_messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn current_token_total(&self) -> usize {
        self.total_tokens
    }

    pub fn token_counts(&self) -> Vec<usize> {
        self.token_counts.iter().copied().collect()
    }

    pub fn max_token_budget(&self) -> usize {
        self.max_token_budget
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything except the system message.
    pub fn clear(&mut self) {
        let keep = usize::from(self.has_system_message());
        self.messages.truncate(keep);
        self.token_counts.truncate(keep);
        self.total_tokens = self.token_counts.iter().sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(history: &ConversationHistory) {
        assert_eq!(
            history.current_token_total(),
            history.token_counts().iter().sum::<usize>()
        );
        assert_eq!(history.token_counts().len(), history.len());
    }

    #[test]
    fn system_message_stays_at_index_zero() {
        let mut history = ConversationHistory::new(1000, 4, EvictionPolicy::default());
        history.set_system_message("you are a baker");
        history.append_user("hello there");
        let messages = history.to_ordered_messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hello there");

        history.set_system_message("you are a smith");
        assert_eq!(history.len(), 2);
        assert_eq!(history.to_ordered_messages()[0].content, "you are a smith");
        assert_consistent(&history);
    }

    #[test]
    fn set_system_message_replaces_leading_message_of_any_role() {
        let mut history = ConversationHistory::new(1000, 4, EvictionPolicy::default());
        history.append_user("early words");
        history.append_user("later words");
        history.set_system_message("prompt");

        let messages = history.to_ordered_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::system("prompt"));
        assert_eq!(messages[1].content, "later words");
        assert_consistent(&history);
    }

    #[test]
    fn reaching_budget_exactly_triggers_eviction() {
        let mut history = ConversationHistory::new(10, 4, EvictionPolicy::default());
        history.set_system_message("s".repeat(24));
        history.append_user("u".repeat(16));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_token_total(), 6);

        // back under budget: a small append is kept
        history.append_user("ok".repeat(2));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current_token_total(), 7);
    }

    #[test]
    fn over_budget_append_evicts_oldest_non_system_message() {
        let mut history = ConversationHistory::new(10, 4, EvictionPolicy::SingleEvictionPerAppend);
        history.set_system_message("x".repeat(32));
        history.append_user("y".repeat(20));

        assert_eq!(history.len(), 1);
        assert_eq!(history.to_ordered_messages()[0].role, Role::System);
        assert_eq!(history.current_token_total(), 8);
        assert_consistent(&history);
    }

    #[test]
    fn single_eviction_may_leave_history_over_budget() {
        let mut history = ConversationHistory::new(10, 4, EvictionPolicy::SingleEvictionPerAppend);
        history.set_system_message("s".repeat(4));
        history.append_user("a".repeat(16));
        history.append_assistant("b".repeat(16));
        history.append_user("c".repeat(40));

        // 1 + 4 + 4 = 9, then +10 = 19, one eviction drops "a" -> 15
        assert_eq!(history.current_token_total(), 15);
        assert_eq!(history.to_ordered_messages()[1].content, "b".repeat(16));
        assert_consistent(&history);
    }

    #[test]
    fn until_under_budget_keeps_evicting() {
        let mut history = ConversationHistory::new(12, 4, EvictionPolicy::UntilUnderBudget);
        history.set_system_message("s".repeat(4));
        history.append_user("a".repeat(16));
        history.append_assistant("b".repeat(16));
        history.append_user("c".repeat(40));

        assert_eq!(history.current_token_total(), 11);
        assert_eq!(history.len(), 2);
        assert_eq!(history.to_ordered_messages()[1].content, "c".repeat(40));
        assert_consistent(&history);
    }

    #[test]
    fn lone_system_message_is_never_evicted() {
        let mut history = ConversationHistory::new(2, 4, EvictionPolicy::UntilUnderBudget);
        history.set_system_message("z".repeat(100));
        history.append_user("q".repeat(8));
        assert_eq!(history.len(), 1);
        assert_eq!(history.to_ordered_messages()[0].role, Role::System);
        assert_eq!(history.current_token_total(), 25);
    }

    fn system_message_count(history: &ConversationHistory) -> usize {
        history
            .to_ordered_messages()
            .iter()
            .filter(|m| m.role == Role::System)
            .count()
    }

    #[test]
    fn appended_system_message_replaces_the_leading_one() {
        let mut history = ConversationHistory::new(1000, 4, EvictionPolicy::default());
        history.set_system_message("sys");
        history.append_user("hello");
        history.append_assistant("hi");
        history.append(Message::system("another"));

        let messages = history.to_ordered_messages();
        assert_eq!(system_message_count(&history), 1);
        assert_eq!(messages[0], Message::system("another"));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], Message::assistant("hi"));
        assert_consistent(&history);
    }

    #[test]
    fn user_and_assistant_appends_keep_single_leading_system_message() {
        let mut history = ConversationHistory::new(20, 4, EvictionPolicy::default());
        history.set_system_message("s".repeat(8));
        for i in 0..10 {
            history.append_user(format!("question {}", i));
            history.append_assistant(format!("answer {}", i));
            assert_eq!(system_message_count(&history), 1);
            assert_eq!(history.to_ordered_messages()[0].role, Role::System);
            assert_consistent(&history);
        }
    }

    #[test]
    fn longer_system_message_triggers_eviction() {
        let mut history = ConversationHistory::new(10, 4, EvictionPolicy::default());
        history.set_system_message("s".repeat(4));
        history.append_user("u".repeat(20));
        assert_eq!(history.current_token_total(), 6);

        history.set_system_message("t".repeat(24));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_token_total(), 6);
        assert_eq!(history.to_ordered_messages()[0].content, "t".repeat(24));
        assert_consistent(&history);
    }

    #[test]
    fn clear_keeps_system_message() {
        let mut history = ConversationHistory::default();
        history.set_system_message("system prompt");
        history.append_user("one");
        history.append_assistant("two");
        history.clear();
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_token_total(), 3);
        assert_consistent(&history);
    }
}
