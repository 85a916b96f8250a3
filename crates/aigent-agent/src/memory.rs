//! Conversation memory — the ordered message history one agent owns.
//!
//! Retention keeps the store bounded: once it grows past `max_messages`,
//! the first system message survives and only the newest non-system
//! messages are kept, in their original order. Trimmed messages are gone
//! for good.

use aigent_core::config::MemoryConfig;
use aigent_core::Message;
use tracing::debug;

// ─────────────────────────────────────────────
// MessageStore
// ─────────────────────────────────────────────

/// Ordered, bounded message history.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
    policy: MemoryConfig,
}

impl MessageStore {
    /// Empty store governed by `policy`.
    pub fn new(policy: MemoryConfig) -> Self {
        Self {
            messages: Vec::new(),
            policy,
        }
    }

    /// Push a message, then apply retention if memory is enabled.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        if self.policy.enabled {
            self.retain_recent();
        }
    }

    /// A copy of the full history. Later mutation of the store is not
    /// visible through the returned vector.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the live history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drop everything except the first system message.
    pub fn clear(&mut self) {
        let system = self.messages.iter().find(|m| m.is_system()).cloned();
        self.messages = system.into_iter().collect();
    }

    /// Replace the history wholesale with an earlier snapshot.
    pub fn restore(&mut self, snapshot: Vec<Message>) {
        self.messages = snapshot;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn retain_recent(&mut self) {
        let max = self.policy.max_messages.max(1);
        let before = self.messages.len();
        if before <= max {
            return;
        }

        let all = std::mem::take(&mut self.messages);
        let system = all.iter().position(Message::is_system);

        self.messages = match system {
            Some(idx) => {
                let mut all = all;
                let system_msg = all.remove(idx);
                let rest: Vec<Message> = all.into_iter().filter(|m| !m.is_system()).collect();
                let skip = rest.len().saturating_sub(max - 1);
                std::iter::once(system_msg)
                    .chain(rest.into_iter().skip(skip))
                    .collect()
            }
            None => {
                let skip = before - max;
                all.into_iter().skip(skip).collect()
            }
        };

        debug!(
            before = before,
            after = self.messages.len(),
            max_messages = max,
            "memory trimmed"
        );
    }
}
