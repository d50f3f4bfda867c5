//! Per-conversation live buffers and join counts.
//!
//! Pure state, no I/O. The manager owns one of these behind its lock and
//! turns the return values into wire commands and change notifications.

use std::collections::HashMap;
use std::sync::Arc;

use parley_types::ChatId;
use parley_types::models::Message;

/// Position in the arrival sequence, used to clear everything a history
/// refetch already covers while keeping what arrived during the fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mark(u64);

/// One scoped holder of a chat, with its own view floor.
pub type HolderId = u64;

struct Entry {
    seq: u64,
    message: Message,
}

#[derive(Default)]
struct Conversation {
    joins: usize,
    entries: Vec<Entry>,
    /// Cached read view, dropped whenever `entries` changes.
    snapshot: Option<Arc<[Message]>>,
    /// Per-holder floor: each holder sees only entries past its own mark.
    floors: HashMap<HolderId, Mark>,
}

impl Conversation {
    fn invalidate(&mut self) {
        self.snapshot = None;
    }

    fn snapshot(&mut self) -> Arc<[Message]> {
        let entries = &self.entries;
        self.snapshot
            .get_or_insert_with(|| entries.iter().map(|e| e.message.clone()).collect())
            .clone()
    }

    /// Physically drop what every holder has moved past.
    fn trim(&mut self) -> bool {
        let Some(lowest) = self.floors.values().min().copied() else {
            return false;
        };
        let before = self.entries.len();
        self.entries.retain(|e| e.seq > lowest.0);
        let removed = self.entries.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }
}

pub struct ConversationBuffers {
    last_seq: u64,
    last_holder: HolderId,
    chats: HashMap<ChatId, Conversation>,
    empty: Arc<[Message]>,
}

impl Default for ConversationBuffers {
    fn default() -> Self {
        Self {
            last_seq: 0,
            last_holder: 0,
            chats: HashMap::new(),
            empty: Arc::from(Vec::new()),
        }
    }
}

impl ConversationBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the join count, creating an empty buffer if needed. Returns
    /// the new count.
    pub fn join(&mut self, chat_id: &str) -> usize {
        let conversation = self.chats.entry(chat_id.to_string()).or_default();
        conversation.joins += 1;
        conversation.joins
    }

    /// Drop one join. Returns the remaining count, or `None` if the chat
    /// was not joined. The buffer itself is kept.
    pub fn leave(&mut self, chat_id: &str) -> Option<usize> {
        let conversation = self.chats.get_mut(chat_id)?;
        if conversation.joins == 0 {
            return None;
        }
        conversation.joins -= 1;
        Some(conversation.joins)
    }

    pub fn join_count(&self, chat_id: &str) -> usize {
        self.chats.get(chat_id).map_or(0, |c| c.joins)
    }

    /// Chats with at least one join, in no particular order.
    pub fn joined(&self) -> Vec<ChatId> {
        self.chats
            .iter()
            .filter(|(_, c)| c.joins > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Append a live message to its chat. Returns false (and stores
    /// nothing) when nobody has joined that chat.
    pub fn append(&mut self, message: Message) -> bool {
        let Some(conversation) = self.chats.get_mut(&message.chat_id) else {
            return false;
        };
        if conversation.joins == 0 {
            return false;
        }

        self.last_seq += 1;
        conversation.entries.push(Entry {
            seq: self.last_seq,
            message,
        });
        conversation.invalidate();
        true
    }

    /// Current buffer contents. Repeated calls return the same `Arc` until
    /// the buffer changes.
    pub fn messages(&mut self, chat_id: &str) -> Arc<[Message]> {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return self.empty.clone();
        };
        if conversation.entries.is_empty() {
            return self.empty.clone();
        }

        conversation.snapshot()
    }

    /// Join as a scoped holder. The holder starts with no floor and sees
    /// the whole buffer.
    pub fn hold(&mut self, chat_id: &str) -> HolderId {
        self.join(chat_id);
        self.last_holder += 1;
        let holder = self.last_holder;
        if let Some(conversation) = self.chats.get_mut(chat_id) {
            conversation.floors.insert(holder, Mark::default());
        }
        holder
    }

    /// Forget a holder's floor without touching the join count. Returns
    /// true if the buffer shrank as a result.
    pub fn release(&mut self, chat_id: &str, holder: HolderId) -> bool {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return false;
        };
        conversation.floors.remove(&holder);
        conversation.trim()
    }

    /// Raise `holder`'s floor to `mark`, then trim what no holder still
    /// needs. Returns true if the holder's view changed.
    pub fn advance(&mut self, chat_id: &str, holder: HolderId, mark: Mark) -> bool {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return false;
        };
        let Some(floor) = conversation.floors.get_mut(&holder) else {
            return false;
        };
        if mark <= *floor {
            return false;
        }
        let old = std::mem::replace(floor, mark);
        let hid = conversation.entries.iter().any(|e| e.seq > old.0 && e.seq <= mark.0);
        conversation.trim();
        hid
    }

    /// The buffer as `holder` sees it. Equals [`ConversationBuffers::messages`]
    /// (same `Arc`) whenever the floor hides nothing.
    pub fn messages_for(&mut self, chat_id: &str, holder: HolderId) -> Arc<[Message]> {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return self.empty.clone();
        };
        let floor = conversation.floors.get(&holder).copied().unwrap_or_default();
        let visible = conversation.entries.iter().position(|e| e.seq > floor.0);
        match visible {
            None => self.empty.clone(),
            Some(0) => conversation.snapshot(),
            Some(start) => conversation.entries[start..]
                .iter()
                .map(|e| e.message.clone())
                .collect(),
        }
    }

    /// Empty the buffer. A chat nobody has joined is forgotten entirely.
    /// Returns true if anything was removed.
    pub fn clear(&mut self, chat_id: &str) -> bool {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return false;
        };

        let had_entries = !conversation.entries.is_empty();
        if conversation.joins == 0 {
            self.chats.remove(chat_id);
        } else {
            conversation.entries.clear();
            conversation.invalidate();
        }
        had_entries
    }

    /// Everything currently buffered for `chat_id` is at or before the
    /// returned mark; everything appended later is after it.
    pub fn mark(&self, chat_id: &str) -> Mark {
        self.chats
            .get(chat_id)
            .and_then(|c| c.entries.last())
            .map_or(Mark(self.last_seq), |e| Mark(e.seq))
    }

    /// Remove every entry that arrived at or before `mark`. Returns true if
    /// anything was removed.
    pub fn clear_through(&mut self, chat_id: &str, mark: Mark) -> bool {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return false;
        };

        let before = conversation.entries.len();
        conversation.entries.retain(|e| e.seq > mark.0);
        let removed = conversation.entries.len() != before;
        if removed {
            conversation.invalidate();
        }
        removed
    }

    /// Forget every join and every buffer. Returns the chats that were
    /// joined.
    pub fn leave_all(&mut self) -> Vec<ChatId> {
        let joined = self.joined();
        self.chats.clear();
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(chat_id: &str, content: &str) -> Message {
        Message {
            sender_id: "user-a".into(),
            content: content.into(),
            chat_id: chat_id.into(),
            sender_name: None,
            sender_username: None,
            message_id: None,
            created_at: None,
        }
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn arrival_order_is_preserved() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        for content in ["e1", "e2", "e3"] {
            assert!(buffers.append(msg("general", content)));
        }
        assert_eq!(contents(&buffers.messages("general")), ["e1", "e2", "e3"]);
    }

    #[test]
    fn unjoined_chats_drop_events() {
        let mut buffers = ConversationBuffers::new();
        assert!(!buffers.append(msg("random", "lost")));
        assert!(buffers.messages("random").is_empty());

        buffers.join("random");
        buffers.leave("random");
        assert!(!buffers.append(msg("random", "also lost")));
    }

    #[test]
    fn join_twice_is_same_buffer_state() {
        let mut once = ConversationBuffers::new();
        once.join("general");
        once.append(msg("general", "hi"));

        let mut twice = ConversationBuffers::new();
        twice.join("general");
        twice.join("general");
        twice.append(msg("general", "hi"));

        assert_eq!(once.messages("general"), twice.messages("general"));
        assert_eq!(twice.join_count("general"), 2);
    }

    #[test]
    fn leave_counts_down_and_keeps_buffer() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        buffers.join("general");
        buffers.append(msg("general", "kept"));

        assert_eq!(buffers.leave("general"), Some(1));
        assert_eq!(buffers.leave("general"), Some(0));
        assert_eq!(buffers.leave("general"), None);
        assert_eq!(contents(&buffers.messages("general")), ["kept"]);
        assert!(buffers.joined().is_empty());
    }

    #[test]
    fn clear_then_read_is_empty() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        buffers.append(msg("general", "gone"));

        assert!(buffers.clear("general"));
        assert!(buffers.messages("general").is_empty());
        assert_eq!(buffers.join_count("general"), 1);
        assert!(buffers.append(msg("general", "after")));
    }

    #[test]
    fn snapshot_is_pointer_stable_until_change() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        buffers.append(msg("general", "one"));

        let first = buffers.messages("general");
        let second = buffers.messages("general");
        assert!(Arc::ptr_eq(&first, &second));

        buffers.append(msg("general", "two"));
        let third = buffers.messages("general");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.len(), 1);
        assert_eq!(third.len(), 2);

        assert!(Arc::ptr_eq(&buffers.messages("nowhere"), &buffers.messages("elsewhere")));
    }

    #[test]
    fn clear_through_keeps_later_arrivals() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        buffers.join("other");
        buffers.append(msg("general", "covered by history"));

        let mark = buffers.mark("general");
        buffers.append(msg("other", "elsewhere"));
        buffers.append(msg("general", "arrived mid-fetch"));

        assert!(buffers.clear_through("general", mark));
        assert_eq!(contents(&buffers.messages("general")), ["arrived mid-fetch"]);
        assert!(!buffers.clear_through("general", mark));
        assert_eq!(contents(&buffers.messages("other")), ["elsewhere"]);
    }

    #[test]
    fn leave_all_forgets_everything() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("a");
        buffers.join("b");
        buffers.append(msg("a", "x"));

        let mut left = buffers.leave_all();
        left.sort();
        assert_eq!(left, ["a", "b"]);
        assert!(buffers.messages("a").is_empty());
        assert_eq!(buffers.join_count("b"), 0);
    }

    #[test]
    fn mark_is_per_chat() {
        let mut buffers = ConversationBuffers::new();
        buffers.join("general");
        buffers.join("other");
        buffers.append(msg("general", "g1"));
        let mark = buffers.mark("general");
        buffers.append(msg("other", "o1"));

        assert_eq!(buffers.mark("general"), mark);
        assert!(buffers.mark("other") > mark);
    }

    #[test]
    fn floors_are_per_holder() {
        let mut buffers = ConversationBuffers::new();
        let a = buffers.hold("general");
        buffers.append(msg("general", "e1"));
        buffers.append(msg("general", "e2"));

        let b = buffers.hold("general");
        let b_mark = buffers.mark("general");
        assert!(buffers.advance("general", b, b_mark));
        buffers.append(msg("general", "e3"));

        assert_eq!(contents(&buffers.messages_for("general", a)), ["e1", "e2", "e3"]);
        assert_eq!(contents(&buffers.messages_for("general", b)), ["e3"]);
        assert!(Arc::ptr_eq(&buffers.messages_for("general", a), &buffers.messages("general")));

        // Once A moves past e1 too, only e1 is physically gone.
        let a_mark = Mark(1);
        buffers.advance("general", a, a_mark);
        assert_eq!(contents(&buffers.messages("general")), ["e2", "e3"]);

        // Releasing A leaves B as the lowest floor.
        assert!(buffers.release("general", a));
        assert_eq!(contents(&buffers.messages("general")), ["e3"]);
    }
}
