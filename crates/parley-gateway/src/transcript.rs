use std::collections::HashSet;

use parley_types::models::Message;

/// Displayed transcript for a conversation: the history page followed by
/// live arrivals. A live entry whose `messageId` is already in the page is
/// skipped; entries without an id are always kept.
pub fn merge_transcript(history: &[Message], live: &[Message]) -> Vec<Message> {
    let seen: HashSet<&str> = history.iter().filter_map(|m| m.message_id.as_deref()).collect();

    let mut merged = Vec::with_capacity(history.len() + live.len());
    merged.extend_from_slice(history);
    merged.extend(
        live.iter()
            .filter(|m| m.message_id.as_deref().is_none_or(|id| !seen.contains(id)))
            .cloned(),
    );
    merged
}
