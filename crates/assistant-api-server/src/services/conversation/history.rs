use crate::models::chat::Message;

/// Messages kept for model context in direct generation
pub const MODEL_CONTEXT_MESSAGES: usize = 10;

/// Messages rendered into the RAG prompt's history section
pub const RAG_HISTORY_MESSAGES: usize = 5;

/// Client history wins whenever the client sent any entries, even if truncated
/// or if none of them survived adaptation. No client history falls back to
/// the stored one.
pub fn merge_history(client: Option<Vec<Message>>, stored: Vec<Message>) -> Vec<Message> {
    client.unwrap_or(stored)
}

/// Tail of `history` with at most `limit` messages.
pub fn recent(history: &[Message], limit: usize) -> &[Message] {
    &history[history.len().saturating_sub(limit)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_client_history_overrides_stored() {
        let client = vec![Message::user("client")];
        let stored = vec![Message::user("s1"), Message::assistant("s2")];

        let merged = merge_history(Some(client), stored);
        assert_eq!(contents(&merged), vec!["client"]);
    }

    #[test]
    fn test_client_history_without_usable_entries_still_overrides() {
        let stored = vec![Message::user("s1")];

        let merged = merge_history(Some(Vec::new()), stored);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_empty_client_history_falls_back_to_stored() {
        let stored = vec![Message::user("s1"), Message::assistant("s2")];

        let merged = merge_history(None, stored);
        assert_eq!(contents(&merged), vec!["s1", "s2"]);
    }

    #[test]
    fn test_recent_keeps_tail() {
        let history: Vec<Message> = (0..12).map(|i| Message::user(i.to_string())).collect();

        assert_eq!(recent(&history, MODEL_CONTEXT_MESSAGES).len(), 10);
        assert_eq!(recent(&history, RAG_HISTORY_MESSAGES)[0].content, "7");
        assert_eq!(recent(&history[..3], RAG_HISTORY_MESSAGES).len(), 3);
    }
}
