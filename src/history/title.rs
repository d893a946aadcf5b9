/// Placeholder title for a conversation that has not been written to yet.
pub const DEFAULT_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 30;

/// Derive a conversation title from the first user message: the message
/// itself when short, otherwise a 30-char prefix plus an ellipsis. Assigned
/// exactly once, at the first send into an empty conversation.
pub(crate) fn title_from_first_message(source: &str) -> String {
    let source = source.trim();
    if source.chars().count() <= TITLE_MAX_CHARS {
        return source.to_string();
    }
    source.chars().take(TITLE_MAX_CHARS).collect::<String>() + "..."
}
