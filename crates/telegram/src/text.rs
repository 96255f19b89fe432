/// Telegram message size limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

#[must_use]
pub fn truncate_at_char_boundary(text: &str, max_len: usize) -> &str {
    &text[..text.floor_char_boundary(max_len)]
}

/// Split text into chunks that fit within Telegram's message limit.
/// Tries to split at newlines or spaces to avoid breaking words.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut window = remaining.floor_char_boundary(max_len);
        if window == 0 {
            window = remaining
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(remaining.len());
        }

        let slice = &remaining[..window];
        let split_at = match slice.rfind('\n').or_else(|| slice.rfind(' ')) {
            Some(0) | None => window,
            Some(at) => at,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
        if let Some(rest) = remaining.strip_prefix(' ') {
            remaining = rest;
        }
    }

    chunks
}
