// Outbound formatting policies: message-length chunking and the code-block
// delivery decision.

/// Discord's hard per-message length limit, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Split text into successive fixed-size chunks of at most `limit`
/// characters, on character boundaries. Concatenating the chunks in order
/// reproduces the input exactly. Empty input still yields one (empty)
/// chunk so a send always happens.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;
    for ch in text.chars() {
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// How a code block goes out: inline when the fenced rendering fits in one
/// message, otherwise as a single file attachment. Code must not be split
/// mid-block, so oversized blocks are never chunked.
#[derive(Debug, PartialEq, Eq)]
pub enum CodeDelivery {
    Inline(String),
    File {
        file_name: String,
        /// Message text accompanying the attachment (the title, if any).
        content: Option<String>,
    },
}

pub fn plan_code_block(code: &str, language: Option<&str>, title: Option<&str>) -> CodeDelivery {
    let mut rendered = String::new();
    if let Some(title) = title {
        rendered.push_str("**");
        rendered.push_str(title);
        rendered.push_str("**\n");
    }
    rendered.push_str("```");
    rendered.push_str(language.unwrap_or(""));
    rendered.push('\n');
    rendered.push_str(code);
    rendered.push_str("\n```");

    if rendered.chars().count() <= MESSAGE_LIMIT {
        CodeDelivery::Inline(rendered)
    } else {
        CodeDelivery::File {
            file_name: format!("code.{}", language.unwrap_or("txt")),
            content: title.map(|t| format!("**{t}**")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_at_limit_is_one_chunk() {
        let text = "a".repeat(2000);
        let chunks = chunk_text(&text, MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 2000);
    }

    #[test]
    fn test_one_over_limit_is_two_chunks_reassembling_exactly() {
        let text: String = ('a'..='z').cycle().take(2001).collect();
        let chunks = chunk_text(&text, MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 1);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunking_counts_characters_not_bytes() {
        let text = "é".repeat(2500);
        let chunks = chunk_text(&text, MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_text_still_sends_once() {
        assert_eq!(chunk_text("", MESSAGE_LIMIT), vec![String::new()]);
    }

    #[test]
    fn test_small_code_block_renders_inline() {
        let plan = plan_code_block("fn main() {}", Some("rust"), Some("Entry point"));
        match plan {
            CodeDelivery::Inline(text) => {
                assert_eq!(text, "**Entry point**\n```rust\nfn main() {}\n```");
            }
            CodeDelivery::File { .. } => panic!("small block should stay inline"),
        }
    }

    #[test]
    fn test_oversized_code_block_becomes_a_file() {
        let code = "x".repeat(2100);
        match plan_code_block(&code, Some("py"), None) {
            CodeDelivery::File { file_name, content } => {
                assert_eq!(file_name, "code.py");
                assert_eq!(content, None);
            }
            CodeDelivery::Inline(_) => panic!("oversized block must become a file"),
        }
    }

    #[test]
    fn test_file_name_defaults_to_txt_without_language() {
        let code = "x".repeat(2100);
        match plan_code_block(&code, None, Some("Dump")) {
            CodeDelivery::File { file_name, content } => {
                assert_eq!(file_name, "code.txt");
                assert_eq!(content.as_deref(), Some("**Dump**"));
            }
            CodeDelivery::Inline(_) => panic!("oversized block must become a file"),
        }
    }

    #[test]
    fn test_fences_count_toward_the_limit() {
        // 1990 chars of code fits, but the fences and title push the
        // rendering past 2000.
        let code = "x".repeat(1990);
        let plan = plan_code_block(&code, Some("rust"), Some("A fairly long title here"));
        assert!(matches!(plan, CodeDelivery::File { .. }));
    }
}
