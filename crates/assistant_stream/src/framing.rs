use core_types::StreamChunk;

use crate::sanitize::sanitize_content;

/// Splits a byte stream into newline-terminated lines.
///
/// Framing works on raw bytes: `\n` never occurs inside a multi-byte UTF-8
/// sequence, so a character split across two reads is reassembled before
/// the line is decoded.
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network read and returns every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos]));
        }
        lines
    }

    /// Returns the unterminated tail left at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let line = decode_line(&self.partial);
        self.partial.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Extracts display content from one stream line.
///
/// Blank lines, keep-alives, malformed JSON and chunks of any type other
/// than `response` all yield `None`.
pub fn content_from_line(line: &str) -> Option<String> {
    let line = line.trim();
    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(payload).ok()? {
        StreamChunk::Response { content } => {
            let cleaned = sanitize_content(&content);
            (!cleaned.is_empty()).then_some(cleaned)
        }
    }
}
