//! Payload parsing that reports where a provider response stopped matching our models.

use anyhow::Result;

/// Parse `body`, and on failure report the JSON path, a readable type mismatch
/// and a caret under the offending column.
pub fn parse_json_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let mut de = serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let (line, column) = (inner.line(), inner.column());

        let raw = inner.to_string();
        let location = format!(" at line {line} column {column}");
        let message = describe_mismatch(raw.strip_suffix(&location).unwrap_or(&raw));

        let at = if path.is_empty() || path == "." {
            String::new()
        } else {
            format!("at path '{path}': ")
        };
        anyhow::anyhow!(
            "{at}{message} (line {line} col {column})\n{}",
            snippet(body, line, column, 24)
        )
    })
}

/// Rewrites `invalid type: X, expected Y` as `expected Y, got X`.
fn describe_mismatch(message: &str) -> String {
    let Some(rest) = message.split_once("invalid type: ").map(|(_, rest)| rest) else {
        return message.to_string();
    };
    match rest.split_once(", expected ") {
        Some((actual, expected)) => format!("expected {}, got {actual}", expected.trim()),
        None => message.to_string(),
    }
}

fn snippet(body: &str, line: usize, column: usize, width: usize) -> String {
    let text = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if text.is_empty() {
        return "(empty line)".to_string();
    }

    let error_idx = column.saturating_sub(1).min(text.len());
    let start = floor_char_boundary(text, error_idx.saturating_sub(width / 2));
    let end = floor_char_boundary(text, (error_idx + width / 2).min(text.len()));
    let caret = " ".repeat(error_idx.saturating_sub(start)) + "^";

    format!("...{}...\n   {caret}", &text[start..end])
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
