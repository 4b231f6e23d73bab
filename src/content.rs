//! Helpers for extracting tool-result content
//!
//! Convenience functions over [`CallToolResult`]: concatenating text items
//! and decoding base64 image items. Pure functions; nothing here touches
//! the protocol engine.

use base64::Engine as _;

use crate::error::{McpError, Result};
use crate::types::{CallToolResult, ContentItem};

/// A decoded image content item.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type as reported by the server (e.g. `image/png`).
    pub mime_type: String,
}

/// Concatenate every text item of a tool result, joined with newlines.
///
/// Non-text items are skipped. Returns an empty string for a result with
/// no text content.
///
/// # Examples
///
/// ```
/// use mcpkit::content::text_content;
/// use mcpkit::types::CallToolResult;
///
/// let result: CallToolResult = serde_json::from_value(serde_json::json!({
///     "content": [
///         { "type": "text", "text": "hello" },
///         { "type": "text", "text": "world" }
///     ]
/// })).unwrap();
/// assert_eq!(text_content(&result), "hello\nworld");
/// ```
pub fn text_content(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|item| match item {
            ContentItem::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode every base64 image item of a tool result.
///
/// # Errors
///
/// Returns an error when any image item carries invalid base64; valid items
/// decoded before the failure are discarded.
pub fn image_content(result: &CallToolResult) -> Result<Vec<DecodedImage>> {
    let mut images = Vec::new();
    for item in &result.content {
        if let ContentItem::Image { data, mime_type } = item {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| McpError::Transport(format!("invalid base64 image data: {e}")))?;
            images.push(DecodedImage {
                bytes,
                mime_type: mime_type.clone(),
            });
        }
    }
    Ok(images)
}

/// Whether the tool itself reported failure via the `isError` flag.
pub fn is_tool_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}
