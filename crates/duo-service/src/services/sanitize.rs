//! Message content sanitization
//!
//! Strips markup and control characters before a message is stored or
//! delivered. Anything that survives is plain text.

use duo_core::DomainError;

/// Maximum characters allowed in a message after sanitization
pub const MAX_CONTENT_LEN: usize = 2000;

/// Sanitize user-supplied message content
///
/// Removes HTML-style tags and control characters, collapses the result,
/// and enforces the length bound.
///
/// # Errors
/// `EmptyContent` when nothing printable remains; `ValidationError` when
/// the content exceeds [`MAX_CONTENT_LEN`].
pub fn sanitize_content(raw: &str) -> Result<String, DomainError> {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;

    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            // Keep newlines and tabs, drop the rest of the control range
            c if c.is_control() && c != '\n' && c != '\t' => {}
            c => out.push(c),
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyContent);
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(DomainError::ValidationError(format!(
            "message exceeds {MAX_CONTENT_LEN} characters"
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(sanitize_content("hello world").unwrap(), "hello world");
    }

    #[test]
    fn test_tags_are_stripped() {
        assert_eq!(
            sanitize_content("<script>alert(1)</script>hi").unwrap(),
            "alert(1)hi"
        );
        assert_eq!(sanitize_content("a <b>bold</b> move").unwrap(), "a bold move");
    }

    #[test]
    fn test_control_characters_are_dropped() {
        assert_eq!(sanitize_content("a\u{0}b\u{7}c").unwrap(), "abc");
        // Newlines survive
        assert_eq!(sanitize_content("a\nb").unwrap(), "a\nb");
    }

    #[test]
    fn test_empty_after_sanitization() {
        assert!(matches!(
            sanitize_content("<div></div>"),
            Err(DomainError::EmptyContent)
        ));
        assert!(matches!(
            sanitize_content("   "),
            Err(DomainError::EmptyContent)
        ));
    }

    #[test]
    fn test_length_bound() {
        let long = "x".repeat(MAX_CONTENT_LEN + 1);
        assert!(matches!(
            sanitize_content(&long),
            Err(DomainError::ValidationError(_))
        ));

        let ok = "x".repeat(MAX_CONTENT_LEN);
        assert_eq!(sanitize_content(&ok).unwrap().len(), MAX_CONTENT_LEN);
    }
}
