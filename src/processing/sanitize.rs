//! Helpers for normalizing uploaded names and contents.

use regex::Regex;
use std::sync::LazyLock;

use super::types::DocumentError;

static LEADING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A```(?:markdown|md)?[ \t]*\r?\n").expect("valid leading fence regex")
});
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*\z").expect("valid trailing fence regex"));

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reduce a client supplied filename to its final path component.
///
/// Both `/` and `\` are treated as separators. Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Lowercase extension of `filename`, without the dot. Empty when absent.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => extension.to_lowercase(),
        _ => String::new(),
    }
}

/// `filename` without its final extension.
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

/// Decode uploaded bytes as UTF-8 text, dropping a leading byte order mark.
pub fn decode_text(content: &[u8]) -> Result<String, DocumentError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    if content.contains(&0) {
        return Err(DocumentError::BinaryContent);
    }
    String::from_utf8(content.to_vec())
        .map_err(|error| DocumentError::InvalidEncoding(error.utf8_error().to_string()))
}

/// Remove a code fence wrapping the whole document, as LLM exports often add, and trim.
///
/// Only a bare or `markdown`/`md` opening fence on the first line counts, and only together
/// with a closing fence at the very end. Anything else is returned trimmed but otherwise
/// untouched.
pub fn strip_markdown_fences(text: &str) -> String {
    let text = text.trim();
    let Some(opening) = LEADING_FENCE.find(text) else {
        return text.to_string();
    };
    let body = &text[opening.end()..];
    match TRAILING_FENCE.find(body) {
        Some(closing) => body[..closing.start()].trim().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_keeps_base_name() {
        assert_eq!(sanitize_filename("notes.md").as_deref(), Some("notes.md"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename(r"C:\docs\guide.md").as_deref(),
            Some("guide.md")
        );
        assert!(sanitize_filename("").is_none());
        assert!(sanitize_filename("dir/").is_none());
        assert!(sanitize_filename("..").is_none());
    }

    #[test]
    fn extension_and_stem_ignore_leading_dot() {
        assert_eq!(file_extension("Guide.MD"), "md");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension(".env"), "");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_stem("guide.md"), "guide");
        assert_eq!(file_stem(".env"), ".env");
    }

    #[test]
    fn decode_text_handles_bom_and_rejects_invalid_input() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello").unwrap(), "hello");
        assert_eq!(decode_text(b"a\x00b"), Err(DocumentError::BinaryContent));
        assert!(matches!(
            decode_text(&[0x66, 0xff, 0xfe]),
            Err(DocumentError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn strip_markdown_fences_unwraps_document() {
        assert_eq!(
            strip_markdown_fences("```markdown\n# Title\n\nBody\n```\n"),
            "# Title\n\nBody"
        );
        assert_eq!(strip_markdown_fences("```\ntext\n```"), "text");
        assert_eq!(
            strip_markdown_fences("# Title\n```rust\nfn main() {}\n```\nafter"),
            "# Title\n```rust\nfn main() {}\n```\nafter"
        );
        assert_eq!(strip_markdown_fences("```\n\n```"), "");
    }

    #[test]
    fn strip_markdown_fences_keeps_closing_code_block() {
        let guide = "# Guide\n\nRun this:\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(
            strip_markdown_fences(guide),
            "# Guide\n\nRun this:\n\n```rust\nfn main() {}\n```"
        );
    }

    #[test]
    fn strip_markdown_fences_needs_both_fences() {
        assert_eq!(
            strip_markdown_fences("```rust\nfn main() {}\n```"),
            "```rust\nfn main() {}\n```"
        );
        assert_eq!(
            strip_markdown_fences("```\nfirst\n```\nthen prose"),
            "```\nfirst\n```\nthen prose"
        );
        assert_eq!(
            strip_markdown_fences("```markdown\nunterminated"),
            "```markdown\nunterminated"
        );
    }
}
