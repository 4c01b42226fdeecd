//! Content-type identifiers (UTIs) and their file extensions
//!
//! The manifest `type` field names the format of the `text.*` payload. The
//! writer picks the payload's extension from it; the scanner infers it back
//! from the extension when `info.json` does not say.

use std::path::Path;

/// Markdown, the format most TextBundle producers use
pub const MARKDOWN: &str = "net.daringfireball.markdown";

/// Plain text, the fallback type
pub const PLAIN_TEXT: &str = "public.plain-text";

/// HTML
pub const HTML: &str = "public.html";

/// Fountain screenplay markup
pub const FOUNTAIN: &str = "com.quoteunquoteapps.fountain";

/// Directory package
pub const TEXTBUNDLE: &str = "org.textbundle.package";

/// Zip-compressed package
pub const TEXTPACK: &str = "org.textbundle.compressed";

/// Extension used when a type has no known mapping
pub const FALLBACK_EXTENSION: &str = "txt";

/// Known payload types; the first extension is the preferred one
const PAYLOAD_TYPES: &[(&str, &[&str])] = &[
    (MARKDOWN, &["md", "markdown", "mdown", "mkd"]),
    (PLAIN_TEXT, &["txt", "text"]),
    (HTML, &["html", "htm"]),
    (FOUNTAIN, &["fountain"]),
];

/// Preferred extension for a content type, if the type is known
pub fn preferred_extension(content_type: &str) -> Option<&'static str> {
    PAYLOAD_TYPES
        .iter()
        .find(|(uti, _)| uti.eq_ignore_ascii_case(content_type))
        .and_then(|(_, exts)| exts.first().copied())
}

/// Extension the writer will actually use for a content type
pub fn extension_for(content_type: &str) -> &'static str {
    preferred_extension(content_type).unwrap_or(FALLBACK_EXTENSION)
}

/// Content type implied by a payload extension
pub fn type_for_extension(extension: &str) -> Option<&'static str> {
    PAYLOAD_TYPES
        .iter()
        .find(|(_, exts)| exts.iter().any(|e| e.eq_ignore_ascii_case(extension)))
        .map(|(uti, _)| *uti)
}

/// Type a reader assumes when `info.json` omits it
pub fn default_type_for(extension: Option<&str>) -> &'static str {
    extension.and_then(type_for_extension).unwrap_or(PLAIN_TEXT)
}

/// Whether a path carries the `.textbundle` extension
pub fn is_textbundle_path(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), "textbundle")
}

/// Whether a path carries the `.textpack` extension
pub fn is_textpack_path(path: impl AsRef<Path>) -> bool {
    has_extension(path.as_ref(), "textpack")
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_extension() {
        assert_eq!(preferred_extension(MARKDOWN), Some("md"));
        assert_eq!(preferred_extension(PLAIN_TEXT), Some("txt"));
        assert_eq!(preferred_extension("com.example.unknown"), None);
        assert_eq!(extension_for("com.example.unknown"), "txt");
    }

    #[test]
    fn test_type_for_extension() {
        assert_eq!(type_for_extension("md"), Some(MARKDOWN));
        assert_eq!(type_for_extension("MARKDOWN"), Some(MARKDOWN));
        assert_eq!(type_for_extension("htm"), Some(HTML));
        assert_eq!(type_for_extension("png"), None);
        assert_eq!(default_type_for(None), PLAIN_TEXT);
        assert_eq!(default_type_for(Some("rtf")), PLAIN_TEXT);
    }

    #[test]
    fn test_package_paths() {
        assert!(is_textbundle_path("notes/Draft.textbundle"));
        assert!(is_textpack_path("Draft.TEXTPACK"));
        assert!(!is_textpack_path("Draft.textbundle"));
        assert!(!is_textbundle_path("textbundle"));
    }
}
