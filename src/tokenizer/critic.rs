//!
//! CriticMarkup grammar pieces: sigil detection, comment metadata, and the
//! ID-based range encoding. The recursive scanning lives in the inline
//! scanner; this module owns the delimiter rules.

use std::sync::LazyLock;

use regex::Regex;

/// `author (YYYY-MM-DD HH:MM): text` prefix inside a comment body.
static COMMENT_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([^(){}]+?) \((\d{4}-\d{2}-\d{2}(?: \d{2}:\d{2})?)\): ?(.*)$").unwrap()
});

/// The five CriticMarkup element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticKind {
    Insertion,
    Deletion,
    Substitution,
    Highlight,
    Comment,
}

impl CriticKind {
    pub fn opener(&self) -> &'static str {
        match self {
            CriticKind::Insertion => "{++",
            CriticKind::Deletion => "{--",
            CriticKind::Substitution => "{~~",
            CriticKind::Highlight => "{==",
            CriticKind::Comment => "{>>",
        }
    }

    pub fn closer(&self) -> &'static str {
        match self {
            CriticKind::Insertion => "++}",
            CriticKind::Deletion => "--}",
            CriticKind::Substitution => "~~}",
            CriticKind::Highlight => "==}",
            CriticKind::Comment => "<<}",
        }
    }
}

/// Detect a CriticMarkup opener at the start of `text`.
pub fn detect_opener(text: &str) -> Option<CriticKind> {
    for kind in [
        CriticKind::Insertion,
        CriticKind::Deletion,
        CriticKind::Substitution,
        CriticKind::Highlight,
        CriticKind::Comment,
    ] {
        if text.starts_with(kind.opener()) {
            return Some(kind);
        }
    }
    None
}

/// Find the closer for `kind`, searching from just after the opener.
/// Returns the byte offset of the closer relative to `interior_start`.
pub fn find_closer(text: &str, kind: CriticKind) -> Option<usize> {
    text.find(kind.closer())
}

/// Split a substitution interior at the `~>` separator.
pub fn split_substitution(interior: &str) -> Option<(&str, &str)> {
    interior.split_once("~>")
}

/// Parsed comment body metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentMeta {
    pub author: Option<String>,
    pub date: Option<String>,
    pub text: String,
}

/// Split the optional `author (date):` prefix off a comment body.
pub fn parse_comment_meta(raw: &str) -> CommentMeta {
    if let Some(caps) = COMMENT_META.captures(raw) {
        return CommentMeta {
            author: caps.get(1).map(|m| m.as_str().trim().to_string()),
            date: caps.get(2).map(|m| m.as_str().to_string()),
            text: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        };
    }
    CommentMeta {
        author: None,
        date: None,
        text: raw.to_string(),
    }
}

/// Parse `{#id>>text<<}` at the start of `text`. Returns (consumed, id, body).
pub fn parse_id_comment(text: &str) -> Option<(usize, String, String)> {
    let rest = text.strip_prefix("{#")?;
    if rest.starts_with('#') {
        return None; // that is a {##id} range mark
    }
    let sigil = rest.find(">>")?;
    let id = &rest[..sigil];
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    let body_start = sigil + 2;
    let close = rest[body_start..].find("<<}")?;
    let body = &rest[body_start..body_start + close];
    let consumed = 2 + body_start + close + 3;
    Some((consumed, id.to_string(), body.to_string()))
}

/// Parse `{##id}` at the start of `text`. Returns (consumed, id).
pub fn parse_range_mark(text: &str) -> Option<(usize, String)> {
    let rest = text.strip_prefix("{##")?;
    let close = rest.find('}')?;
    let id = &rest[..close];
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    Some((3 + close + 1, id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openers() {
        assert_eq!(detect_opener("{++add++}"), Some(CriticKind::Insertion));
        assert_eq!(detect_opener("{--del--}"), Some(CriticKind::Deletion));
        assert_eq!(detect_opener("{~~a~>b~~}"), Some(CriticKind::Substitution));
        assert_eq!(detect_opener("{==mark==}"), Some(CriticKind::Highlight));
        assert_eq!(detect_opener("{>>note<<}"), Some(CriticKind::Comment));
        assert_eq!(detect_opener("{plain}"), None);
    }

    #[test]
    fn test_substitution_split() {
        assert_eq!(split_substitution("old~>new"), Some(("old", "new")));
        assert_eq!(split_substitution("no separator"), None);
    }

    #[test]
    fn test_comment_meta_with_author_and_date() {
        let meta = parse_comment_meta("jane (2024-03-01 14:30): looks wrong");
        assert_eq!(meta.author.as_deref(), Some("jane"));
        assert_eq!(meta.date.as_deref(), Some("2024-03-01 14:30"));
        assert_eq!(meta.text, "looks wrong");
    }

    #[test]
    fn test_comment_meta_date_only_form() {
        let meta = parse_comment_meta("R. Smith (2023-12-31): fine");
        assert_eq!(meta.author.as_deref(), Some("R. Smith"));
        assert_eq!(meta.date.as_deref(), Some("2023-12-31"));
    }

    #[test]
    fn test_comment_meta_plain() {
        let meta = parse_comment_meta("just a note");
        assert!(meta.author.is_none());
        assert!(meta.date.is_none());
        assert_eq!(meta.text, "just a note");
    }

    #[test]
    fn test_id_comment() {
        let (len, id, body) = parse_id_comment("{#r1>>see above<<} rest").unwrap();
        assert_eq!(&"{#r1>>see above<<} rest"[..len], "{#r1>>see above<<}");
        assert_eq!(id, "r1");
        assert_eq!(body, "see above");
    }

    #[test]
    fn test_range_mark() {
        let (len, id) = parse_range_mark("{##r1} tail").unwrap();
        assert_eq!(len, 6);
        assert_eq!(id, "r1");
        assert!(parse_range_mark("{#r1>>x<<}").is_none());
        assert!(parse_id_comment("{##r1}").is_none());
    }
}
