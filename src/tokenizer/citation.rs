//!
//! Pandoc citation parsing: `[@key]`, `[@key, p. 20]`, `[@a; @b]`, `[-@key]`.

/// One item of a (possibly grouped) citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationItem {
    pub key: String,
    /// Free-form locator, e.g. `p. 20` or `iii`.
    pub locator: Option<String>,
    pub suppress_author: bool,
}

/// Try to parse a bracketed citation starting at `[`. Returns the consumed
/// length and the parsed items, or None when the bracket is not a citation
/// (no `@` before the closing bracket, or it looks like a link).
pub fn try_parse(text: &str) -> Option<(usize, Vec<CitationItem>)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }

    // Find the closing bracket, tracking nesting and escapes.
    let mut depth = 1usize;
    let mut pos = 1;
    let mut has_marker = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            b'@' => has_marker = true,
            _ => {}
        }
        pos += 1;
    }
    if depth != 0 || !has_marker {
        return None;
    }
    // `[text](url)` is a link, not a citation.
    if bytes.get(pos + 1) == Some(&b'(') {
        return None;
    }

    let content = &text[1..pos];
    let items = parse_items(content)?;
    if items.is_empty() {
        return None;
    }
    Some((pos + 1, items))
}

/// Parse the semicolon-separated item list inside the brackets. Returns None
/// when any segment fails to parse as a citation item.
fn parse_items(content: &str) -> Option<Vec<CitationItem>> {
    let mut items = Vec::new();
    for segment in content.split(';') {
        items.push(parse_item(segment.trim())?);
    }
    Some(items)
}

/// Parse a single `-@key, locator` segment.
fn parse_item(segment: &str) -> Option<CitationItem> {
    let (suppress_author, rest) = match segment.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, segment),
    };
    let rest = rest.strip_prefix('@')?;

    let key_len = citation_key_len(rest)?;
    let key = rest[..key_len].to_string();
    let tail = rest[key_len..].trim_start();

    let locator = match tail.strip_prefix(',') {
        Some(loc) => {
            let loc = loc.trim();
            (!loc.is_empty()).then(|| loc.to_string())
        }
        None if tail.is_empty() => None,
        // Trailing junk after the key that is not a locator: not a citation.
        None => return None,
    };

    Some(CitationItem {
        key,
        locator,
        suppress_author,
    })
}

/// Length of a citation key following Pandoc's rules: starts with an
/// alphanumeric or `_`; may contain single internal punctuation from the
/// Pandoc set; double punctuation or trailing punctuation terminates it.
pub fn citation_key_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let first = *bytes.first()? as char;
    if !first.is_alphanumeric() && first != '_' {
        return None;
    }

    let mut pos = 1;
    let mut prev_was_punct = false;
    while pos < bytes.len() {
        let ch = bytes[pos] as char;
        if ch.is_alphanumeric() || ch == '_' {
            prev_was_punct = false;
            pos += 1;
        } else if is_internal_punctuation(ch) {
            if prev_was_punct {
                pos -= 1;
                break;
            }
            prev_was_punct = true;
            pos += 1;
        } else {
            break;
        }
    }

    while pos > 0 && is_internal_punctuation(bytes[pos - 1] as char) {
        pos -= 1;
    }
    (pos > 0).then_some(pos)
}

fn is_internal_punctuation(ch: char) -> bool {
    matches!(
        ch,
        ':' | '.' | '#' | '$' | '%' | '&' | '-' | '+' | '?' | '<' | '>' | '~' | '/'
    )
}

/// Render items back to Pandoc form: `[@a, p. 20; @b]`.
pub fn render(items: &[CitationItem]) -> String {
    let mut out = String::from("[");
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push_str("; ");
        }
        if item.suppress_author {
            out.push('-');
        }
        out.push('@');
        out.push_str(&item.key);
        if let Some(locator) = &item.locator {
            out.push_str(", ");
            out.push_str(locator);
        }
    }
    out.push(']');
    out
}
