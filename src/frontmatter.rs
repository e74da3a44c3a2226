//!
//! Frontmatter parsing for Manuscript Markdown. The block is YAML-ish, not
//! YAML: repeated keys are the canonical spelling for multi-value fields
//! (`title:` in particular), so this is a hand-rolled line scanner rather
//! than a YAML deserializer.

use std::sync::LazyLock;

use regex::Regex;

static DELIMITER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^---\s*$").unwrap());
static FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):\s*(.*)$").unwrap());

/// A font style combination. `Normal` clears every toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl FontStyle {
    pub const NORMAL: FontStyle = FontStyle {
        bold: false,
        italic: false,
        underline: false,
    };

    /// Parse `bold`, `italic`, `underline`, `normal`, or a hyphenated
    /// combination in any order. Returns None for unrecognized components.
    pub fn parse(value: &str) -> Option<FontStyle> {
        let mut style = FontStyle::default();
        let mut saw_normal = false;
        for part in value.split('-') {
            match part.trim() {
                "bold" => style.bold = true,
                "italic" => style.italic = true,
                "underline" => style.underline = true,
                "normal" => saw_normal = true,
                _ => return None,
            }
        }
        if saw_normal {
            return Some(FontStyle::NORMAL);
        }
        Some(style)
    }

    /// Canonical spelling, components ordered bold-italic-underline.
    pub fn canonical(&self) -> String {
        let mut parts = Vec::new();
        if self.bold {
            parts.push("bold");
        }
        if self.italic {
            parts.push("italic");
        }
        if self.underline {
            parts.push("underline");
        }
        if parts.is_empty() {
            return "normal".to_string();
        }
        parts.join("-")
    }
}

/// Parsed frontmatter. Sizes are in points here; the DOCX writer converts to
/// half-points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub title: Vec<String>,
    pub csl: Option<String>,
    pub bibliography: Vec<String>,
    pub font: Option<String>,
    pub code_font: Option<String>,
    pub font_size: Option<f64>,
    pub code_font_size: Option<f64>,
    pub header_font: Option<String>,
    /// Per-heading-level size overrides; shorter arrays inherit the last
    /// element for deeper levels.
    pub header_font_size: Vec<f64>,
    pub header_font_style: Vec<FontStyle>,
    pub title_font: Option<String>,
    pub title_font_size: Option<f64>,
    pub title_font_style: Option<FontStyle>,
    pub timezone: Option<String>,
    /// Unrecognized keys, preserved in order without comment.
    pub extra: Vec<(String, String)>,
}

impl Frontmatter {
    pub fn is_empty(&self) -> bool {
        *self == Frontmatter::default()
    }
}

/// Split a multi-value field: `[a, b, c]` or bare `a, b, c`.
fn split_values(value: &str) -> Vec<String> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(|part| unquote(part.trim()).to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 {
        if (trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\''))
        {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

fn parse_size(key: &str, value: &str, warnings: &mut Vec<String>) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(size) if size.is_finite() && size > 0.0 => Some(size),
        _ => {
            warnings.push(format!("Frontmatter `{key}` must be a positive number, ignoring `{value}`"));
            None
        }
    }
}

fn parse_style(key: &str, value: &str, warnings: &mut Vec<String>) -> Option<FontStyle> {
    match FontStyle::parse(value.trim()) {
        Some(style) => Some(style),
        None => {
            warnings.push(format!("Frontmatter `{key}` has unrecognized style `{value}`, ignoring"));
            None
        }
    }
}

/// Parse an optional frontmatter block at the start of the document. Returns
/// the parsed fields, the byte offset where the body begins, and warnings.
pub fn parse(text: &str) -> (Frontmatter, usize, Vec<String>) {
    let mut fm = Frontmatter::default();
    let mut warnings = Vec::new();

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (fm, 0, warnings);
    };
    if !DELIMITER.is_match(first.trim_end_matches(['\n', '\r'])) {
        return (fm, 0, warnings);
    }

    let mut offset = first.len();
    let mut closed = false;
    for line in lines {
        let stripped = line.trim_end_matches(['\n', '\r']);
        offset += line.len();
        if DELIMITER.is_match(stripped) {
            closed = true;
            break;
        }

        let Some(caps) = FIELD.captures(stripped) else {
            if !stripped.trim().is_empty() {
                warnings.push(format!("Unparseable frontmatter line `{stripped}`"));
            }
            continue;
        };
        let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default().trim();
        if value.is_empty() {
            continue;
        }

        match key {
            "title" => fm.title.extend(split_values(value)),
            "csl" => fm.csl = Some(unquote(value).to_string()),
            "bibliography" => fm.bibliography.extend(split_values(value)),
            "font" => fm.font = Some(unquote(value).to_string()),
            "code-font" => fm.code_font = Some(unquote(value).to_string()),
            "font-size" => fm.font_size = parse_size(key, value, &mut warnings),
            "code-font-size" => fm.code_font_size = parse_size(key, value, &mut warnings),
            "header-font" => fm.header_font = Some(unquote(value).to_string()),
            "header-font-size" => {
                for item in split_values(value) {
                    if let Some(size) = parse_size(key, &item, &mut warnings) {
                        fm.header_font_size.push(size);
                    }
                }
            }
            "header-font-style" => {
                for item in split_values(value) {
                    if let Some(style) = parse_style(key, &item, &mut warnings) {
                        fm.header_font_style.push(style);
                    }
                }
            }
            "title-font" => fm.title_font = Some(unquote(value).to_string()),
            "title-font-size" => fm.title_font_size = parse_size(key, value, &mut warnings),
            "title-font-style" => fm.title_font_style = parse_style(key, value, &mut warnings),
            "timezone" => fm.timezone = Some(unquote(value).to_string()),
            _ => fm.extra.push((key.to_string(), value.to_string())),
        }
    }

    if !closed {
        // Not frontmatter after all; treat the whole document as body.
        return (Frontmatter::default(), 0, Vec::new());
    }

    (fm, offset, warnings)
}

/// Render frontmatter back to its canonical text form (repeated `title:`
/// lines, one field per line). Empty frontmatter renders to nothing.
pub fn render(fm: &Frontmatter) -> String {
    if fm.is_empty() {
        return String::new();
    }
    let mut out = String::from("---\n");
    for title in &fm.title {
        out.push_str(&format!("title: {title}\n"));
    }
    if let Some(csl) = &fm.csl {
        out.push_str(&format!("csl: {csl}\n"));
    }
    for bib in &fm.bibliography {
        out.push_str(&format!("bibliography: {bib}\n"));
    }
    if let Some(font) = &fm.font {
        out.push_str(&format!("font: {font}\n"));
    }
    if let Some(font) = &fm.code_font {
        out.push_str(&format!("code-font: {font}\n"));
    }
    if let Some(size) = fm.font_size {
        out.push_str(&format!("font-size: {size}\n"));
    }
    if let Some(size) = fm.code_font_size {
        out.push_str(&format!("code-font-size: {size}\n"));
    }
    if let Some(font) = &fm.header_font {
        out.push_str(&format!("header-font: {font}\n"));
    }
    if !fm.header_font_size.is_empty() {
        let sizes: Vec<String> = fm.header_font_size.iter().map(f64::to_string).collect();
        out.push_str(&format!("header-font-size: [{}]\n", sizes.join(", ")));
    }
    if !fm.header_font_style.is_empty() {
        let styles: Vec<String> = fm.header_font_style.iter().map(FontStyle::canonical).collect();
        out.push_str(&format!("header-font-style: [{}]\n", styles.join(", ")));
    }
    if let Some(font) = &fm.title_font {
        out.push_str(&format!("title-font: {font}\n"));
    }
    if let Some(size) = fm.title_font_size {
        out.push_str(&format!("title-font-size: {size}\n"));
    }
    if let Some(style) = &fm.title_font_style {
        out.push_str(&format!("title-font-style: {}\n", style.canonical()));
    }
    if let Some(tz) = &fm.timezone {
        out.push_str(&format!("timezone: {tz}\n"));
    }
    for (key, value) in &fm.extra {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str("---\n");
    out
}
