//!
//! BibTeX parsing and serialization. Entries keep their fields in insertion
//! order so that a parse/serialize round-trip is stable, and the two Zotero
//! carrier fields (`zotero-key`, `zotero-uri`) are supported alongside the
//! standard ones.

pub mod latex;

use indexmap::IndexMap;

/// Fields that are emitted after the standard ones when serializing.
const CUSTOM_FIELDS: [&str; 2] = ["zotero-key", "zotero-uri"];

/// Entry types we recognize without a warning.
const KNOWN_TYPES: [&str; 14] = [
    "article",
    "book",
    "booklet",
    "conference",
    "inbook",
    "incollection",
    "inproceedings",
    "manual",
    "mastersthesis",
    "misc",
    "phdthesis",
    "proceedings",
    "techreport",
    "unpublished",
];

/// Block types that are skipped without comment.
const IGNORED_BLOCK_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// A single BibTeX entry: `@type{key, field = value, ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    /// Field name -> unescaped value, in source order.
    pub fields: IndexMap<String, String>,
}

impl BibEntry {
    pub fn new(entry_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            key: key.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Whether this entry carries the Zotero linkage needed to rebuild a
    /// `CSL_CITATION` field code.
    pub fn has_zotero_link(&self) -> bool {
        self.field("zotero-key").is_some() && self.field("zotero-uri").is_some()
    }
}

/// An insertion-ordered collection of entries keyed by citation key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibStore {
    entries: IndexMap<String, BibEntry>,
}

impl BibStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    /// Insert an entry. Returns false (and keeps the existing entry) when the
    /// key is already present.
    pub fn insert(&mut self, entry: BibEntry) -> bool {
        if self.entries.contains_key(&entry.key) {
            return false;
        }
        self.entries.insert(entry.key.clone(), entry);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse BibTeX text into a store. Malformed entries are dropped with a
/// warning; parsing always continues with the next `@`.
pub fn parse(text: &str) -> (BibStore, Vec<String>) {
    let mut store = BibStore::new();
    let mut warnings = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '@' {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && chars[j].is_ascii_alphabetic() {
            j += 1;
        }
        let entry_type: String = chars[i + 1..j].iter().collect::<String>().to_ascii_lowercase();
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }

        if entry_type.is_empty() || j >= chars.len() || chars[j] != '{' {
            i += 1;
            continue;
        }

        if IGNORED_BLOCK_TYPES.contains(&entry_type.as_str()) {
            i = skip_block(&chars, j);
            continue;
        }

        match parse_entry_body(&chars, j + 1, &entry_type, &mut warnings) {
            Some((entry, next)) => {
                if !KNOWN_TYPES.contains(&entry.entry_type.as_str()) {
                    warnings.push(format!(
                        "Unknown BibTeX entry type `@{}` for key `{}`",
                        entry.entry_type, entry.key
                    ));
                }
                let key = entry.key.clone();
                if !store.insert(entry) {
                    warnings.push(format!("Duplicate BibTeX key `{key}`, keeping the first entry"));
                }
                i = next;
            }
            None => {
                // The entry never closed; everything to EOF belonged to it.
                i = chars.len();
            }
        }
    }

    (store, warnings)
}

/// Skip a balanced `{...}` block starting at the opening brace; returns the
/// index just past the closing brace (or EOF).
fn skip_block(chars: &[char], open: usize) -> usize {
    let mut depth = 0usize;
    let mut k = open;
    while k < chars.len() {
        match chars[k] {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return k + 1;
                }
            }
            _ => {}
        }
        k += 1;
    }
    chars.len()
}

/// Parse the `key, field = value, ...}` body. Returns the entry plus the
/// index just past the closing brace, or None when the brace never closes
/// (the entry is dropped with a warning).
fn parse_entry_body(
    chars: &[char],
    start: usize,
    entry_type: &str,
    warnings: &mut Vec<String>,
) -> Option<(BibEntry, usize)> {
    let mut k = start;

    // Citation key runs up to the first comma or closing brace.
    let key_start = k;
    while k < chars.len() && chars[k] != ',' && chars[k] != '}' {
        k += 1;
    }
    if k >= chars.len() {
        warnings.push(format!("BibTeX entry `@{entry_type}` is missing its closing brace, dropped"));
        return None;
    }
    let key: String = chars[key_start..k].iter().collect::<String>().trim().to_string();
    if key.is_empty() {
        warnings.push(format!("BibTeX entry `@{entry_type}` has an empty citation key"));
    }

    let mut entry = BibEntry::new(entry_type, key);

    loop {
        // Between fields: commas and whitespace.
        while k < chars.len() && (chars[k] == ',' || chars[k].is_whitespace()) {
            k += 1;
        }
        if k >= chars.len() {
            warnings.push(format!(
                "BibTeX entry `{}` is missing its closing brace, dropped",
                entry.key
            ));
            return None;
        }
        if chars[k] == '}' {
            return Some((entry, k + 1));
        }

        // Field name up to `=`.
        let name_start = k;
        while k < chars.len() && chars[k] != '=' && chars[k] != '}' && chars[k] != ',' {
            k += 1;
        }
        if k >= chars.len() || chars[k] != '=' {
            let fragment: String = chars[name_start..k.min(chars.len())].iter().collect();
            warnings.push(format!(
                "Malformed BibTeX field `{}` in entry `{}`, skipped",
                fragment.trim(),
                entry.key
            ));
            continue;
        }
        let name: String = chars[name_start..k]
            .iter()
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        k += 1;
        while k < chars.len() && chars[k].is_whitespace() {
            k += 1;
        }
        if k >= chars.len() {
            warnings.push(format!(
                "BibTeX entry `{}` is missing its closing brace, dropped",
                entry.key
            ));
            return None;
        }

        let (raw, next) = match chars[k] {
            '{' => match scan_braced(chars, k) {
                Some((value, next)) => (value, next),
                None => {
                    warnings.push(format!(
                        "BibTeX entry `{}` is missing its closing brace, dropped",
                        entry.key
                    ));
                    return None;
                }
            },
            '"' => match scan_quoted(chars, k) {
                Some((value, next)) => (value, next),
                None => {
                    warnings.push(format!(
                        "Unterminated quoted value for field `{}` in entry `{}`, dropped",
                        name, entry.key
                    ));
                    return None;
                }
            },
            _ => {
                let bare_start = k;
                while k < chars.len() && chars[k] != ',' && chars[k] != '}' {
                    k += 1;
                }
                let value: String = chars[bare_start..k].iter().collect::<String>().trim().to_string();
                (value, k)
            }
        };
        k = next;

        let value = latex::unescape(&raw);
        if entry.fields.contains_key(&name) {
            warnings.push(format!(
                "Duplicate field `{}` in entry `{}`, keeping the first value",
                name, entry.key
            ));
        } else {
            entry.fields.insert(name, value);
        }
    }
}

/// Scan a `{...}`-delimited value. Returns the content with the outer braces
/// stripped (and a redundant second pair stripped per the double-brace rule)
/// plus the index past the closing brace.
fn scan_braced(chars: &[char], open: usize) -> Option<(String, usize)> {
    let mut depth = 0usize;
    let mut k = open;
    let mut escaped = false;
    while k < chars.len() {
        let ch = chars[k];
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '{' {
            depth += 1;
        } else if ch == '}' {
            depth -= 1;
            if depth == 0 {
                let inner: String = chars[open + 1..k].iter().collect();
                return Some((strip_redundant_braces(&inner), k + 1));
            }
        }
        k += 1;
    }
    None
}

/// Scan a `"..."`-delimited value; braces inside may nest and protect quotes.
fn scan_quoted(chars: &[char], open: usize) -> Option<(String, usize)> {
    let mut depth = 0usize;
    let mut k = open + 1;
    let mut escaped = false;
    while k < chars.len() {
        let ch = chars[k];
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '{' {
            depth += 1;
        } else if ch == '}' {
            depth = depth.saturating_sub(1);
        } else if ch == '"' && depth == 0 {
            let inner: String = chars[open + 1..k].iter().collect();
            return Some((inner, k + 1));
        }
        k += 1;
    }
    None
}

/// Double-brace stripping: when the whole value is a single `{...}` group
/// (the depth counter first reaches zero exactly at the last character), the
/// wrapping pair is redundant and removed. Partial groups are kept verbatim.
fn strip_redundant_braces(value: &str) -> String {
    if !value.starts_with('{') {
        return value.to_string();
    }
    let mut depth = 0i32;
    let mut escaped = false;
    for (idx, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return if idx + ch.len_utf8() == value.len() {
                        value[1..value.len() - 1].to_string()
                    } else {
                        value.to_string()
                    };
                }
            }
            _ => {}
        }
    }
    value.to_string()
}

/// Serialize a store back to BibTeX text. Values are wrapped in a single
/// outer brace pair with specials escaped; the Zotero carrier fields come
/// after the standard ones.
pub fn serialize(store: &BibStore) -> String {
    let mut out = String::new();
    for entry in store.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("@{}{{{},\n", entry.entry_type, entry.key));
        for (name, value) in entry
            .fields
            .iter()
            .filter(|(name, _)| !CUSTOM_FIELDS.contains(&name.as_str()))
            .chain(
                entry
                    .fields
                    .iter()
                    .filter(|(name, _)| CUSTOM_FIELDS.contains(&name.as_str())),
            )
        {
            out.push_str(&format!("  {} = {{{}}},\n", name, latex::escape(value)));
        }
        out.push_str("}\n");
    }
    out
}
