//!
//! Citation lowering: Pandoc citation items plus BibTeX entries become
//! Zotero `ADDIN ZOTERO_ITEM CSL_CITATION` field instructions with a
//! CSL-JSON payload, or plain formatted text when no Zotero linkage exists.

use serde_json::{Value, json};

use crate::bibtex::BibEntry;
use crate::tokenizer::citation::CitationItem;

/// Split a Pandoc locator (`p. 20`, `ch. 2`, `iii`) into a CSL label and
/// value.
pub fn split_locator(locator: &str) -> (&'static str, String) {
    let trimmed = locator.trim();
    for (prefix, label) in [
        ("pp.", "page"),
        ("p.", "page"),
        ("chap.", "chapter"),
        ("ch.", "chapter"),
        ("sec.", "section"),
        ("§", "section"),
        ("vol.", "volume"),
    ] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (label, rest.trim().to_string());
        }
    }
    ("page", trimmed.to_string())
}

/// Inverse of [`split_locator`], producing the Pandoc rendering.
pub fn join_locator(label: &str, value: &str) -> String {
    let prefix = match label {
        "chapter" => "ch.",
        "section" => "sec.",
        "volume" => "vol.",
        _ => "p.",
    };
    format!("{prefix} {value}")
}

/// Parse a BibTeX author field into CSL name objects.
pub fn parse_authors(field: &str) -> Vec<Value> {
    field
        .split(" and ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| match name.split_once(',') {
            Some((family, given)) => json!({
                "family": family.trim(),
                "given": given.trim(),
            }),
            None => match name.rsplit_once(' ') {
                Some((given, family)) => json!({
                    "family": family.trim(),
                    "given": given.trim(),
                }),
                None => json!({ "family": name }),
            },
        })
        .collect()
}

/// First author's family name, for formatted-citation placeholders.
pub fn first_author_family(entry: &BibEntry) -> Option<String> {
    let field = entry.field("author")?;
    let first = field.split(" and ").next()?.trim();
    let family = match first.split_once(',') {
        Some((family, _)) => family.trim(),
        None => first.rsplit(' ').next().unwrap_or(first),
    };
    (!family.is_empty()).then(|| family.to_string())
}

/// Map a BibTeX entry type to its CSL equivalent.
pub fn csl_type(entry_type: &str) -> &'static str {
    match entry_type {
        "article" => "article-journal",
        "book" => "book",
        "incollection" | "inbook" => "chapter",
        "inproceedings" | "conference" => "paper-conference",
        "phdthesis" | "mastersthesis" => "thesis",
        "techreport" => "report",
        "unpublished" => "manuscript",
        "proceedings" => "book",
        _ => "document",
    }
}

/// Map a CSL item type back to a BibTeX entry type.
pub fn bibtex_type(csl: &str) -> &'static str {
    match csl {
        "article-journal" | "article-magazine" | "article-newspaper" => "article",
        "book" => "book",
        "chapter" => "incollection",
        "paper-conference" => "inproceedings",
        "thesis" => "phdthesis",
        "report" => "techreport",
        "manuscript" => "unpublished",
        _ => "misc",
    }
}

/// Build the CSL-JSON `itemData` for one entry.
pub fn item_data(entry: &BibEntry, numeric_id: usize) -> Value {
    let mut item = serde_json::Map::new();
    item.insert("id".to_string(), json!(numeric_id));
    item.insert("type".to_string(), json!(csl_type(&entry.entry_type)));
    if let Some(title) = entry.field("title") {
        item.insert("title".to_string(), json!(title));
    }
    if let Some(journal) = entry.field("journal").or_else(|| entry.field("booktitle")) {
        item.insert("container-title".to_string(), json!(journal));
    }
    if let Some(authors) = entry.field("author") {
        item.insert("author".to_string(), Value::Array(parse_authors(authors)));
    }
    if let Some(year) = entry.field("year") {
        item.insert("issued".to_string(), json!({ "date-parts": [[year]] }));
    }
    if let Some(doi) = entry.field("doi") {
        item.insert("DOI".to_string(), json!(doi));
    }
    if let Some(volume) = entry.field("volume") {
        item.insert("volume".to_string(), json!(volume));
    }
    if let Some(pages) = entry.field("pages") {
        item.insert("page".to_string(), json!(pages));
    }
    Value::Object(item)
}

/// The formatted-text placeholder shown for a citation while the field is
/// not refreshed, e.g. `(Smith 2020, p. 20; Jones 2019)`.
pub fn formatted_citation(items: &[(&CitationItem, &BibEntry)]) -> String {
    let mut parts = Vec::new();
    for (item, entry) in items {
        let mut part = String::new();
        if !item.suppress_author {
            if let Some(family) = first_author_family(entry) {
                part.push_str(&family);
            } else {
                part.push_str(&entry.key);
            }
        }
        if let Some(year) = entry.field("year") {
            if !part.is_empty() {
                part.push(' ');
            }
            part.push_str(year);
        }
        if let Some(locator) = &item.locator {
            if !part.is_empty() {
                part.push_str(", ");
            }
            part.push_str(locator);
        }
        if part.is_empty() {
            part.push_str(&entry.key);
        }
        parts.push(part);
    }
    format!("({})", parts.join("; "))
}

/// Build the full field instruction text for a citation group.
pub fn field_instruction(items: &[(&CitationItem, &BibEntry)]) -> String {
    let citation_items: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(idx, (item, entry))| {
            let id = idx + 1;
            let mut obj = serde_json::Map::new();
            obj.insert("id".to_string(), json!(id));
            if let Some(uri) = entry.field("zotero-uri") {
                obj.insert("uris".to_string(), json!([uri]));
                obj.insert("uri".to_string(), json!([uri]));
            }
            obj.insert("itemData".to_string(), item_data(entry, id));
            if let Some(locator) = &item.locator {
                let (label, value) = split_locator(locator);
                obj.insert("locator".to_string(), json!(value));
                obj.insert("label".to_string(), json!(label));
            }
            if item.suppress_author {
                obj.insert("suppress-author".to_string(), json!(true));
            }
            Value::Object(obj)
        })
        .collect();

    let formatted = formatted_citation(items);
    let keys: Vec<&str> = items.iter().map(|(item, _)| item.key.as_str()).collect();
    let payload = json!({
        "citationID": keys.join("+"),
        "properties": {
            "formattedCitation": formatted,
            "plainCitation": formatted,
        },
        "citationItems": citation_items,
        "schema": "https://github.com/citation-style-language/schema/raw/master/csl-citation.json",
    });

    format!(" ADDIN ZOTERO_ITEM CSL_CITATION {payload}")
}
