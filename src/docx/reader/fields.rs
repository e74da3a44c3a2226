//!
//! Zotero field-code parsing: CSL-JSON payloads become citation items plus
//! BibTeX entries. Citation keys are generated (or reused) per the requested
//! key format.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::bibtex::{BibEntry, BibStore};
use crate::config::CitationKeyFormat;
use crate::docx::writer::citations::{bibtex_type, join_locator};
use crate::tokenizer::citation::CitationItem;

/// `http://zotero.org/users/NNN/items/ABCD1234` -> `ABCD1234`
static ITEM_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/items/([A-Z0-9]{8})$").unwrap());

const TITLE_STOPWORDS: [&str; 12] = [
    "a", "an", "the", "on", "of", "in", "and", "or", "for", "to", "with", "from",
];

/// Extract the 8-character Zotero item key from a URI.
pub fn extract_item_key(uri: &str) -> Option<&str> {
    ITEM_KEY.captures(uri).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Stateful citation collector: builds the BibStore and keeps key
/// generation stable across repeated references to the same item.
pub struct CitationCollector {
    format: CitationKeyFormat,
    /// zotero item key -> generated citation key
    by_item: HashMap<String, String>,
    next_numeric: usize,
    pub store: BibStore,
    pub warnings: Vec<String>,
}

impl CitationCollector {
    pub fn new(format: CitationKeyFormat) -> Self {
        Self {
            format,
            by_item: HashMap::new(),
            next_numeric: 1,
            store: BibStore::new(),
            warnings: Vec::new(),
        }
    }

    /// Parse a `ADDIN ZOTERO_ITEM CSL_CITATION {...}` instruction into
    /// citation items, collecting bibliographic data on the way. Returns
    /// None when the payload is malformed.
    pub fn parse_instruction(&mut self, instr: &str) -> Option<Vec<CitationItem>> {
        let json_start = instr.find('{')?;
        let payload: Value = match serde_json::from_str(instr[json_start..].trim()) {
            Ok(payload) => payload,
            Err(err) => {
                self.warnings.push(format!("Malformed CSL_CITATION payload ({err}); field dropped"));
                return None;
            }
        };

        let citation_items = payload.get("citationItems")?.as_array()?;
        let mut items = Vec::new();
        for raw in citation_items {
            if let Some(item) = self.collect_item(raw) {
                items.push(item);
            }
        }
        (!items.is_empty()).then_some(items)
    }

    fn collect_item(&mut self, raw: &Value) -> Option<CitationItem> {
        let item_data = raw.get("itemData");
        let uri = raw
            .get("uris")
            .and_then(|u| u.as_array())
            .and_then(|u| u.first())
            .and_then(Value::as_str);
        let zotero_key = uri.and_then(extract_item_key);

        let key = match zotero_key.and_then(|k| self.by_item.get(k)) {
            Some(existing) => existing.clone(),
            None => {
                let key = self.generate_key(item_data);
                if let Some(zotero_key) = zotero_key {
                    self.by_item.insert(zotero_key.to_string(), key.clone());
                }
                if self.store.lookup(&key).is_none() {
                    let entry = self.build_entry(&key, item_data, zotero_key, uri);
                    self.store.insert(entry);
                }
                key
            }
        };

        let locator = raw.get("locator").and_then(Value::as_str).map(|value| {
            let label = raw.get("label").and_then(Value::as_str).unwrap_or("page");
            join_locator(label, value)
        });
        let suppress_author = raw
            .get("suppress-author")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Some(CitationItem {
            key,
            locator,
            suppress_author,
        })
    }

    fn generate_key(&mut self, item_data: Option<&Value>) -> String {
        if matches!(self.format, CitationKeyFormat::Numeric) {
            let key = format!("ref{}", self.next_numeric);
            self.next_numeric += 1;
            return key;
        }

        let family = item_data
            .and_then(|d| d.get("author"))
            .and_then(|a| a.as_array())
            .and_then(|a| a.first())
            .and_then(|a| a.get("family"))
            .and_then(Value::as_str)
            .map(sanitize_lower)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "anon".to_string());
        let year = item_data
            .and_then(|d| d.get("issued"))
            .and_then(|i| i.get("date-parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .map(date_part_to_string)
            .unwrap_or_default();

        let mut key = format!("{family}{year}");
        if matches!(self.format, CitationKeyFormat::AuthorYearTitle) {
            if let Some(word) = item_data
                .and_then(|d| d.get("title"))
                .and_then(Value::as_str)
                .and_then(significant_title_word)
            {
                key.push_str(&word);
            }
        }

        self.dedup_key(key)
    }

    fn dedup_key(&self, base: String) -> String {
        if self.store.lookup(&base).is_none() {
            return base;
        }
        for suffix in ['b', 'c', 'd', 'e', 'f', 'g'] {
            let candidate = format!("{base}{suffix}");
            if self.store.lookup(&candidate).is_none() {
                return candidate;
            }
        }
        format!("{base}x{}", self.store.len())
    }

    fn build_entry(
        &mut self,
        key: &str,
        item_data: Option<&Value>,
        zotero_key: Option<&str>,
        uri: Option<&str>,
    ) -> BibEntry {
        let csl_type = item_data
            .and_then(|d| d.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("document");
        let mut entry = BibEntry::new(bibtex_type(csl_type), key);

        if let Some(authors) = item_data.and_then(|d| d.get("author")).and_then(|a| a.as_array()) {
            let joined = authors
                .iter()
                .filter_map(|author| {
                    let family = author.get("family").and_then(Value::as_str)?;
                    Some(match author.get("given").and_then(Value::as_str) {
                        Some(given) => format!("{family}, {given}"),
                        None => family.to_string(),
                    })
                })
                .collect::<Vec<_>>()
                .join(" and ");
            if !joined.is_empty() {
                entry.set_field("author", joined);
            }
        }
        if let Some(title) = item_data.and_then(|d| d.get("title")).and_then(Value::as_str) {
            entry.set_field("title", title);
        }
        if let Some(container) = item_data
            .and_then(|d| d.get("container-title"))
            .and_then(Value::as_str)
        {
            let field = match entry.entry_type.as_str() {
                "incollection" | "inproceedings" => "booktitle",
                _ => "journal",
            };
            entry.set_field(field, container);
        }
        if let Some(year) = item_data
            .and_then(|d| d.get("issued"))
            .and_then(|i| i.get("date-parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
        {
            entry.set_field("year", date_part_to_string(year));
        }
        if let Some(volume) = item_data.and_then(|d| d.get("volume")) {
            entry.set_field("volume", json_scalar_to_string(volume));
        }
        if let Some(page) = item_data.and_then(|d| d.get("page")) {
            entry.set_field("pages", json_scalar_to_string(page));
        }
        if let Some(doi) = item_data.and_then(|d| d.get("DOI")).and_then(Value::as_str) {
            entry.set_field("doi", doi);
        }
        if let Some(zotero_key) = zotero_key {
            entry.set_field("zotero-key", zotero_key);
        }
        if let Some(uri) = uri {
            entry.set_field("zotero-uri", uri);
        }
        entry
    }
}

fn sanitize_lower(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn date_part_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First title word that is not a stopword, capitalized.
fn significant_title_word(title: &str) -> Option<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .find(|word| !TITLE_STOPWORDS.contains(&word.to_lowercase().as_str()))
        .map(|word| {
            let mut chars = word.chars();
            let first = chars.next().expect("non-empty word").to_uppercase().to_string();
            format!("{first}{}", chars.as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction() -> String {
        r#" ADDIN ZOTERO_ITEM CSL_CITATION {"citationID":"x","citationItems":[{"id":1,"uris":["http://zotero.org/users/99/items/ABCD1234"],"itemData":{"id":1,"type":"article-journal","title":"On the Climate Question","container-title":"Nature","author":[{"family":"Smith","given":"John"}],"issued":{"date-parts":[["2020"]]},"volume":"12","page":"1-10","DOI":"10.1/x"},"locator":"20","label":"page"}],"schema":"https://github.com/citation-style-language/schema/raw/master/csl-citation.json"}"#
            .to_string()
    }

    #[test]
    fn test_extract_item_key() {
        assert_eq!(
            extract_item_key("http://zotero.org/users/123/items/AB12CD34"),
            Some("AB12CD34")
        );
        assert_eq!(
            extract_item_key("http://zotero.org/groups/9/items/ZZZZ9999"),
            Some("ZZZZ9999")
        );
        assert_eq!(extract_item_key("http://zotero.org/users/123/items/short"), None);
        assert_eq!(extract_item_key("http://example.com/items/abcd1234"), None);
    }

    #[test]
    fn test_parse_instruction_author_year_title() {
        let mut collector = CitationCollector::new(CitationKeyFormat::AuthorYearTitle);
        let items = collector.parse_instruction(&instruction()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "smith2020Climate");
        assert_eq!(items[0].locator.as_deref(), Some("p. 20"));

        let entry = collector.store.lookup("smith2020Climate").unwrap();
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.field("author"), Some("Smith, John"));
        assert_eq!(entry.field("journal"), Some("Nature"));
        assert_eq!(entry.field("zotero-key"), Some("ABCD1234"));
    }

    #[test]
    fn test_author_year_format() {
        let mut collector = CitationCollector::new(CitationKeyFormat::AuthorYear);
        let items = collector.parse_instruction(&instruction()).unwrap();
        assert_eq!(items[0].key, "smith2020");
    }

    #[test]
    fn test_numeric_format() {
        let mut collector = CitationCollector::new(CitationKeyFormat::Numeric);
        let items = collector.parse_instruction(&instruction()).unwrap();
        assert_eq!(items[0].key, "ref1");
    }

    #[test]
    fn test_repeated_item_reuses_key() {
        let mut collector = CitationCollector::new(CitationKeyFormat::AuthorYearTitle);
        collector.parse_instruction(&instruction()).unwrap();
        collector.parse_instruction(&instruction()).unwrap();
        assert_eq!(collector.store.len(), 1);
    }

    #[test]
    fn test_malformed_payload_warns() {
        let mut collector = CitationCollector::new(CitationKeyFormat::AuthorYearTitle);
        let result = collector.parse_instruction(" ADDIN ZOTERO_ITEM CSL_CITATION {broken");
        assert!(result.is_none());
        assert!(!collector.warnings.is_empty());
    }

    #[test]
    fn test_stopwords_skipped_in_title_word() {
        assert_eq!(significant_title_word("On the Climate Question"), Some("Climate".to_string()));
        assert_eq!(significant_title_word("A Study"), Some("Study".to_string()));
    }
}
