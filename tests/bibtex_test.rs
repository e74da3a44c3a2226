//!
//! BibTeX round-trip properties: parse/serialize stability and the
//! double-brace stripping rule.

use mdocx_lib::{BibEntry, BibStore, parse_bibtex, serialize_bibtex};
use proptest::prelude::*;

#[test]
fn test_double_brace_concrete_scenario() {
    let (store, warnings) = parse_bibtex("@article{k, title = {{My Title}}}");
    assert!(warnings.is_empty());
    assert_eq!(store.lookup("k").unwrap().field("title"), Some("My Title"));

    let text = serialize_bibtex(&store);
    assert!(text.contains("title = {My Title}"));
}

#[test]
fn test_store_round_trip_with_zotero_fields() {
    let mut entry = BibEntry::new("article", "smith2020");
    entry.set_field("author", "Smith, John and Doe, Jane");
    entry.set_field("title", "The {RNA} Paradox");
    entry.set_field("year", "2020");
    entry.set_field("zotero-key", "ABCD1234");
    entry.set_field("zotero-uri", "http://zotero.org/users/1/items/ABCD1234");
    let mut store = BibStore::new();
    store.insert(entry);

    let (reparsed, warnings) = parse_bibtex(&serialize_bibtex(&store));
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(store, reparsed);
}

/// Value strings whose braces are balanced and that start with a regular
/// character, per the double-brace property's precondition.
fn balanced_value() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9 .,:-]{0,30}(\\{[A-Za-z0-9 ]{1,8}\\}[A-Za-z0-9 ]{0,10})?")
        .expect("valid regex")
}

proptest! {
    #[test]
    fn prop_double_brace_stripping(value in balanced_value()) {
        let text = format!("@article{{k, title = {{{{{value}}}}}}}");
        let (store, _) = parse_bibtex(&text);
        prop_assert_eq!(store.lookup("k").unwrap().field("title"), Some(value.as_str()));
    }

    #[test]
    fn prop_parse_serialize_fixpoint(
        author in "[A-Z][a-z]{2,10}, [A-Z][a-z]{2,10}",
        title in "[A-Za-z][A-Za-z0-9 ]{0,40}",
        year in 1800u32..2100,
    ) {
        let mut entry = BibEntry::new("article", "key1");
        entry.set_field("author", &author);
        entry.set_field("title", title.trim());
        entry.set_field("year", year.to_string());
        let mut store = BibStore::new();
        store.insert(entry);

        let (reparsed, warnings) = parse_bibtex(&serialize_bibtex(&store));
        prop_assert!(warnings.is_empty());
        prop_assert_eq!(store, reparsed);
    }
}
