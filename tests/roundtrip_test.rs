//!
//! End-to-end round-trip tests: Markdown -> DOCX -> Markdown must reach its
//! fixpoint after one round-trip, and domain constructs must survive it.

use mdocx_lib::{ExportOptions, ImportOptions, convert_docx, convert_md_to_docx};
use pretty_assertions::assert_eq;

fn round_trip(md: &str) -> String {
    let export = convert_md_to_docx(md, None, &ExportOptions::default()).expect("export succeeds");
    let import = convert_docx(&export.docx, &ImportOptions::default()).expect("import succeeds");
    import.markdown
}

/// Run two round-trips and assert the fixpoint; returns the stable form.
fn assert_fixpoint(md: &str) -> String {
    let m1 = round_trip(md);
    let m2 = round_trip(&m1);
    assert_eq!(m1, m2, "fixpoint not reached for:\n{md}");
    m1
}

#[test]
fn test_plain_paragraph_is_identity() {
    assert_eq!(round_trip("Just a plain paragraph.\n"), "Just a plain paragraph.\n");
}

#[test]
fn test_headings() {
    let m1 = assert_fixpoint("# One\n\n## Two\n\n### Three\n\nBody.\n");
    assert!(m1.contains("# One"));
    assert!(m1.contains("## Two"));
    assert!(m1.contains("### Three"));
}

#[test]
fn test_inline_formatting() {
    let m1 = assert_fixpoint("Some **bold**, *italic*, ~~struck~~, and `code` text.\n");
    assert!(m1.contains("**bold**"));
    assert!(m1.contains("*italic*"));
    assert!(m1.contains("~~struck~~"));
    assert!(m1.contains("`code`"));
}

#[test]
fn test_superscript_subscript_underline() {
    let m1 = assert_fixpoint("E=mc^2^ and H~2~O and <u>under</u>.\n");
    assert!(m1.contains("^2^"));
    assert!(m1.contains("~2~"));
    assert!(m1.contains("<u>under</u>"));
}

#[test]
fn test_critic_markup_survives() {
    let m1 = assert_fixpoint("{++added++} then {--removed--} then {~~old~>new~~}.\n");
    assert!(m1.contains("{++added++}"));
    assert!(m1.contains("{--removed--}"));
    assert!(m1.contains("{~~old~>new~~}"));
}

#[test]
fn test_anchored_comment_with_whitespace() {
    // One intervening space between anchor and comment is preserved.
    let m1 = assert_fixpoint("{==text==} {>>comment<<}\n");
    assert_eq!(m1, "{==text==} {>>comment<<}\n");
}

#[test]
fn test_comment_author_date_prefix() {
    let m1 = assert_fixpoint("{>>jane (2024-03-01 14:30): check this<<}\n");
    assert_eq!(m1, "{>>jane (2024-03-01 14:30): check this<<}\n");
}

#[test]
fn test_bare_highlight_round_trips_as_is() {
    assert_eq!(assert_fixpoint("{==highlighted==}\n"), "{==highlighted==}\n");
}

#[test]
fn test_format_highlights() {
    let m1 = assert_fixpoint("==note== and ==alert=={red}\n");
    assert!(m1.contains("==note=="));
    assert!(m1.contains("==alert=={red}"));
}

#[test]
fn test_html_comment_position_preserved() {
    let m1 = assert_fixpoint("text <!-- hidden --> more\n");
    assert_eq!(m1, "text <!-- hidden --> more\n");
}

#[test]
fn test_block_html_comment() {
    let m1 = assert_fixpoint("before\n\n<!-- a block note -->\n\nafter\n");
    assert!(m1.contains("<!-- a block note -->"));
}

#[test]
fn test_inline_math() {
    let m1 = assert_fixpoint("the value $x^2$ grows\n");
    assert!(m1.contains("$x^2$"));
}

#[test]
fn test_math_block() {
    let m1 = assert_fixpoint("$$\n\\frac{1}{2}\n$$\n");
    assert!(m1.contains("\\frac{1}{2}"));
}

#[test]
fn test_math_comment_preserved_verbatim() {
    let m1 = assert_fixpoint("$x^2 % superscript$\n");
    // The comment survives with its single leading space.
    assert!(m1.contains("x^2 % superscript"), "carrier lost in: {m1}");
}

#[test]
fn test_critic_inside_code_is_inert() {
    let m1 = assert_fixpoint("`{++added++}`\n");
    assert_eq!(m1, "`{++added++}`\n");
}

#[test]
fn test_lists() {
    let m1 = assert_fixpoint("- one\n- two\n- three\n");
    assert_eq!(m1, "- one\n- two\n- three\n");

    let m1 = assert_fixpoint("1. first\n2. second\n");
    assert_eq!(m1, "1. first\n2. second\n");
}

#[test]
fn test_nested_list() {
    let m1 = assert_fixpoint("- outer\n    - inner\n- outer again\n");
    assert!(m1.contains("- outer"));
    assert!(m1.contains("    - inner"));
}

#[test]
fn test_blockquote_and_callout() {
    let m1 = assert_fixpoint("> quoted text\n");
    assert!(m1.contains("> quoted text"));

    let m1 = assert_fixpoint("> [!NOTE]\n> something worth knowing\n");
    assert!(m1.contains("> [!NOTE]"));
    assert!(m1.contains("> something worth knowing"));
}

#[test]
fn test_code_block() {
    let m1 = assert_fixpoint("```\nlet x = 1;\nlet y = 2;\n```\n");
    assert!(m1.contains("let x = 1;\nlet y = 2;"));
}

#[test]
fn test_table() {
    let m1 = assert_fixpoint("| a | b |\n| --- | ---: |\n| 1 | 2 |\n");
    assert!(m1.contains("| a | b |"));
    assert!(m1.contains("---:"));
    assert!(m1.contains("| 1 | 2 |"));
}

#[test]
fn test_horizontal_rule() {
    let m1 = assert_fixpoint("before\n\n---\n\nafter\n");
    assert!(m1.contains("---"));
}

#[test]
fn test_links() {
    let m1 = assert_fixpoint("see [the site](https://example.com) and <https://plain.example>\n");
    assert!(m1.contains("[the site](https://example.com)"));
    assert!(m1.contains("<https://plain.example>"));
}

#[test]
fn test_frontmatter_title() {
    let m1 = assert_fixpoint("---\ntitle: My Paper\n---\n\nbody text\n");
    assert!(m1.starts_with("---\ntitle: My Paper\n---\n"));
    assert!(m1.contains("body text"));
}

#[test]
fn test_multi_paragraph_comment_range() {
    let md = "{==start==}{##r1} tail\n\nend {##r1} {#r1>>the body<<}\n";
    let m1 = round_trip(md);
    let m2 = round_trip(&m1);
    assert_eq!(m1, m2, "fixpoint not reached");
    assert!(m1.contains("{##c"), "range markers missing: {m1}");
    assert!(m1.contains(">>the body<<"), "comment body missing: {m1}");
}

#[test]
fn test_hard_break() {
    let m1 = assert_fixpoint("line one\\\nline two\n");
    assert!(m1.contains("\\\n"));
}

#[test]
fn test_kitchen_sink_fixpoint() {
    let md = "\
---
title: Sink
---

# Heading

Some **bold** and *italic* with `code` and $x^2$ and ==mark==.

{++ins++} {--del--} {~~a~>b~~} {==anchor==} {>>note<<}

- item one
- item two

> quoted

```
code block
```

| h1 | h2 |
| --- | --- |
| a | b |

final <!-- carried --> paragraph
";
    assert_fixpoint(md);
}
