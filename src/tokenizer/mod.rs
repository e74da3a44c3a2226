//!
//! The Manuscript Markdown tokenizer. Block structure comes from
//! pulldown-cmark's offset iterator; inline content is re-scanned from the
//! source with the domain grammars (CriticMarkup, citations, highlights,
//! HTML comments, math) gated by the inert-zone index.

pub mod citation;
pub mod critic;
pub mod highlight;
pub mod inline;

use pulldown_cmark::{Alignment, BlockQuoteKind, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::inert::{InertKind, InertZoneIndex};
use citation::CitationItem;
use highlight::HighlightColor;
use inline::Segment;

/// Inline formatting flags carried by a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub sup: bool,
    pub sub: bool,
    pub code: bool,
    pub highlight: Option<HighlightColor>,
}

/// Inline-level token.
#[derive(Debug, Clone, PartialEq)]
pub enum MdRun {
    Text {
        text: String,
        style: TextStyle,
    },
    HardBreak,
    Link {
        url: String,
        children: Vec<MdRun>,
    },
    InlineMath {
        latex: String,
    },
    Citation {
        items: Vec<CitationItem>,
    },
    CriticIns {
        children: Vec<MdRun>,
    },
    CriticDel {
        children: Vec<MdRun>,
    },
    CriticSub {
        old: Vec<MdRun>,
        new: Vec<MdRun>,
    },
    /// `{==text==}`, optionally tagged `{==text==}{##id}` as a range start.
    CriticHighlight {
        children: Vec<MdRun>,
        id: Option<String>,
    },
    /// `{##id}` closing a multi-paragraph range.
    CriticRangeEnd {
        id: String,
    },
    /// `{>>text<<}` or `{#id>>text<<}`. `anchored` means the comment followed
    /// a critic element with only whitespace (kept in `leading_ws`) between.
    CriticComment {
        text: String,
        author: Option<String>,
        date: Option<String>,
        id: Option<String>,
        leading_ws: String,
        anchored: bool,
    },
    HtmlComment {
        text: String,
    },
}

/// GFM callout kind on a blockquote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl CalloutKind {
    pub fn label(&self) -> &'static str {
        match self {
            CalloutKind::Note => "NOTE",
            CalloutKind::Tip => "TIP",
            CalloutKind::Important => "IMPORTANT",
            CalloutKind::Warning => "WARNING",
            CalloutKind::Caution => "CAUTION",
        }
    }

    pub fn from_label(label: &str) -> Option<CalloutKind> {
        match label {
            "NOTE" => Some(CalloutKind::Note),
            "TIP" => Some(CalloutKind::Tip),
            "IMPORTANT" => Some(CalloutKind::Important),
            "WARNING" => Some(CalloutKind::Warning),
            "CAUTION" => Some(CalloutKind::Caution),
            _ => None,
        }
    }
}

/// Table column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Block-level token.
#[derive(Debug, Clone, PartialEq)]
pub enum MdToken {
    Paragraph {
        children: Vec<MdRun>,
    },
    Heading {
        level: u8,
        children: Vec<MdRun>,
    },
    List {
        ordered: bool,
        tight: bool,
        items: Vec<Vec<MdToken>>,
    },
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
    Blockquote {
        kind: Option<CalloutKind>,
        children: Vec<MdToken>,
    },
    Table {
        alignments: Vec<CellAlignment>,
        headers: Vec<Vec<MdRun>>,
        rows: Vec<Vec<Vec<MdRun>>>,
    },
    MathBlock {
        latex: String,
    },
    HtmlTable {
        xml: String,
    },
    HorizontalRule,
    HtmlBlockComment {
        text: String,
    },
}

/// Options consulted while tokenizing.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub default_highlight: HighlightColor,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            default_highlight: HighlightColor::Yellow,
        }
    }
}

/// Byte range of inline content collected from pulldown events.
#[derive(Debug, Clone, Copy, Default)]
struct InlineCollect {
    first: Option<usize>,
    last: usize,
}

impl InlineCollect {
    fn extend(&mut self, range: &std::ops::Range<usize>) {
        if self.first.is_none() {
            self.first = Some(range.start);
        }
        self.last = self.last.max(range.end);
    }

    fn range(&self) -> Option<std::ops::Range<usize>> {
        self.first.map(|start| start..self.last.max(start))
    }
}

enum Frame {
    Blockquote {
        kind: Option<CalloutKind>,
        children: Vec<MdToken>,
    },
    List {
        ordered: bool,
        tight: bool,
        items: Vec<Vec<MdToken>>,
    },
    Item {
        children: Vec<MdToken>,
        implicit: InlineCollect,
    },
    Paragraph(InlineCollect),
    Heading {
        level: u8,
        collect: InlineCollect,
    },
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
    Table {
        alignments: Vec<CellAlignment>,
        headers: Vec<Vec<MdRun>>,
        rows: Vec<Vec<Vec<MdRun>>>,
        in_head: bool,
        row: Vec<Vec<MdRun>>,
    },
    Cell(InlineCollect),
    HtmlBlock {
        raw: String,
    },
}

struct Walker<'a> {
    source: &'a str,
    inert: InertZoneIndex,
    opts: &'a TokenizerOptions,
    stack: Vec<Frame>,
    root: Vec<MdToken>,
    warnings: Vec<String>,
}

/// Tokenize a Markdown body (frontmatter already stripped).
pub fn tokenize(body: &str, opts: &TokenizerOptions) -> (Vec<MdToken>, Vec<String>) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_GFM);

    let mut walker = Walker {
        source: body,
        inert: InertZoneIndex::scan(body),
        opts,
        stack: Vec::new(),
        root: Vec::new(),
        warnings: Vec::new(),
    };

    for (event, range) in Parser::new_ext(body, options).into_offset_iter() {
        walker.event(event, range);
    }
    walker.finish()
}

impl<'a> Walker<'a> {
    fn event(&mut self, event: Event<'a>, range: std::ops::Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag),
            Event::Rule => self.push_token(MdToken::HorizontalRule),
            Event::Html(_) => {
                let slice = &self.source[range];
                if let Some(Frame::HtmlBlock { raw }) = self.stack.last_mut() {
                    raw.push_str(slice);
                }
            }
            Event::Text(text) => {
                // Code block content comes from the event value (already
                // dedented and fence-stripped); everything else only
                // contributes its source extent.
                if let Some(Frame::CodeBlock { text: buf, .. }) = self.stack.last_mut() {
                    buf.push_str(&text);
                } else {
                    self.extend_inline(&range);
                }
            }
            // Terminal inline events only contribute their source extent; the
            // inline scanner re-reads the raw text when the block closes.
            Event::Code(_)
            | Event::InlineHtml(_)
            | Event::SoftBreak
            | Event::HardBreak
            | Event::InlineMath(_)
            | Event::DisplayMath(_)
            | Event::FootnoteReference(_)
            | Event::TaskListMarker(_) => self.extend_inline(&range),
        }
    }

    fn start(&mut self, tag: Tag<'a>, range: std::ops::Range<usize>) {
        match tag {
            Tag::Paragraph => {
                self.mark_list_loose();
                self.flush_implicit();
                self.stack.push(Frame::Paragraph(InlineCollect::default()));
            }
            Tag::Heading { level, .. } => {
                self.flush_implicit();
                self.stack.push(Frame::Heading {
                    level: level as u8,
                    collect: InlineCollect::default(),
                });
            }
            Tag::BlockQuote(kind) => {
                self.flush_implicit();
                self.stack.push(Frame::Blockquote {
                    kind: kind.map(callout_kind),
                    children: Vec::new(),
                });
            }
            Tag::List(start) => {
                self.flush_implicit();
                self.stack.push(Frame::List {
                    ordered: start.is_some(),
                    tight: true,
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.stack.push(Frame::Item {
                    children: Vec::new(),
                    implicit: InlineCollect::default(),
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_implicit();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let lang = info.split_whitespace().next().unwrap_or("").to_string();
                        (!lang.is_empty()).then_some(lang)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.stack.push(Frame::CodeBlock {
                    lang,
                    text: String::new(),
                });
            }
            Tag::Table(alignments) => {
                self.flush_implicit();
                self.stack.push(Frame::Table {
                    alignments: alignments.iter().map(cell_alignment).collect(),
                    headers: Vec::new(),
                    rows: Vec::new(),
                    in_head: false,
                    row: Vec::new(),
                });
            }
            Tag::TableHead => {
                if let Some(Frame::Table { in_head, .. }) = self.stack.last_mut() {
                    *in_head = true;
                }
            }
            Tag::TableRow => {}
            Tag::TableCell => self.stack.push(Frame::Cell(InlineCollect::default())),
            Tag::HtmlBlock => {
                self.flush_implicit();
                self.stack.push(Frame::HtmlBlock { raw: String::new() });
            }
            // Inline container tags only contribute their extent.
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. } => {
                self.extend_inline(&range)
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if let Some(Frame::Paragraph(collect)) = self.stack.pop() {
                    if let Some(token) = self.inline_block(collect) {
                        self.push_token(token);
                    }
                }
            }
            TagEnd::Heading(_) => {
                if let Some(Frame::Heading { level, collect }) = self.stack.pop() {
                    let runs = self.collect_runs(collect);
                    self.push_token(MdToken::Heading { level, children: runs });
                }
            }
            TagEnd::BlockQuote(_) => {
                if let Some(Frame::Blockquote { kind, children }) = self.stack.pop() {
                    self.push_token(MdToken::Blockquote { kind, children });
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List { ordered, tight, items }) = self.stack.pop() {
                    self.push_token(MdToken::List { ordered, tight, items });
                }
            }
            TagEnd::Item => {
                self.flush_implicit();
                if let Some(Frame::Item { children, .. }) = self.stack.pop() {
                    if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                        items.push(children);
                    }
                }
            }
            TagEnd::CodeBlock => {
                if let Some(Frame::CodeBlock { lang, text }) = self.stack.pop() {
                    // pulldown keeps the trailing newline of the last line
                    let text = text.strip_suffix('\n').map(str::to_string).unwrap_or(text);
                    self.push_token(MdToken::CodeBlock { lang, text });
                }
            }
            TagEnd::TableHead => {
                if let Some(Frame::Table { in_head, .. }) = self.stack.last_mut() {
                    *in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::TableCell => {
                if let Some(Frame::Cell(collect)) = self.stack.pop() {
                    let runs = self.collect_runs(collect);
                    if let Some(Frame::Table {
                        headers, row, in_head, ..
                    }) = self.stack.last_mut()
                    {
                        if *in_head {
                            headers.push(runs);
                        } else {
                            row.push(runs);
                        }
                    }
                }
            }
            TagEnd::Table => {
                if let Some(Frame::Table {
                    alignments,
                    headers,
                    rows,
                    ..
                }) = self.stack.pop()
                {
                    self.push_token(MdToken::Table {
                        alignments,
                        headers,
                        rows,
                    });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(Frame::HtmlBlock { raw }) = self.stack.pop() {
                    let token = self.classify_html_block(raw);
                    if let Some(token) = token {
                        self.push_token(token);
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> (Vec<MdToken>, Vec<String>) {
        self.flush_implicit();
        (self.root, self.warnings)
    }

    /// Record inline extent on the innermost inline-collecting frame. Bare
    /// inline events directly inside a list item open an implicit (tight)
    /// paragraph.
    fn extend_inline(&mut self, range: &std::ops::Range<usize>) {
        match self.stack.last_mut() {
            Some(Frame::Paragraph(collect))
            | Some(Frame::Heading { collect, .. })
            | Some(Frame::Cell(collect)) => collect.extend(range),
            Some(Frame::Item { implicit, .. }) => implicit.extend(range),
            _ => {}
        }
    }

    /// Tight-list bookkeeping: an explicit paragraph inside an item makes the
    /// nearest list loose.
    fn mark_list_loose(&mut self) {
        let mut saw_item = false;
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Item { .. } => saw_item = true,
                Frame::List { tight, .. } if saw_item => {
                    *tight = false;
                    return;
                }
                _ => {}
            }
        }
    }

    fn flush_implicit(&mut self) {
        let collect = match self.stack.last_mut() {
            Some(Frame::Item { implicit, .. }) => {
                let taken = std::mem::take(implicit);
                if taken.first.is_none() {
                    return;
                }
                taken
            }
            _ => return,
        };
        if let Some(token) = self.inline_block(collect) {
            if let Some(Frame::Item { children, .. }) = self.stack.last_mut() {
                children.push(token);
            }
        }
    }

    fn blockquote_depth(&self) -> usize {
        self.stack
            .iter()
            .filter(|frame| matches!(frame, Frame::Blockquote { .. }))
            .count()
    }

    /// Scan collected inline content into runs.
    fn collect_runs(&mut self, collect: InlineCollect) -> Vec<MdRun> {
        let Some(range) = collect.range() else {
            return Vec::new();
        };
        let (clean, map) = clean_inline_source(self.source, range, self.blockquote_depth());
        inline::scan(
            &clean,
            &map,
            &self.inert,
            self.opts.default_highlight,
            &mut self.warnings,
        )
    }

    /// Build a paragraph token from inline content, recognizing paragraphs
    /// that consist entirely of one `$$...$$` region as math blocks.
    fn inline_block(&mut self, collect: InlineCollect) -> Option<MdToken> {
        let range = collect.range()?;
        let (clean, map) = clean_inline_source(self.source, range, self.blockquote_depth());
        let trimmed = clean.trim();
        if trimmed.len() >= 4 && trimmed.starts_with("$$") && trimmed.ends_with("$$") {
            let lead = clean.len() - clean.trim_start().len();
            let doc_start = inline::doc_pos(&map, lead);
            if let Some(zone) = self.inert.zone_starting_at(doc_start) {
                if zone.kind == InertKind::MathBlock {
                    let latex = trimmed[2..trimmed.len() - 2].trim_matches('\n').to_string();
                    return Some(MdToken::MathBlock { latex });
                }
            }
        }
        let runs = inline::scan(
            &clean,
            &map,
            &self.inert,
            self.opts.default_highlight,
            &mut self.warnings,
        );
        Some(MdToken::Paragraph { children: runs })
    }

    fn classify_html_block(&mut self, raw: String) -> Option<MdToken> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(inner) = trimmed.strip_prefix("<!--").and_then(|t| t.strip_suffix("-->")) {
            return Some(MdToken::HtmlBlockComment {
                text: inner.to_string(),
            });
        }
        if trimmed.starts_with("<table") {
            return Some(MdToken::HtmlTable {
                xml: trimmed.to_string(),
            });
        }
        self.warnings
            .push("Raw HTML block passed through as plain text".to_string());
        Some(MdToken::Paragraph {
            children: vec![MdRun::Text {
                text: trimmed.to_string(),
                style: TextStyle::default(),
            }],
        })
    }

    fn push_token(&mut self, token: MdToken) {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Blockquote { children, .. } | Frame::Item { children, .. } => {
                    children.push(token);
                    return;
                }
                _ => {}
            }
        }
        self.root.push(token);
    }
}

fn callout_kind(kind: BlockQuoteKind) -> CalloutKind {
    match kind {
        BlockQuoteKind::Note => CalloutKind::Note,
        BlockQuoteKind::Tip => CalloutKind::Tip,
        BlockQuoteKind::Important => CalloutKind::Important,
        BlockQuoteKind::Warning => CalloutKind::Warning,
        BlockQuoteKind::Caution => CalloutKind::Caution,
    }
}

fn cell_alignment(alignment: &Alignment) -> CellAlignment {
    match alignment {
        Alignment::None => CellAlignment::None,
        Alignment::Left => CellAlignment::Left,
        Alignment::Center => CellAlignment::Center,
        Alignment::Right => CellAlignment::Right,
    }
}

/// Extract the raw inline source for a block. Continuation lines lose their
/// blockquote markers and leading indentation; the segment map records the
/// original document offset of every kept byte so inert-zone gating stays
/// byte-accurate.
fn clean_inline_source(
    source: &str,
    range: std::ops::Range<usize>,
    bq_depth: usize,
) -> (String, Vec<Segment>) {
    let slice = &source[range.clone()];
    let mut clean = String::with_capacity(slice.len());
    let mut map = Vec::new();
    let mut doc_pos = range.start;

    for (idx, line) in slice.split_inclusive('\n').enumerate() {
        let strip = if idx == 0 { 0 } else { continuation_prefix_len(line, bq_depth) };
        let kept = &line[strip..];
        if !kept.is_empty() {
            map.push(Segment {
                clean_start: clean.len(),
                doc_start: doc_pos + strip,
                len: kept.len(),
            });
            clean.push_str(kept);
        }
        doc_pos += line.len();
    }

    // Drop a trailing newline so soft-break handling never sees a phantom
    // final break.
    if clean.ends_with('\n') {
        clean.pop();
        if let Some(last) = map.last_mut() {
            last.len -= 1;
            if last.len == 0 {
                map.pop();
            }
        }
    }

    (clean, map)
}

/// Bytes of container prefix on a continuation line: up to `bq_depth`
/// blockquote markers, then insignificant leading whitespace.
fn continuation_prefix_len(line: &str, bq_depth: usize) -> usize {
    let bytes = line.as_bytes();
    let mut pos = 0;
    for _ in 0..bq_depth {
        let mut probe = pos;
        let mut spaces = 0;
        while probe < bytes.len() && bytes[probe] == b' ' && spaces < 3 {
            probe += 1;
            spaces += 1;
        }
        if probe < bytes.len() && bytes[probe] == b'>' {
            probe += 1;
            if probe < bytes.len() && bytes[probe] == b' ' {
                probe += 1;
            }
            pos = probe;
        } else {
            break;
        }
    }
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<MdToken> {
        tokenize(text, &TokenizerOptions::default()).0
    }

    fn para_runs(token: &MdToken) -> &[MdRun] {
        match token {
            MdToken::Paragraph { children } => children,
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_paragraph() {
        let toks = tokens("Hello world.\n");
        assert_eq!(toks.len(), 1);
        let runs = para_runs(&toks[0]);
        assert_eq!(
            runs,
            &[MdRun::Text {
                text: "Hello world.".to_string(),
                style: TextStyle::default()
            }]
        );
    }

    #[test]
    fn test_heading_levels() {
        let toks = tokens("# One\n\n### Three\n");
        assert!(matches!(toks[0], MdToken::Heading { level: 1, .. }));
        assert!(matches!(toks[1], MdToken::Heading { level: 3, .. }));
    }

    #[test]
    fn test_code_block() {
        let toks = tokens("```rust\nfn main() {}\n```\n");
        match &toks[0] {
            MdToken::CodeBlock { lang, text } => {
                assert_eq!(lang.as_deref(), Some("rust"));
                assert_eq!(text, "fn main() {}");
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_tight_and_loose_lists() {
        let toks = tokens("- a\n- b\n");
        match &toks[0] {
            MdToken::List { ordered, tight, items } => {
                assert!(!ordered);
                assert!(tight);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }

        let toks = tokens("- a\n\n- b\n");
        match &toks[0] {
            MdToken::List { tight, .. } => assert!(!tight),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_ordered_list() {
        let toks = tokens("1. first\n2. second\n");
        assert!(matches!(toks[0], MdToken::List { ordered: true, .. }));
    }

    #[test]
    fn test_blockquote_with_callout() {
        let toks = tokens("> [!NOTE]\n> body text\n");
        match &toks[0] {
            MdToken::Blockquote { kind, children } => {
                assert_eq!(*kind, Some(CalloutKind::Note));
                assert_eq!(children.len(), 1);
            }
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn test_multiline_paragraph_in_blockquote() {
        let toks = tokens("> first line\n> second line\n");
        match &toks[0] {
            MdToken::Blockquote { children, .. } => {
                let runs = para_runs(&children[0]);
                match &runs[0] {
                    MdRun::Text { text, .. } => assert_eq!(text, "first line second line"),
                    other => panic!("unexpected run {other:?}"),
                }
            }
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn test_table() {
        let toks = tokens("| a | b |\n|---|--:|\n| 1 | 2 |\n");
        match &toks[0] {
            MdToken::Table {
                alignments,
                headers,
                rows,
            } => {
                assert_eq!(alignments, &[CellAlignment::None, CellAlignment::Right]);
                assert_eq!(headers.len(), 2);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].len(), 2);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_math_block_paragraph() {
        let toks = tokens("$$\n\\frac{1}{2}\n$$\n");
        match &toks[0] {
            MdToken::MathBlock { latex } => assert_eq!(latex, "\\frac{1}{2}"),
            other => panic!("expected math block, got {other:?}"),
        }
    }

    #[test]
    fn test_horizontal_rule() {
        let toks = tokens("a\n\n---\n\nb\n");
        assert!(matches!(toks[1], MdToken::HorizontalRule));
    }

    #[test]
    fn test_html_block_comment() {
        let toks = tokens("<!-- block level -->\n");
        match &toks[0] {
            MdToken::HtmlBlockComment { text } => assert_eq!(text, " block level "),
            other => panic!("expected html comment block, got {other:?}"),
        }
    }

    #[test]
    fn test_html_table_passthrough() {
        let toks = tokens("<table><tr><td>x</td></tr></table>\n");
        assert!(matches!(&toks[0], MdToken::HtmlTable { .. }));
    }

    #[test]
    fn test_critic_in_code_block_is_inert() {
        let toks = tokens("```\n{++added++}\n```\n");
        match &toks[0] {
            MdToken::CodeBlock { text, .. } => assert_eq!(text, "{++added++}"),
            other => panic!("expected code block, got {other:?}"),
        }
    }
}
