//!
//! Lowering: Markdown tokens -> DocxModel. Comment ids are allocated in
//! encounter order; list numbering definitions are registered per list.
//! CriticMarkup becomes tracked changes and comment ranges here.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::bibtex::{BibEntry, BibStore};
use crate::config::{ExportOptions, MixedCitationStyle};
use crate::docx::model::{
    Block, Comment, DocxModel, Field, NumberingDef, Para, ParaChild, ParaStyle, Run, RunProps, Table, TableRow,
};
use crate::docx::xml::parse_tree;
use crate::frontmatter::Frontmatter;
use crate::tokenizer::citation::{self, CitationItem};
use crate::tokenizer::{MdRun, MdToken, TextStyle};

use super::citations;

const DEFAULT_AUTHOR: &str = "Author";

/// Lower frontmatter + tokens into the document model.
pub fn lower(
    fm: &Frontmatter,
    tokens: &[MdToken],
    bib: &BibStore,
    opts: &ExportOptions,
) -> (DocxModel, Vec<String>) {
    let mut lowerer = Lowerer {
        bib,
        opts,
        author: opts.author_name.clone().unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        now: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        model: DocxModel::default(),
        next_comment_id: 0,
        next_num_id: 1,
        open_ranges: HashMap::new(),
        range_end_ids: HashSet::new(),
        id_bodies: HashMap::new(),
        warnings: Vec::new(),
    };

    lowerer.prescan_tokens(tokens);

    for title in &fm.title {
        lowerer.model.blocks.push(Block::Paragraph(Para {
            style: ParaStyle::Title,
            children: vec![ParaChild::Run(Run::plain(title.clone()))],
            ..Default::default()
        }));
    }

    let blocks = lowerer.lower_blocks(tokens, &BlockCtx::default());
    lowerer.model.blocks.extend(blocks);

    if lowerer.model.blocks.is_empty() {
        lowerer.model.blocks.push(Block::Paragraph(Para::default()));
    }

    for id in lowerer.open_ranges.keys() {
        lowerer
            .warnings
            .push(format!("Comment range `{id}` was never closed; dropped its end marker"));
    }

    (lowerer.model, lowerer.warnings)
}

/// Container context while lowering nested blocks.
#[derive(Debug, Clone, Copy, Default)]
struct BlockCtx {
    quote: bool,
    numbering: Option<(u32, u32)>,
}

struct Lowerer<'a> {
    bib: &'a BibStore,
    opts: &'a ExportOptions,
    author: String,
    now: String,
    model: DocxModel,
    next_comment_id: u32,
    next_num_id: u32,
    /// range id -> allocated comment id, for multi-paragraph ranges.
    open_ranges: HashMap<String, u32>,
    /// range ids that have a `{##id}` end marker somewhere in the document.
    range_end_ids: HashSet<String>,
    /// range id -> detached `{#id>>...<<}` bodies.
    id_bodies: HashMap<String, Vec<CommentBody>>,
    warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct CommentBody {
    text: String,
    author: Option<String>,
    date: Option<String>,
}

impl<'a> Lowerer<'a> {
    /// Collect detached comment bodies and range-end ids before lowering.
    fn prescan_tokens(&mut self, tokens: &[MdToken]) {
        for token in tokens {
            match token {
                MdToken::Paragraph { children } | MdToken::Heading { children, .. } => {
                    self.prescan_runs(children)
                }
                MdToken::Blockquote { children, .. } => self.prescan_tokens(children),
                MdToken::List { items, .. } => {
                    for item in items {
                        self.prescan_tokens(item);
                    }
                }
                MdToken::Table { headers, rows, .. } => {
                    for cell in headers {
                        self.prescan_runs(cell);
                    }
                    for row in rows {
                        for cell in row {
                            self.prescan_runs(cell);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn prescan_runs(&mut self, runs: &[MdRun]) {
        for run in runs {
            match run {
                MdRun::CriticComment {
                    id: Some(id),
                    text,
                    author,
                    date,
                    ..
                } => {
                    self.id_bodies.entry(id.clone()).or_default().push(CommentBody {
                        text: text.clone(),
                        author: author.clone(),
                        date: date.clone(),
                    });
                }
                MdRun::CriticRangeEnd { id } => {
                    self.range_end_ids.insert(id.clone());
                }
                MdRun::Link { children, .. }
                | MdRun::CriticIns { children }
                | MdRun::CriticDel { children }
                | MdRun::CriticHighlight { children, .. } => self.prescan_runs(children),
                MdRun::CriticSub { old, new } => {
                    self.prescan_runs(old);
                    self.prescan_runs(new);
                }
                _ => {}
            }
        }
    }

    fn lower_blocks(&mut self, tokens: &[MdToken], ctx: &BlockCtx) -> Vec<Block> {
        let mut blocks = Vec::new();
        for token in tokens {
            self.lower_block(token, ctx, &mut blocks);
        }
        blocks
    }

    fn lower_block(&mut self, token: &MdToken, ctx: &BlockCtx, out: &mut Vec<Block>) {
        match token {
            MdToken::Paragraph { children } => {
                let para = Para {
                    style: if ctx.quote { ParaStyle::Quote } else { ParaStyle::Normal },
                    numbering: ctx.numbering,
                    children: self.lower_runs(children),
                    ..Default::default()
                };
                out.push(Block::Paragraph(para));
            }
            MdToken::Heading { level, children } => {
                out.push(Block::Paragraph(Para {
                    style: ParaStyle::Heading(*level),
                    children: self.lower_runs(children),
                    ..Default::default()
                }));
            }
            MdToken::CodeBlock { lang: _, text } => {
                let mut children = Vec::new();
                for (idx, line) in text.split('\n').enumerate() {
                    if idx > 0 {
                        children.push(ParaChild::Break);
                    }
                    children.push(ParaChild::Run(Run::plain(line)));
                }
                out.push(Block::Paragraph(Para {
                    style: ParaStyle::CodeBlock,
                    children,
                    ..Default::default()
                }));
            }
            MdToken::Blockquote { kind, children } => {
                if let Some(kind) = kind {
                    out.push(Block::Paragraph(Para {
                        style: ParaStyle::Quote,
                        children: vec![ParaChild::Run(Run {
                            text: format!("[!{}]", kind.label()),
                            props: RunProps {
                                bold: true,
                                ..Default::default()
                            },
                        })],
                        ..Default::default()
                    }));
                }
                let inner = BlockCtx {
                    quote: true,
                    ..*ctx
                };
                let lowered = self.lower_blocks(children, &inner);
                out.extend(lowered);
            }
            MdToken::List { ordered, tight: _, items } => {
                let (num_id, level) = match ctx.numbering {
                    // A nested list continues its parent's numbering one
                    // level deeper.
                    Some((num_id, level)) => (num_id, level + 1),
                    None => {
                        let num_id = self.next_num_id;
                        self.next_num_id += 1;
                        self.model.numberings.push(NumberingDef {
                            num_id,
                            ordered: *ordered,
                        });
                        (num_id, 0)
                    }
                };
                let inner = BlockCtx {
                    numbering: Some((num_id, level)),
                    ..*ctx
                };
                for item in items {
                    let lowered = self.lower_blocks(item, &inner);
                    out.extend(lowered);
                }
            }
            MdToken::Table {
                alignments,
                headers,
                rows,
            } => {
                let mut model_rows = Vec::new();
                if !headers.is_empty() {
                    model_rows.push(TableRow {
                        header: true,
                        cells: headers
                            .iter()
                            .enumerate()
                            .map(|(idx, cell)| self.lower_cell(cell, alignments.get(idx).copied(), true))
                            .collect(),
                    });
                }
                for row in rows {
                    model_rows.push(TableRow {
                        header: false,
                        cells: row
                            .iter()
                            .enumerate()
                            .map(|(idx, cell)| self.lower_cell(cell, alignments.get(idx).copied(), false))
                            .collect(),
                    });
                }
                out.push(Block::Table(Table {
                    alignments: alignments.clone(),
                    rows: model_rows,
                    complex: false,
                }));
            }
            MdToken::MathBlock { latex } => {
                out.push(Block::Paragraph(Para {
                    children: vec![ParaChild::Math {
                        latex: latex.clone(),
                        display: true,
                    }],
                    ..Default::default()
                }));
            }
            MdToken::HtmlTable { xml } => self.lower_html_table(xml, out),
            MdToken::HorizontalRule => {
                out.push(Block::Paragraph(Para {
                    horizontal_rule: true,
                    ..Default::default()
                }));
            }
            MdToken::HtmlBlockComment { text } => {
                out.push(Block::Paragraph(Para {
                    children: vec![ParaChild::HiddenHtml { text: text.clone() }],
                    ..Default::default()
                }));
            }
        }
    }

    fn lower_cell(
        &mut self,
        runs: &[MdRun],
        alignment: Option<crate::tokenizer::CellAlignment>,
        header: bool,
    ) -> Vec<Block> {
        let mut children = self.lower_runs(runs);
        if header {
            for child in &mut children {
                if let ParaChild::Run(run) = child {
                    run.props.bold = true;
                }
            }
        }
        vec![Block::Paragraph(Para {
            alignment,
            children,
            ..Default::default()
        })]
    }

    /// Parse a raw `<table>` HTML block into a simple table model.
    fn lower_html_table(&mut self, xml: &str, out: &mut Vec<Block>) {
        match parse_tree(xml) {
            Ok(tree) => {
                let mut rows = Vec::new();
                collect_html_rows(&tree, &mut rows);
                if rows.is_empty() {
                    self.warnings.push("Empty HTML table dropped".to_string());
                    return;
                }
                let model_rows = rows
                    .into_iter()
                    .map(|(header, cells)| TableRow {
                        header,
                        cells: cells
                            .into_iter()
                            .map(|text| {
                                vec![Block::Paragraph(Para {
                                    children: vec![ParaChild::Run(Run::plain(text))],
                                    ..Default::default()
                                })]
                            })
                            .collect(),
                    })
                    .collect();
                out.push(Block::Table(Table {
                    alignments: Vec::new(),
                    rows: model_rows,
                    complex: true,
                }));
            }
            Err(_) => {
                self.warnings
                    .push("Unparseable HTML table emitted as plain text".to_string());
                out.push(Block::Paragraph(Para {
                    children: vec![ParaChild::Run(Run::plain(xml))],
                    ..Default::default()
                }));
            }
        }
    }

    fn alloc_comment_id(&mut self) -> u32 {
        let id = self.next_comment_id;
        self.next_comment_id += 1;
        id
    }

    fn lower_runs(&mut self, runs: &[MdRun]) -> Vec<ParaChild> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < runs.len() {
            match &runs[i] {
                MdRun::Text { text, style } => {
                    out.push(ParaChild::Run(Run {
                        text: text.clone(),
                        props: props_from_style(style),
                    }));
                    i += 1;
                }
                MdRun::HardBreak => {
                    out.push(ParaChild::Break);
                    i += 1;
                }
                MdRun::Link { url, children } => {
                    out.push(ParaChild::Hyperlink {
                        url: url.clone(),
                        runs: self.collect_plain_runs(children),
                    });
                    i += 1;
                }
                MdRun::InlineMath { latex } => {
                    out.push(ParaChild::Math {
                        latex: latex.clone(),
                        display: false,
                    });
                    i += 1;
                }
                MdRun::Citation { items } => {
                    self.lower_citation(items, &mut out);
                    i += 1;
                }
                MdRun::HtmlComment { text } => {
                    out.push(ParaChild::HiddenHtml { text: text.clone() });
                    i += 1;
                }
                MdRun::CriticIns { children } => {
                    let element = ParaChild::Ins {
                        author: self.author.clone(),
                        date: self.now.clone(),
                        runs: self.collect_plain_runs(children),
                    };
                    i += 1;
                    self.emit_with_anchor(vec![element], runs, &mut i, &mut out, Vec::new());
                }
                MdRun::CriticDel { children } => {
                    let element = ParaChild::Del {
                        author: self.author.clone(),
                        date: self.now.clone(),
                        runs: self.collect_plain_runs(children),
                    };
                    i += 1;
                    self.emit_with_anchor(vec![element], runs, &mut i, &mut out, Vec::new());
                }
                MdRun::CriticSub { old, new } => {
                    let date = self.now.clone();
                    let elements = vec![
                        ParaChild::Del {
                            author: self.author.clone(),
                            date: date.clone(),
                            runs: self.collect_plain_runs(old),
                        },
                        ParaChild::Ins {
                            author: self.author.clone(),
                            date,
                            runs: self.collect_plain_runs(new),
                        },
                    ];
                    i += 1;
                    self.emit_with_anchor(elements, runs, &mut i, &mut out, Vec::new());
                }
                MdRun::CriticHighlight { children, id } => {
                    let content: Vec<ParaChild> = self
                        .collect_plain_runs(children)
                        .into_iter()
                        .map(ParaChild::Run)
                        .collect();
                    let bodies = id
                        .as_ref()
                        .map(|id| self.id_bodies.remove(id).unwrap_or_default())
                        .unwrap_or_default();
                    i += 1;
                    match id {
                        Some(rid) if self.range_end_ids.contains(rid) => {
                            // Multi-paragraph range: leave it open until the
                            // matching {##id}.
                            let k = self.alloc_comment_id();
                            self.push_comment_entry(k, &bodies);
                            self.open_ranges.insert(rid.clone(), k);
                            out.push(ParaChild::CommentStart { id: k });
                            out.extend(content);
                        }
                        _ => {
                            self.emit_with_anchor(content, runs, &mut i, &mut out, bodies);
                        }
                    }
                }
                MdRun::CriticRangeEnd { id } => {
                    i += 1;
                    match self.open_ranges.remove(id) {
                        Some(k) => {
                            out.push(ParaChild::CommentEnd { id: k });
                            out.push(ParaChild::CommentRef { id: k });
                        }
                        None => {
                            self.warnings
                                .push(format!("Range end `{{{{##{id}}}}}` without an open range, dropped"));
                        }
                    }
                }
                MdRun::CriticComment {
                    id: Some(_), ..
                } => {
                    // Detached body, already routed via the pre-scan.
                    i += 1;
                }
                MdRun::CriticComment {
                    text,
                    author,
                    date,
                    id: None,
                    ..
                } => {
                    // Standalone comment: zero-length anchor.
                    let body = CommentBody {
                        text: text.clone(),
                        author: author.clone(),
                        date: date.clone(),
                    };
                    let k = self.alloc_comment_id();
                    self.push_comment_entry(k, &[body]);
                    out.push(ParaChild::CommentStart { id: k });
                    out.push(ParaChild::CommentEnd { id: k });
                    out.push(ParaChild::CommentRef { id: k });
                    i += 1;
                }
            }
        }
        out
    }

    /// Emit `elements` wrapped in a comment range when anchored comments (or
    /// detached bodies) target them; otherwise emit them bare.
    fn emit_with_anchor(
        &mut self,
        elements: Vec<ParaChild>,
        runs: &[MdRun],
        i: &mut usize,
        out: &mut Vec<ParaChild>,
        mut bodies: Vec<CommentBody>,
    ) {
        let mut leading_ws = None;
        while let Some(MdRun::CriticComment {
            text,
            author,
            date,
            id: None,
            leading_ws: ws,
            anchored: true,
        }) = runs.get(*i)
        {
            if leading_ws.is_none() {
                leading_ws = Some(ws.clone());
            }
            bodies.push(CommentBody {
                text: text.clone(),
                author: author.clone(),
                date: date.clone(),
            });
            *i += 1;
        }

        let is_highlight_anchor = elements.iter().all(|el| matches!(el, ParaChild::Run(_)));
        if bodies.is_empty() && !is_highlight_anchor {
            // Plain tracked change without a comment.
            out.extend(elements);
            return;
        }

        let k = self.alloc_comment_id();
        self.push_comment_entry(k, &bodies);
        out.push(ParaChild::CommentStart { id: k });
        out.extend(elements);
        out.push(ParaChild::CommentEnd { id: k });
        if let Some(ws) = leading_ws.filter(|ws| !ws.is_empty()) {
            out.push(ParaChild::Run(Run::plain(ws.replace(['\n', '\t'], " "))));
        }
        out.push(ParaChild::CommentRef { id: k });
    }

    /// Register a comment entry; multiple bodies merge with newlines. The
    /// author stays empty unless the comment (or the caller) names one, so
    /// re-import does not grow a synthetic `author (date):` prefix.
    fn push_comment_entry(&mut self, id: u32, bodies: &[CommentBody]) {
        let text = bodies.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n");
        let author = bodies
            .iter()
            .find_map(|b| b.author.clone())
            .or_else(|| self.opts.author_name.clone())
            .unwrap_or_default();
        let date = bodies
            .iter()
            .find_map(|b| b.date.as_ref().map(|d| comment_date_to_iso(d)))
            .unwrap_or_else(|| self.now.clone());
        self.model.comments.push(Comment {
            id,
            author,
            date,
            text,
        });
    }

    /// Flatten nested inline content to plain runs (tracked changes and
    /// hyperlinks hold runs, not arbitrary children).
    fn collect_plain_runs(&mut self, runs: &[MdRun]) -> Vec<Run> {
        let mut out = Vec::new();
        for run in runs {
            match run {
                MdRun::Text { text, style } => out.push(Run {
                    text: text.clone(),
                    props: props_from_style(style),
                }),
                MdRun::HardBreak => out.push(Run::plain(" ")),
                MdRun::Link { children, .. } => out.extend(self.collect_plain_runs(children)),
                MdRun::InlineMath { latex } => out.push(Run::plain(format!("${latex}$"))),
                MdRun::Citation { items } => out.push(Run::plain(citation::render(items))),
                MdRun::HtmlComment { text } => out.push(Run::plain(format!("<!--{text}-->"))),
                MdRun::CriticIns { children }
                | MdRun::CriticDel { children }
                | MdRun::CriticHighlight { children, .. } => {
                    out.extend(self.collect_plain_runs(children));
                }
                MdRun::CriticSub { old, new } => {
                    out.extend(self.collect_plain_runs(old));
                    out.extend(self.collect_plain_runs(new));
                }
                MdRun::CriticComment { .. } | MdRun::CriticRangeEnd { .. } => {}
            }
        }
        out
    }

    fn lower_citation(&mut self, items: &[CitationItem], out: &mut Vec<ParaChild>) {
        let mut resolved: Vec<(&CitationItem, &BibEntry)> = Vec::new();
        let mut unresolved: Vec<CitationItem> = Vec::new();
        for item in items {
            match self.bib.lookup(&item.key) {
                Some(entry) => resolved.push((item, entry)),
                None => {
                    self.warnings
                        .push(format!("Citation key `{}` not found in bibliography", item.key));
                    unresolved.push(item.clone());
                }
            }
        }

        match self.opts.mixed_citation_style {
            MixedCitationStyle::Unified => {
                if !resolved.is_empty() {
                    out.push(ParaChild::Field(Field {
                        instr: citations::field_instruction(&resolved),
                        result: vec![Run::plain(citations::formatted_citation(&resolved))],
                    }));
                }
            }
            MixedCitationStyle::Separate => {
                for (item, entry) in &resolved {
                    if entry.has_zotero_link() {
                        let group = [(*item, *entry)];
                        out.push(ParaChild::Field(Field {
                            instr: citations::field_instruction(&group),
                            result: vec![Run::plain(citations::formatted_citation(&group))],
                        }));
                    } else {
                        out.push(ParaChild::Run(Run::plain(citations::formatted_citation(&[(
                            *item, *entry,
                        )]))));
                    }
                }
            }
        }

        if !unresolved.is_empty() {
            // Unknown keys stay in Pandoc form so nothing is lost.
            out.push(ParaChild::Run(Run::plain(citation::render(&unresolved))));
        }
    }
}

fn props_from_style(style: &TextStyle) -> RunProps {
    RunProps {
        bold: style.bold,
        italic: style.italic,
        underline: style.underline,
        strike: style.strike,
        sup: style.sup,
        sub: style.sub,
        code: style.code,
        vanish: false,
        highlight: style.highlight,
    }
}

/// `2024-03-01 14:30` (or date-only) -> ISO-8601 UTC.
fn comment_date_to_iso(date: &str) -> String {
    let trimmed = date.trim();
    if trimmed.len() >= 16 && trimmed.is_char_boundary(10) {
        format!("{}T{}:00Z", &trimmed[..10], &trimmed[11..16])
    } else if trimmed.len() == 10 {
        format!("{trimmed}T00:00:00Z")
    } else {
        trimmed.to_string()
    }
}

/// Collect `<tr>` rows (header when inside `<thead>` or using `<th>`).
fn collect_html_rows(el: &crate::docx::xml::XmlElement, rows: &mut Vec<(bool, Vec<String>)>) {
    for child in el.elements() {
        match child.local_name() {
            "tr" => {
                let mut cells = Vec::new();
                let mut header = false;
                for cell in child.elements() {
                    match cell.local_name() {
                        "td" => cells.push(cell.text()),
                        "th" => {
                            header = true;
                            cells.push(cell.text());
                        }
                        _ => {}
                    }
                }
                rows.push((header, cells));
            }
            _ => collect_html_rows(child, rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenizerOptions, tokenize};

    fn lower_md(md: &str) -> (DocxModel, Vec<String>) {
        let (tokens, _) = tokenize(md, &TokenizerOptions::default());
        lower(
            &Frontmatter::default(),
            &tokens,
            &BibStore::new(),
            &ExportOptions::default(),
        )
    }

    fn first_para(model: &DocxModel) -> &Para {
        match &model.blocks[0] {
            Block::Paragraph(para) => para,
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_paragraph() {
        let (model, _) = lower_md("hello\n");
        let para = first_para(&model);
        assert_eq!(para.children, vec![ParaChild::Run(Run::plain("hello"))]);
    }

    #[test]
    fn test_heading_style() {
        let (model, _) = lower_md("## Two\n");
        assert_eq!(first_para(&model).style, ParaStyle::Heading(2));
    }

    #[test]
    fn test_title_paragraphs_come_first() {
        let (tokens, _) = tokenize("body\n", &TokenizerOptions::default());
        let fm = Frontmatter {
            title: vec!["My Paper".to_string()],
            ..Default::default()
        };
        let (model, _) = lower(&fm, &tokens, &BibStore::new(), &ExportOptions::default());
        assert_eq!(first_para(&model).style, ParaStyle::Title);
    }

    #[test]
    fn test_insertion_becomes_tracked_change() {
        let (model, _) = lower_md("{++added++}\n");
        let para = first_para(&model);
        match &para.children[0] {
            ParaChild::Ins { author, runs, .. } => {
                assert_eq!(author, "Author");
                assert_eq!(runs, &[Run::plain("added")]);
            }
            other => panic!("expected insertion, got {other:?}"),
        }
    }

    #[test]
    fn test_substitution_is_del_plus_ins_same_date() {
        let (model, _) = lower_md("{~~old~>new~~}\n");
        let para = first_para(&model);
        let (del_date, ins_date) = match (&para.children[0], &para.children[1]) {
            (ParaChild::Del { date: d, .. }, ParaChild::Ins { date: i, .. }) => (d.clone(), i.clone()),
            other => panic!("expected del+ins, got {other:?}"),
        };
        assert_eq!(del_date, ins_date);
    }

    #[test]
    fn test_anchored_comment_range() {
        let (model, _) = lower_md("{==text==} {>>note<<}\n");
        let para = first_para(&model);
        assert!(matches!(para.children[0], ParaChild::CommentStart { id: 0 }));
        assert!(matches!(para.children[1], ParaChild::Run(_)));
        assert!(matches!(para.children[2], ParaChild::CommentEnd { id: 0 }));
        // preserved whitespace run between end and reference
        assert_eq!(para.children[3], ParaChild::Run(Run::plain(" ")));
        assert!(matches!(para.children[4], ParaChild::CommentRef { id: 0 }));
        assert_eq!(model.comments.len(), 1);
        assert_eq!(model.comments[0].text, "note");
    }

    #[test]
    fn test_merged_comments() {
        let (model, _) = lower_md("{==x==}{>>a<<}{>>b<<}\n");
        assert_eq!(model.comments.len(), 1);
        assert_eq!(model.comments[0].text, "a\nb");
    }

    #[test]
    fn test_bare_highlight_gets_empty_comment() {
        let (model, _) = lower_md("{==alone==}\n");
        assert_eq!(model.comments.len(), 1);
        assert_eq!(model.comments[0].text, "");
    }

    #[test]
    fn test_multi_paragraph_range() {
        let (model, _) = lower_md("{==start==}{##r1} a\n\nend {##r1} {#r1>>body<<}\n");
        assert_eq!(model.comments.len(), 1);
        assert_eq!(model.comments[0].text, "body");
        let starts: usize = model
            .blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => p
                    .children
                    .iter()
                    .filter(|c| matches!(c, ParaChild::CommentStart { .. }))
                    .count(),
                _ => 0,
            })
            .sum();
        assert_eq!(starts, 1);
        // end + ref live in the second paragraph
        match &model.blocks[1] {
            Block::Paragraph(para) => {
                assert!(para.children.iter().any(|c| matches!(c, ParaChild::CommentEnd { .. })));
                assert!(para.children.iter().any(|c| matches!(c, ParaChild::CommentRef { .. })));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_list_numbering_registration() {
        let (model, _) = lower_md("- a\n- b\n");
        assert_eq!(model.numberings, vec![NumberingDef { num_id: 1, ordered: false }]);
        assert_eq!(first_para(&model).numbering, Some((1, 0)));
    }

    #[test]
    fn test_nested_list_depth() {
        let (model, _) = lower_md("- a\n  - b\n");
        let levels: Vec<Option<(u32, u32)>> = model
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.numbering),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![Some((1, 0)), Some((1, 1))]);
    }

    #[test]
    fn test_html_comment_is_hidden_carrier() {
        let (model, _) = lower_md("a <!-- x --> b\n");
        let para = first_para(&model);
        assert!(
            para.children
                .iter()
                .any(|c| matches!(c, ParaChild::HiddenHtml { text } if text == " x "))
        );
    }

    #[test]
    fn test_unknown_citation_key_stays_pandoc() {
        let (model, warnings) = lower_md("[@ghost]\n");
        let para = first_para(&model);
        assert_eq!(para.children, vec![ParaChild::Run(Run::plain("[@ghost]"))]);
        assert!(warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_callout_marker_paragraph() {
        let (model, _) = lower_md("> [!NOTE]\n> body\n");
        let para = first_para(&model);
        assert_eq!(para.style, ParaStyle::Quote);
        match &para.children[0] {
            ParaChild::Run(run) => {
                assert_eq!(run.text, "[!NOTE]");
                assert!(run.props.bold);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }
}
