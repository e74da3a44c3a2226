//!
//! Document model -> Markdown rendering. Comment ranges become CriticMarkup
//! (or the ID-based encoding when an anchor spans paragraphs), tracked
//! changes become insert/delete/substitute marks, and Zotero fields become
//! Pandoc citations.

use std::collections::{HashMap, HashSet};

use crate::docx::model::{Block, Comment, DocxModel, Para, ParaChild, ParaStyle, Run, RunProps, Table};
use crate::tokenizer::CellAlignment;
use crate::tokenizer::citation;
use crate::tokenizer::highlight::HighlightColor;
use crate::frontmatter::{self, Frontmatter};

use super::fields::CitationCollector;

pub struct Renderer<'a> {
    numbering_ordered: &'a HashMap<u32, bool>,
    comments: &'a HashMap<u32, Comment>,
    collector: &'a mut CitationCollector,
    warnings: &'a mut Vec<String>,
    /// Comment ids whose range spans more than one paragraph.
    multi_para: HashSet<u32>,
}

/// Render the model to Markdown text.
pub fn render_markdown(
    model: &DocxModel,
    numbering_ordered: &HashMap<u32, bool>,
    comments: &HashMap<u32, Comment>,
    collector: &mut CitationCollector,
    warnings: &mut Vec<String>,
) -> String {
    let mut renderer = Renderer {
        numbering_ordered,
        comments,
        collector,
        warnings,
        multi_para: HashSet::new(),
    };
    renderer.scan_ranges(&model.blocks);
    renderer.render(&model.blocks)
}

impl Renderer<'_> {
    /// Find comment ranges whose start and end sit in different paragraphs.
    fn scan_ranges(&mut self, blocks: &[Block]) {
        let mut start_block: HashMap<u32, usize> = HashMap::new();
        for (idx, block) in blocks.iter().enumerate() {
            let Block::Paragraph(para) = block else { continue };
            for child in &para.children {
                match child {
                    ParaChild::CommentStart { id } => {
                        start_block.insert(*id, idx);
                    }
                    ParaChild::CommentEnd { id } => {
                        if start_block.get(id).is_some_and(|start| *start != idx) {
                            self.multi_para.insert(*id);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn render(&mut self, blocks: &[Block]) -> String {
        let mut sections: Vec<String> = Vec::new();
        let mut titles: Vec<String> = Vec::new();
        let mut i = 0;

        // Leading Title paragraphs lift back into frontmatter.
        while let Some(Block::Paragraph(para)) = blocks.get(i) {
            if para.style != ParaStyle::Title {
                break;
            }
            titles.push(plain_text_of(&para.children));
            i += 1;
        }

        while i < blocks.len() {
            match &blocks[i] {
                Block::Paragraph(para) => {
                    if para.numbering.is_some() {
                        let start = i;
                        while matches!(blocks.get(i), Some(Block::Paragraph(p)) if p.numbering.is_some()) {
                            i += 1;
                        }
                        sections.push(self.render_list(&blocks[start..i]));
                        continue;
                    }
                    if para.style == ParaStyle::Quote {
                        let start = i;
                        while matches!(
                            blocks.get(i),
                            Some(Block::Paragraph(p)) if p.style == ParaStyle::Quote
                        ) {
                            i += 1;
                        }
                        sections.push(self.render_blockquote(&blocks[start..i]));
                        continue;
                    }
                    if para.style == ParaStyle::CodeBlock {
                        let start = i;
                        while matches!(
                            blocks.get(i),
                            Some(Block::Paragraph(p)) if p.style == ParaStyle::CodeBlock
                        ) {
                            i += 1;
                        }
                        sections.push(render_code_block(&blocks[start..i]));
                        continue;
                    }
                    if let Some(section) = self.render_single_para(para) {
                        sections.push(section);
                    }
                    i += 1;
                }
                Block::Table(table) => {
                    sections.push(self.render_table(table));
                    i += 1;
                }
            }
        }

        let mut out = String::new();
        if !titles.is_empty() {
            let fm = Frontmatter {
                title: titles,
                ..Default::default()
            };
            out.push_str(&frontmatter::render(&fm));
            out.push('\n');
        }
        out.push_str(&sections.join("\n\n"));
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    fn render_single_para(&mut self, para: &Para) -> Option<String> {
        if para.horizontal_rule && para.children.is_empty() {
            return Some("---".to_string());
        }
        // A display-math paragraph renders as a $$ block.
        if let [ParaChild::Math { latex, display: true }] = para.children.as_slice() {
            let inner = latex.trim_matches('\n');
            return Some(format!("$$\n{inner}\n$$"));
        }

        let inline = self.render_inline(&para.children, false);
        if inline.is_empty() {
            return None;
        }
        Some(match para.style {
            ParaStyle::Heading(level) => {
                format!("{} {}", "#".repeat(level as usize), inline)
            }
            ParaStyle::Title => format!("# {inline}"),
            _ => guard_block_prefix(inline),
        })
    }

    fn render_blockquote(&mut self, blocks: &[Block]) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut first = true;
        let mut prev_was_callout = false;
        for block in blocks {
            let Block::Paragraph(para) = block else { continue };
            if let Some(label) = callout_label(para) {
                if !first {
                    lines.push(">".to_string());
                }
                lines.push(format!("> [!{label}]"));
                first = false;
                prev_was_callout = true;
                continue;
            }
            let inline = self.render_inline(&para.children, false);
            if inline.is_empty() {
                continue;
            }
            if !first && !prev_was_callout {
                lines.push(">".to_string());
            }
            lines.push(format!("> {inline}"));
            first = false;
            prev_was_callout = false;
        }
        lines.join("\n")
    }

    fn render_list(&mut self, blocks: &[Block]) -> String {
        let mut counters: HashMap<(u32, u32), usize> = HashMap::new();
        let mut lines = Vec::new();
        for block in blocks {
            let Block::Paragraph(para) = block else { continue };
            let Some((num_id, level)) = para.numbering else { continue };
            let ordered = self.numbering_ordered.get(&num_id).copied().unwrap_or(false);

            // Deeper counters reset when a shallower item appears.
            counters.retain(|(id, lvl), _| *id != num_id || *lvl <= level);
            let counter = counters.entry((num_id, level)).or_insert(0);
            *counter += 1;
            let marker = if ordered {
                format!("{}.", *counter)
            } else {
                "-".to_string()
            };

            let inline = self.render_inline(&para.children, false);
            lines.push(format!("{}{} {}", "    ".repeat(level as usize), marker, inline));
        }
        lines.join("\n")
    }

    fn render_table(&mut self, table: &Table) -> String {
        if table.complex {
            return self.render_html_table(table);
        }

        let rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                row.cells
                    .iter()
                    .map(|cell| {
                        // The writer bolds header cells; strip that here so
                        // the pipe header reads plainly.
                        if idx == 0 {
                            self.render_cell(&strip_bold(cell))
                        } else {
                            self.render_cell(cell)
                        }
                    })
                    .collect()
            })
            .collect();
        if rows.is_empty() {
            return String::new();
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut lines = Vec::new();
        lines.push(format!("| {} |", pad_row(&rows[0], columns).join(" | ")));
        let separators: Vec<String> = (0..columns)
            .map(|idx| match table.alignments.get(idx).copied().unwrap_or_default() {
                CellAlignment::Left => ":---".to_string(),
                CellAlignment::Center => ":--:".to_string(),
                CellAlignment::Right => "---:".to_string(),
                CellAlignment::None => "---".to_string(),
            })
            .collect();
        lines.push(format!("|{}|", separators.join("|")));
        for row in rows.iter().skip(1) {
            lines.push(format!("| {} |", pad_row(row, columns).join(" | ")));
        }
        lines.join("\n")
    }

    fn render_html_table(&mut self, table: &Table) -> String {
        let mut out = String::from("<table>");
        for row in &table.rows {
            out.push_str("<tr>");
            for cell in &row.cells {
                let tag = if row.header { "th" } else { "td" };
                let text = cell
                    .iter()
                    .map(|block| match block {
                        Block::Paragraph(p) => plain_text_of(&p.children),
                        Block::Table(_) => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("<{tag}>{}</{tag}>", crate::docx::xml::escape_text(&text)));
            }
            out.push_str("</tr>");
        }
        out.push_str("</table>");
        out
    }

    fn render_cell(&mut self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(para) => {
                    let inline = self.render_inline(&para.children, true);
                    (!inline.is_empty()).then_some(inline)
                }
                Block::Table(_) => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render_inline(&mut self, children: &[ParaChild], in_table: bool) -> String {
        let children = expand_code_boundaries(merge_runs(children));
        let mut out = String::new();
        let mut i = 0;

        while i < children.len() {
            match &children[i] {
                ParaChild::Run(run) => {
                    if run.props.vanish {
                        i += 1;
                        continue;
                    }
                    out.push_str(&self.decorate_run(run, in_table));
                    i += 1;
                }
                ParaChild::Break => {
                    out.push_str(if in_table { " " } else { "\\\n" });
                    i += 1;
                }
                ParaChild::Hyperlink { url, runs } => {
                    let text = runs_plain_text(runs);
                    if text == *url {
                        out.push_str(&format!("<{url}>"));
                    } else {
                        let mut label = String::new();
                        for run in runs {
                            label.push_str(&self.decorate_run(run, in_table));
                        }
                        out.push_str(&format!("[{label}]({url})"));
                    }
                    i += 1;
                }
                ParaChild::Math { latex, .. } => {
                    // Math carrying comments (newlines) needs the block
                    // delimiters; inline `$` cannot cross a line.
                    if latex.contains('\n') {
                        out.push_str(&format!("$$\n{}\n$$", latex.trim_matches('\n')));
                    } else {
                        out.push_str(&format!("${latex}$"));
                    }
                    i += 1;
                }
                ParaChild::Field(field) => {
                    if field.is_zotero_citation() {
                        match self.collector.parse_instruction(&field.instr) {
                            Some(items) => out.push_str(&citation::render(&items)),
                            None => out.push_str(&runs_plain_text(&field.result)),
                        }
                    } else {
                        out.push_str(&runs_plain_text(&field.result));
                    }
                    i += 1;
                }
                ParaChild::HiddenHtml { text } => {
                    out.push_str(&format!("<!--{text}-->"));
                    i += 1;
                }
                ParaChild::Del { date, runs, .. } => {
                    // Adjacent del+ins with a shared date collapse to a
                    // substitution.
                    if let Some(ParaChild::Ins {
                        date: ins_date,
                        runs: ins_runs,
                        ..
                    }) = children.get(i + 1)
                    {
                        if ins_date == date {
                            out.push_str(&format!(
                                "{{~~{}~>{}~~}}",
                                self.render_change_runs(runs, in_table),
                                self.render_change_runs(ins_runs, in_table)
                            ));
                            i += 2;
                            continue;
                        }
                    }
                    out.push_str(&format!("{{--{}--}}", self.render_change_runs(runs, in_table)));
                    i += 1;
                }
                ParaChild::Ins { runs, .. } => {
                    out.push_str(&format!("{{++{}++}}", self.render_change_runs(runs, in_table)));
                    i += 1;
                }
                ParaChild::CommentStart { id } => {
                    i = self.render_comment_range(&children, i, *id, in_table, &mut out);
                }
                ParaChild::CommentEnd { id } => {
                    if self.multi_para.contains(id) {
                        out.push_str(&format!("{{##c{id}}}"));
                        // Consume an optional whitespace run and the
                        // reference, then place the detached body.
                        let mut next = i + 1;
                        let mut ws = String::new();
                        if let Some(ParaChild::Run(run)) = children.get(next) {
                            if run.text.chars().all(char::is_whitespace) && !run.text.is_empty() {
                                ws = run.text.clone();
                                next += 1;
                            }
                        }
                        if matches!(children.get(next), Some(ParaChild::CommentRef { id: r }) if r == id) {
                            next += 1;
                        }
                        out.push_str(&ws);
                        if let Some(body) = self.comment_bodies(*id) {
                            out.push_str(&format!("{{#c{id}>>{body}<<}}"));
                        }
                        i = next;
                    } else {
                        i += 1;
                    }
                }
                ParaChild::CommentRef { .. } => {
                    i += 1;
                }
            }
        }

        out
    }

    fn render_change_runs(&mut self, runs: &[Run], in_table: bool) -> String {
        runs.iter().map(|run| self.decorate_run(run, in_table)).collect()
    }

    /// Render a comment range starting at `children[start]`; returns the
    /// next index to continue from.
    fn render_comment_range(
        &mut self,
        children: &[ParaChild],
        start: usize,
        id: u32,
        in_table: bool,
        out: &mut String,
    ) -> usize {
        if self.multi_para.contains(&id) {
            // The range closes in a later paragraph; wrap the rest of this
            // one and tag it with the range id.
            let inner = self.render_inline(&children[start + 1..], in_table);
            out.push_str(&format!("{{=={inner}==}}{{##c{id}}}"));
            return children.len();
        }

        let Some(end_rel) = children[start + 1..]
            .iter()
            .position(|c| matches!(c, ParaChild::CommentEnd { id: e } if *e == id))
        else {
            self.warnings
                .push(format!("Comment range {id} has no end marker; range dropped"));
            return start + 1;
        };
        let end = start + 1 + end_rel;

        let interior = &children[start + 1..end];
        let is_change_anchor = interior
            .iter()
            .any(|c| matches!(c, ParaChild::Ins { .. } | ParaChild::Del { .. }));
        let inner = self.render_inline(interior, in_table);

        // Whitespace run kept between the range end and the reference.
        let mut next = end + 1;
        let mut ws = String::new();
        if let Some(ParaChild::Run(run)) = children.get(next) {
            if !run.text.is_empty()
                && run.text.chars().all(char::is_whitespace)
                && matches!(children.get(next + 1), Some(ParaChild::CommentRef { id: r }) if *r == id)
            {
                ws = run.text.clone();
                next += 1;
            }
        }
        if matches!(children.get(next), Some(ParaChild::CommentRef { id: r }) if *r == id) {
            next += 1;
        }

        let bodies = self.comment_markers(id);
        if inner.is_empty() {
            // Standalone comment with a zero-length anchor.
            out.push_str(&bodies.unwrap_or_default());
        } else if is_change_anchor {
            out.push_str(&inner);
            if let Some(bodies) = bodies {
                out.push_str(&ws);
                out.push_str(&bodies);
            }
        } else {
            out.push_str(&format!("{{=={inner}==}}"));
            if let Some(bodies) = bodies {
                out.push_str(&ws);
                out.push_str(&bodies);
            }
        }
        next
    }

    /// `{>>...<<}` markers for a comment entry; None when the body is empty.
    fn comment_markers(&mut self, id: u32) -> Option<String> {
        let comment = self.comments.get(&id)?;
        if comment.text.is_empty() {
            return None;
        }
        let prefix = comment_prefix(comment);
        let markers: Vec<String> = comment
            .text
            .split('\n')
            .enumerate()
            .map(|(idx, line)| {
                if idx == 0 {
                    format!("{{>>{prefix}{line}<<}}")
                } else {
                    format!("{{>>{line}<<}}")
                }
            })
            .collect();
        Some(markers.join(""))
    }

    /// Body text for the detached `{#id>>...<<}` form.
    fn comment_bodies(&mut self, id: u32) -> Option<String> {
        let comment = self.comments.get(&id)?;
        if comment.text.is_empty() {
            return None;
        }
        let prefix = comment_prefix(comment);
        Some(format!("{prefix}{}", comment.text.replace('\n', " ")))
    }

    fn decorate_run(&mut self, run: &Run, in_table: bool) -> String {
        let props = run.props;
        if props.code {
            return render_code_span(&run.text);
        }

        let mut text = escape_markdown(&run.text, in_table);
        if props.bold {
            text = format!("**{text}**");
        }
        if props.italic {
            text = format!("*{text}*");
        }
        if props.strike {
            text = format!("~~{text}~~");
        }
        if props.sup {
            if run.text.contains(char::is_whitespace) {
                self.warnings
                    .push("Superscript with whitespace kept as plain text".to_string());
            } else {
                text = format!("^{text}^");
            }
        }
        if props.sub {
            if run.text.contains(char::is_whitespace) {
                self.warnings
                    .push("Subscript with whitespace kept as plain text".to_string());
            } else {
                text = format!("~{text}~");
            }
        }
        if props.underline {
            text = format!("<u>{text}</u>");
        }
        if let Some(color) = props.highlight {
            text = if color == HighlightColor::Yellow {
                format!("=={text}==")
            } else {
                format!("=={text}=={{{}}}", color.id())
            };
        }
        text
    }
}

/// `Jane (2024-03-01 14:30): ` prefix when the comment carries an author.
fn comment_prefix(comment: &Comment) -> String {
    if comment.author.is_empty() {
        return String::new();
    }
    match iso_to_comment_date(&comment.date) {
        Some(date) => format!("{} ({}): ", comment.author, date),
        None => String::new(),
    }
}

/// `2024-03-01T14:30:00Z` -> `2024-03-01 14:30`
fn iso_to_comment_date(date: &str) -> Option<String> {
    let (day, time) = date.split_once('T')?;
    let time = time.get(..5)?;
    Some(format!("{day} {time}"))
}

/// A quote paragraph holding only the bold `[!KIND]` marker.
fn callout_label(para: &Para) -> Option<&str> {
    if let [ParaChild::Run(run)] = para.children.as_slice() {
        if run.props.bold {
            let label = run.text.strip_prefix("[!")?.strip_suffix(']')?;
            if matches!(label, "NOTE" | "TIP" | "IMPORTANT" | "WARNING" | "CAUTION") {
                return Some(label);
            }
        }
    }
    None
}

fn strip_bold(blocks: &[Block]) -> Vec<Block> {
    blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph(para) => {
                let mut para = para.clone();
                for child in &mut para.children {
                    if let ParaChild::Run(run) = child {
                        run.props.bold = false;
                    }
                }
                Block::Paragraph(para)
            }
            other => other.clone(),
        })
        .collect()
}

fn pad_row(row: &[String], columns: usize) -> Vec<String> {
    let mut padded = row.to_vec();
    while padded.len() < columns {
        padded.push(String::new());
    }
    padded
}

fn plain_text_of(children: &[ParaChild]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            ParaChild::Run(run) if !run.props.vanish => out.push_str(&run.text),
            ParaChild::Hyperlink { runs, .. } => out.push_str(&runs_plain_text(runs)),
            ParaChild::Break => out.push(' '),
            _ => {}
        }
    }
    out
}

fn runs_plain_text(runs: &[Run]) -> String {
    runs.iter().map(|run| run.text.as_str()).collect()
}

/// Merge adjacent runs with identical formatting so emphasis markers wrap
/// whole phrases instead of every Word-split fragment.
fn merge_runs(children: &[ParaChild]) -> Vec<ParaChild> {
    let mut merged: Vec<ParaChild> = Vec::new();
    for child in children {
        if let (Some(ParaChild::Run(last)), ParaChild::Run(run)) = (merged.last_mut(), child) {
            if last.props == run.props {
                last.text.push_str(&run.text);
                continue;
            }
        }
        merged.push(child.clone());
    }
    merged
}

/// Move comment boundaries that fall between two code runs outside the
/// span: CriticMarkup cannot open or close inside backticks.
fn expand_code_boundaries(mut children: Vec<ParaChild>) -> Vec<ParaChild> {
    let is_code_run =
        |child: Option<&ParaChild>| matches!(child, Some(ParaChild::Run(run)) if run.props.code);

    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..children.len() {
            match &children[i] {
                ParaChild::CommentStart { .. }
                    if i > 0 && is_code_run(children.get(i - 1)) && is_code_run(children.get(i + 1)) =>
                {
                    children.swap(i - 1, i);
                    changed = true;
                }
                ParaChild::CommentEnd { .. }
                    if is_code_run(children.get(i + 1))
                        && i > 0
                        && is_code_run(children.get(i - 1)) =>
                {
                    children.swap(i, i + 1);
                    changed = true;
                }
                _ => {}
            }
        }
    }
    // Re-merge code runs that ended up adjacent.
    merge_runs(&children)
}

/// Inline code with CommonMark-safe delimiters.
fn render_code_span(text: &str) -> String {
    let mut fence = "`".to_string();
    while text.contains(&fence) {
        fence.push('`');
    }
    if fence.len() > 1 || text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Escape characters that would re-tokenize as markup.
fn escape_markdown(text: &str, in_table: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    for (idx, ch) in chars.iter().enumerate() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '$' | '^' | '~' | '<' => {
                out.push('\\');
                out.push(*ch);
            }
            '{' | '}' => {
                out.push('\\');
                out.push(*ch);
            }
            '=' if chars.get(idx + 1) == Some(&'=') || (idx > 0 && chars.get(idx - 1) == Some(&'=')) => {
                out.push('\\');
                out.push('=');
            }
            '|' if in_table => out.push_str("\\|"),
            _ => out.push(*ch),
        }
    }
    out
}

/// Keep a paragraph's first characters from re-tokenizing as block syntax.
fn guard_block_prefix(text: String) -> String {
    let needs_guard = text.starts_with('#')
        || text.starts_with('>')
        || text.starts_with("- ")
        || text.starts_with("+ ")
        || text.starts_with("---")
        || starts_with_ordered_marker(&text);
    if needs_guard {
        format!("\\{text}")
    } else {
        text
    }
}

fn starts_with_ordered_marker(text: &str) -> bool {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return false;
    }
    text[digits.len()..].starts_with(". ") || text[digits.len()..].starts_with(") ")
}

/// Consecutive code-block paragraphs render as one fenced block.
fn render_code_block(blocks: &[Block]) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        let Block::Paragraph(para) = block else { continue };
        let mut line = String::new();
        for child in &para.children {
            match child {
                ParaChild::Run(run) => line.push_str(&run.text),
                ParaChild::Break => {
                    lines.push(std::mem::take(&mut line));
                }
                _ => {}
            }
        }
        lines.push(line);
    }
    let body = lines.join("\n");
    let mut fence = "```".to_string();
    while body.contains(&fence) {
        fence.push('`');
    }
    format!("{fence}\n{body}\n{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CitationKeyFormat;

    fn render_children(children: Vec<ParaChild>) -> String {
        render_children_with(children, HashMap::new())
    }

    fn render_children_with(children: Vec<ParaChild>, comments: HashMap<u32, Comment>) -> String {
        let model = DocxModel {
            blocks: vec![Block::Paragraph(Para {
                children,
                ..Default::default()
            })],
            ..Default::default()
        };
        let numbering = HashMap::new();
        let mut collector = CitationCollector::new(CitationKeyFormat::AuthorYear);
        let mut warnings = Vec::new();
        render_markdown(&model, &numbering, &comments, &mut collector, &mut warnings)
    }

    fn styled(text: &str, props: RunProps) -> ParaChild {
        ParaChild::Run(Run {
            text: text.to_string(),
            props,
        })
    }

    #[test]
    fn test_bold_italic() {
        let md = render_children(vec![
            styled(
                "bold",
                RunProps {
                    bold: true,
                    ..Default::default()
                },
            ),
            styled(" and ", RunProps::default()),
            styled(
                "it",
                RunProps {
                    italic: true,
                    ..Default::default()
                },
            ),
        ]);
        assert_eq!(md, "**bold** and *it*\n");
    }

    #[test]
    fn test_adjacent_same_props_merge() {
        let bold = RunProps {
            bold: true,
            ..Default::default()
        };
        let md = render_children(vec![styled("one ", bold), styled("two", bold)]);
        assert_eq!(md, "**one two**\n");
    }

    #[test]
    fn test_code_span_rendering() {
        let md = render_children(vec![styled(
            "let x",
            RunProps {
                code: true,
                ..Default::default()
            },
        )]);
        assert_eq!(md, "`let x`\n");
    }

    #[test]
    fn test_code_span_with_backtick() {
        assert_eq!(render_code_span("a ` b"), "`` a ` b ``");
    }

    #[test]
    fn test_highlight_colors() {
        let md = render_children(vec![styled(
            "x",
            RunProps {
                highlight: Some(HighlightColor::Red),
                ..Default::default()
            },
        )]);
        assert_eq!(md, "==x=={red}\n");
        let md = render_children(vec![styled(
            "y",
            RunProps {
                highlight: Some(HighlightColor::Yellow),
                ..Default::default()
            },
        )]);
        assert_eq!(md, "==y==\n");
    }

    #[test]
    fn test_tracked_change_collapse_to_substitution() {
        let md = render_children(vec![
            ParaChild::Del {
                author: "A".to_string(),
                date: "2024-01-01T00:00:00Z".to_string(),
                runs: vec![Run::plain("old")],
            },
            ParaChild::Ins {
                author: "A".to_string(),
                date: "2024-01-01T00:00:00Z".to_string(),
                runs: vec![Run::plain("new")],
            },
        ]);
        assert_eq!(md, "{~~old~>new~~}\n");
    }

    #[test]
    fn test_separate_dates_stay_separate() {
        let md = render_children(vec![
            ParaChild::Del {
                author: "A".to_string(),
                date: "2024-01-01T00:00:00Z".to_string(),
                runs: vec![Run::plain("old")],
            },
            ParaChild::Ins {
                author: "A".to_string(),
                date: "2024-01-02T00:00:00Z".to_string(),
                runs: vec![Run::plain("new")],
            },
        ]);
        assert_eq!(md, "{--old--}{++new++}\n");
    }

    #[test]
    fn test_comment_range_with_ws() {
        let mut comments = HashMap::new();
        comments.insert(
            0,
            Comment {
                id: 0,
                author: String::new(),
                date: String::new(),
                text: "note".to_string(),
            },
        );
        let md = render_children_with(
            vec![
                ParaChild::CommentStart { id: 0 },
                ParaChild::Run(Run::plain("text")),
                ParaChild::CommentEnd { id: 0 },
                ParaChild::Run(Run::plain(" ")),
                ParaChild::CommentRef { id: 0 },
            ],
            comments,
        );
        assert_eq!(md, "{==text==} {>>note<<}\n");
    }

    #[test]
    fn test_empty_comment_is_bare_highlight() {
        let mut comments = HashMap::new();
        comments.insert(
            0,
            Comment {
                id: 0,
                author: String::new(),
                date: String::new(),
                text: String::new(),
            },
        );
        let md = render_children_with(
            vec![
                ParaChild::CommentStart { id: 0 },
                ParaChild::Run(Run::plain("x")),
                ParaChild::CommentEnd { id: 0 },
                ParaChild::CommentRef { id: 0 },
            ],
            comments,
        );
        assert_eq!(md, "{==x==}\n");
    }

    #[test]
    fn test_comment_author_prefix() {
        let mut comments = HashMap::new();
        comments.insert(
            0,
            Comment {
                id: 0,
                author: "Jane".to_string(),
                date: "2024-03-01T14:30:00Z".to_string(),
                text: "check".to_string(),
            },
        );
        let md = render_children_with(
            vec![
                ParaChild::CommentStart { id: 0 },
                ParaChild::CommentEnd { id: 0 },
                ParaChild::CommentRef { id: 0 },
            ],
            comments,
        );
        assert_eq!(md, "{>>Jane (2024-03-01 14:30): check<<}\n");
    }

    #[test]
    fn test_comment_boundary_expands_out_of_code() {
        let code = RunProps {
            code: true,
            ..Default::default()
        };
        let mut comments = HashMap::new();
        comments.insert(
            0,
            Comment {
                id: 0,
                author: String::new(),
                date: String::new(),
                text: "c".to_string(),
            },
        );
        let md = render_children_with(
            vec![
                styled("foo", code),
                ParaChild::CommentStart { id: 0 },
                styled("bar", code),
                ParaChild::CommentEnd { id: 0 },
                ParaChild::CommentRef { id: 0 },
            ],
            comments,
        );
        // Both boundaries end up outside the backticks.
        assert_eq!(md, "{==`foobar`==}{>>c<<}\n");
    }

    #[test]
    fn test_hidden_html_round_trip() {
        let md = render_children(vec![
            ParaChild::Run(Run::plain("a ")),
            ParaChild::HiddenHtml {
                text: " hidden ".to_string(),
            },
            ParaChild::Run(Run::plain(" b")),
        ]);
        assert_eq!(md, "a <!-- hidden --> b\n");
    }

    #[test]
    fn test_autolink_form() {
        let md = render_children(vec![ParaChild::Hyperlink {
            url: "https://example.com".to_string(),
            runs: vec![Run::plain("https://example.com")],
        }]);
        assert_eq!(md, "<https://example.com>\n");
    }

    #[test]
    fn test_escaping_specials() {
        let md = render_children(vec![ParaChild::Run(Run::plain("a *b* `c` ==d=="))]);
        assert_eq!(md, "a \\*b\\* \\`c\\` \\=\\=d\\=\\=\n");
    }

    #[test]
    fn test_inline_math() {
        let md = render_children(vec![ParaChild::Math {
            latex: "x^2".to_string(),
            display: false,
        }]);
        assert_eq!(md, "$x^2$\n");
    }

    #[test]
    fn test_math_with_comment_uses_block_form() {
        let md = render_children(vec![ParaChild::Math {
            latex: "x^2 % note\n".to_string(),
            display: false,
        }]);
        assert_eq!(md, "$$\nx^2 % note\n$$\n");
    }
}
