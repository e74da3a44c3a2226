//!
//! document.xml parsing: OOXML tree -> document model. Field instructions
//! split across runs are reassembled here; hidden carrier runs are decoded;
//! auxiliary parts (styles, numbering, comments, rels) are parsed into flat
//! maps.

use std::collections::HashMap;

use crate::docx::model::{Block, Comment, Field, Para, ParaChild, ParaStyle, Run, RunProps, Table, TableRow};
use crate::docx::xml::XmlElement;
use crate::math;
use crate::tokenizer::CellAlignment;
use crate::tokenizer::highlight::HighlightColor;

/// Flat lookup tables built from the auxiliary parts.
#[derive(Debug, Default)]
pub struct PartMaps {
    pub styles: HashMap<String, ParaStyle>,
    /// numId -> ordered
    pub numbering_ordered: HashMap<u32, bool>,
    pub comments: HashMap<u32, Comment>,
    /// rId -> target
    pub rels: HashMap<String, String>,
}

/// Parse styles.xml into a styleId -> paragraph-style map. Both the style id
/// and the style name are consulted, so renamed template styles still
/// resolve.
pub fn parse_styles(root: &XmlElement) -> HashMap<String, ParaStyle> {
    let mut map = HashMap::new();
    for style in root.children_named("style") {
        let Some(id) = style.attr("styleId") else { continue };
        let mut resolved = ParaStyle::from_style_id(id);
        if resolved == ParaStyle::Normal {
            if let Some(name) = style.find("name").and_then(|n| n.attr("val")) {
                resolved = style_from_name(name);
            }
        }
        map.insert(id.to_string(), resolved);
    }
    map
}

fn style_from_name(name: &str) -> ParaStyle {
    let lower = name.to_lowercase();
    if let Some(level) = lower.strip_prefix("heading ").and_then(|l| l.parse::<u8>().ok()) {
        if (1..=6).contains(&level) {
            return ParaStyle::Heading(level);
        }
    }
    match lower.as_str() {
        "title" => ParaStyle::Title,
        "quote" | "block quote" | "intense quote" => ParaStyle::Quote,
        "code block" | "html preformatted" => ParaStyle::CodeBlock,
        _ => ParaStyle::Normal,
    }
}

/// Parse numbering.xml into numId -> ordered.
pub fn parse_numbering(root: &XmlElement) -> HashMap<u32, bool> {
    let mut abstract_ordered = HashMap::new();
    for abstract_num in root.children_named("abstractNum") {
        let Some(id) = abstract_num.attr("abstractNumId") else { continue };
        let ordered = abstract_num
            .children_named("lvl")
            .next()
            .and_then(|lvl| lvl.find("numFmt"))
            .and_then(|fmt| fmt.attr("val"))
            .map(|val| val != "bullet")
            .unwrap_or(true);
        abstract_ordered.insert(id.to_string(), ordered);
    }

    let mut map = HashMap::new();
    for num in root.children_named("num") {
        let Some(num_id) = num.attr("numId").and_then(|id| id.parse::<u32>().ok()) else {
            continue;
        };
        let ordered = num
            .find("abstractNumId")
            .and_then(|a| a.attr("val"))
            .and_then(|a| abstract_ordered.get(a).copied())
            .unwrap_or(true);
        map.insert(num_id, ordered);
    }
    map
}

/// Parse comments.xml into id -> comment.
pub fn parse_comments(root: &XmlElement) -> HashMap<u32, Comment> {
    let mut map = HashMap::new();
    for comment in root.children_named("comment") {
        let Some(id) = comment.attr("id").and_then(|id| id.parse::<u32>().ok()) else {
            continue;
        };
        let text = comment
            .children_named("p")
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n");
        map.insert(
            id,
            Comment {
                id,
                author: comment.attr("author").unwrap_or_default().to_string(),
                date: comment.attr("date").unwrap_or_default().to_string(),
                text,
            },
        );
    }
    map
}

/// Parse a .rels part into rId -> target.
pub fn parse_rels(root: &XmlElement) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for rel in root.children_named("Relationship") {
        if let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) {
            map.insert(id.to_string(), target.to_string());
        }
    }
    map
}

/// Walk `w:body` into blocks.
pub fn parse_body(body: &XmlElement, maps: &PartMaps, warnings: &mut Vec<String>) -> Vec<Block> {
    let mut blocks = Vec::new();
    for child in body.elements() {
        match child.local_name() {
            "p" => blocks.push(Block::Paragraph(parse_para(child, maps, warnings))),
            "tbl" => blocks.push(Block::Table(parse_table(child, maps, warnings))),
            "sectPr" => {}
            _ => {}
        }
    }
    blocks
}

fn parse_para(el: &XmlElement, maps: &PartMaps, warnings: &mut Vec<String>) -> Para {
    let mut para = Para::default();

    if let Some(ppr) = el.find("pPr") {
        if let Some(style_id) = ppr.find("pStyle").and_then(|s| s.attr("val")) {
            para.style = maps
                .styles
                .get(style_id)
                .copied()
                .unwrap_or_else(|| ParaStyle::from_style_id(style_id));
        }
        if let Some(numpr) = ppr.find("numPr") {
            let num_id = numpr.find("numId").and_then(|n| n.attr("val")).and_then(|v| v.parse().ok());
            let ilvl = numpr
                .find("ilvl")
                .and_then(|n| n.attr("val"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if let Some(num_id) = num_id {
                para.numbering = Some((num_id, ilvl));
            }
        }
        if let Some(jc) = ppr.find("jc").and_then(|j| j.attr("val")) {
            para.alignment = Some(match jc {
                "center" => CellAlignment::Center,
                "right" | "end" => CellAlignment::Right,
                "left" | "start" => CellAlignment::Left,
                _ => CellAlignment::None,
            });
        }
        if ppr.find("pBdr").and_then(|b| b.find("bottom")).is_some() {
            para.horizontal_rule = true;
        }
    }

    let mut field: Option<FieldAccum> = None;
    for child in el.elements() {
        parse_para_child(child, maps, &mut para.children, &mut field, warnings);
    }
    if field.is_some() {
        warnings.push("Field code `begin` without matching `end`; field dropped".to_string());
    }

    para
}

struct FieldAccum {
    instr: String,
    result: Vec<Run>,
    in_result: bool,
    depth: u32,
}

fn parse_para_child(
    el: &XmlElement,
    maps: &PartMaps,
    out: &mut Vec<ParaChild>,
    field: &mut Option<FieldAccum>,
    warnings: &mut Vec<String>,
) {
    match el.local_name() {
        "r" => parse_run_element(el, out, field),
        "hyperlink" => {
            let url = el
                .attr("id")
                .and_then(|rid| maps.rels.get(rid).cloned())
                .or_else(|| el.attr("anchor").map(|a| format!("#{a}")))
                .unwrap_or_default();
            let runs = collect_runs(el);
            out.push(ParaChild::Hyperlink { url, runs });
        }
        "ins" => {
            out.push(ParaChild::Ins {
                author: el.attr("author").unwrap_or_default().to_string(),
                date: el.attr("date").unwrap_or_default().to_string(),
                runs: collect_runs(el),
            });
        }
        "del" => {
            out.push(ParaChild::Del {
                author: el.attr("author").unwrap_or_default().to_string(),
                date: el.attr("date").unwrap_or_default().to_string(),
                runs: collect_del_runs(el),
            });
        }
        "commentRangeStart" => {
            if let Some(id) = el.attr("id").and_then(|id| id.parse().ok()) {
                out.push(ParaChild::CommentStart { id });
            }
        }
        "commentRangeEnd" => {
            if let Some(id) = el.attr("id").and_then(|id| id.parse().ok()) {
                out.push(ParaChild::CommentEnd { id });
            }
        }
        "oMath" => {
            out.push(ParaChild::Math {
                latex: math::omml_tree_to_latex(el),
                display: false,
            });
        }
        "oMathPara" => {
            out.push(ParaChild::Math {
                latex: math::omml_tree_to_latex(el),
                display: true,
            });
        }
        "fldSimple" => {
            if let Some(instr) = el.attr("instr") {
                out.push(ParaChild::Field(Field {
                    instr: instr.to_string(),
                    result: collect_runs(el),
                }));
            }
        }
        "smartTag" | "sdt" => {
            // Transparent containers; Word nests runs inside them.
            let inner = match el.local_name() {
                "sdt" => el.find("sdtContent"),
                _ => Some(el),
            };
            if let Some(inner) = inner {
                for child in inner.elements() {
                    parse_para_child(child, maps, out, field, warnings);
                }
            }
        }
        "bookmarkStart" | "bookmarkEnd" | "proofErr" | "pPr" => {}
        _ => {}
    }
}

/// One `w:r`, feeding either the open field accumulator or the child list.
fn parse_run_element(el: &XmlElement, out: &mut Vec<ParaChild>, field: &mut Option<FieldAccum>) {
    let props = parse_run_props(el.find("rPr"));

    for child in el.elements() {
        match child.local_name() {
            "fldChar" => match child.attr("fldCharType") {
                Some("begin") => match field {
                    Some(accum) => accum.depth += 1,
                    None => {
                        *field = Some(FieldAccum {
                            instr: String::new(),
                            result: Vec::new(),
                            in_result: false,
                            depth: 1,
                        });
                    }
                },
                Some("separate") => {
                    if let Some(accum) = field {
                        if accum.depth == 1 {
                            accum.in_result = true;
                        }
                    }
                }
                Some("end") => {
                    let closed = match field.as_mut() {
                        Some(accum) => {
                            accum.depth -= 1;
                            accum.depth == 0
                        }
                        None => false,
                    };
                    if closed {
                        let accum = field.take().expect("field accumulator present");
                        out.push(ParaChild::Field(Field {
                            instr: accum.instr,
                            result: accum.result,
                        }));
                    }
                }
                _ => {}
            },
            "instrText" => {
                if let Some(accum) = field {
                    if accum.depth == 1 && !accum.in_result {
                        accum.instr.push_str(&child.text());
                    }
                }
            }
            "t" => {
                let text = child.text();
                match field {
                    Some(accum) if accum.in_result => accum.result.push(Run {
                        text,
                        props,
                    }),
                    Some(_) => {}
                    None => push_text(out, text, props),
                }
            }
            "br" => {
                if field.is_none() {
                    out.push(ParaChild::Break);
                }
            }
            "commentReference" => {
                if let Some(id) = child.attr("id").and_then(|id| id.parse().ok()) {
                    out.push(ParaChild::CommentRef { id });
                }
            }
            "tab" => {
                if field.is_none() {
                    push_text(out, "\t".to_string(), props);
                }
            }
            _ => {}
        }
    }
}

/// Classify a text run: hidden HTML carrier, other hidden text, or visible.
fn push_text(out: &mut Vec<ParaChild>, text: String, props: RunProps) {
    if props.vanish {
        if let Some(payload) = text.strip_prefix('\u{200b}') {
            if let Some(inner) = payload.strip_prefix("<!--").and_then(|p| p.strip_suffix("-->")) {
                out.push(ParaChild::HiddenHtml {
                    text: inner.to_string(),
                });
                return;
            }
        }
        // Hidden but not a recognized carrier: keep it hidden.
        out.push(ParaChild::Run(Run { text, props }));
        return;
    }
    out.push(ParaChild::Run(Run { text, props }));
}

fn toggle_on(el: Option<&XmlElement>) -> bool {
    match el {
        None => false,
        Some(el) => !matches!(el.attr("val"), Some("0") | Some("false") | Some("none")),
    }
}

fn parse_run_props(rpr: Option<&XmlElement>) -> RunProps {
    let Some(rpr) = rpr else {
        return RunProps::default();
    };
    let vert_align = rpr.find("vertAlign").and_then(|v| v.attr("val"));
    RunProps {
        bold: toggle_on(rpr.find("b")),
        italic: toggle_on(rpr.find("i")),
        underline: toggle_on(rpr.find("u")),
        strike: toggle_on(rpr.find("strike")),
        sup: vert_align == Some("superscript"),
        sub: vert_align == Some("subscript"),
        code: rpr
            .find("rStyle")
            .and_then(|s| s.attr("val"))
            .is_some_and(|val| val == "CodeChar" || val == "Code" || val == "HTMLCode"),
        vanish: toggle_on(rpr.find("vanish")),
        highlight: rpr
            .find("highlight")
            .and_then(|h| h.attr("val"))
            .and_then(HighlightColor::from_w_val),
    }
}

/// All visible text runs under an element (hyperlinks, tracked changes).
fn collect_runs(el: &XmlElement) -> Vec<Run> {
    let mut runs = Vec::new();
    for r in el.children_named("r") {
        let props = parse_run_props(r.find("rPr"));
        for child in r.elements() {
            if child.local_name() == "t" {
                runs.push(Run {
                    text: child.text(),
                    props,
                });
            }
        }
    }
    runs
}

/// Deleted text runs (`w:delText`) under a `w:del`.
fn collect_del_runs(el: &XmlElement) -> Vec<Run> {
    let mut runs = Vec::new();
    for r in el.children_named("r") {
        let props = parse_run_props(r.find("rPr"));
        for child in r.elements() {
            if child.local_name() == "delText" {
                runs.push(Run {
                    text: child.text(),
                    props,
                });
            }
        }
    }
    runs
}

fn parse_table(el: &XmlElement, maps: &PartMaps, warnings: &mut Vec<String>) -> Table {
    let mut rows = Vec::new();
    let mut complex = false;
    let mut alignments = Vec::new();

    for (row_idx, tr) in el.children_named("tr").enumerate() {
        let header = tr
            .find("trPr")
            .map(|pr| pr.find("tblHeader").is_some())
            .unwrap_or(false);
        let mut cells = Vec::new();
        for tc in tr.children_named("tc") {
            if let Some(tcpr) = tc.find("tcPr") {
                if tcpr.find("gridSpan").is_some() || tcpr.find("vMerge").is_some() {
                    complex = true;
                }
            }
            let blocks: Vec<Block> = tc
                .elements()
                .filter(|child| child.local_name() == "p")
                .map(|p| Block::Paragraph(parse_para(p, maps, warnings)))
                .collect();
            if row_idx == 0 {
                let alignment = blocks
                    .iter()
                    .find_map(|b| match b {
                        Block::Paragraph(p) => p.alignment,
                        _ => None,
                    })
                    .unwrap_or(CellAlignment::None);
                alignments.push(alignment);
            }
            cells.push(blocks);
        }
        rows.push(TableRow { header, cells });
    }

    // Column alignment lives on body-row paragraphs; prefer the first
    // body row over the header when both exist.
    if rows.len() > 1 {
        if let Some(body_row) = rows.iter().find(|r| !r.header) {
            let body_alignments: Vec<CellAlignment> = body_row
                .cells
                .iter()
                .map(|cell| {
                    cell.iter()
                        .find_map(|b| match b {
                            Block::Paragraph(p) => p.alignment,
                            _ => None,
                        })
                        .unwrap_or(CellAlignment::None)
                })
                .collect();
            if body_alignments.len() == alignments.len() {
                alignments = body_alignments;
            }
        }
    }

    Table {
        alignments,
        rows,
        complex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::parse_tree;

    fn para_of(xml: &str) -> Para {
        let tree = parse_tree(xml).unwrap();
        let mut warnings = Vec::new();
        parse_para(&tree, &PartMaps::default(), &mut warnings)
    }

    #[test]
    fn test_simple_run() {
        let para = para_of(r#"<w:p><w:r><w:t>hello</w:t></w:r></w:p>"#);
        assert_eq!(para.children, vec![ParaChild::Run(Run::plain("hello"))]);
    }

    #[test]
    fn test_run_props() {
        let para = para_of(
            r#"<w:p><w:r><w:rPr><w:b/><w:i/><w:u w:val="single"/></w:rPr><w:t>x</w:t></w:r></w:p>"#,
        );
        match &para.children[0] {
            ParaChild::Run(run) => {
                assert!(run.props.bold && run.props.italic && run.props.underline);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_toggle_off_values() {
        let para = para_of(r#"<w:p><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>x</w:t></w:r></w:p>"#);
        match &para.children[0] {
            ParaChild::Run(run) => assert!(!run.props.bold),
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_field_reassembly_across_runs() {
        let para = para_of(
            r#"<w:p>
                <w:r><w:fldChar w:fldCharType="begin"/></w:r>
                <w:r><w:instrText xml:space="preserve"> ADDIN ZOTERO_ITEM</w:instrText></w:r>
                <w:r><w:instrText xml:space="preserve"> CSL_CITATION {"a":1}</w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                <w:r><w:t>(Smith 2020)</w:t></w:r>
                <w:r><w:fldChar w:fldCharType="end"/></w:r>
            </w:p>"#,
        );
        match &para.children[0] {
            ParaChild::Field(field) => {
                assert_eq!(field.instr, " ADDIN ZOTERO_ITEM CSL_CITATION {\"a\":1}");
                assert!(field.is_zotero_citation());
                assert_eq!(field.result, vec![Run::plain("(Smith 2020)")]);
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_field_dropped_with_warning() {
        let tree = parse_tree(r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:t>x</w:t></w:r></w:p>"#)
            .unwrap();
        let mut warnings = Vec::new();
        let para = parse_para(&tree, &PartMaps::default(), &mut warnings);
        assert!(para.children.is_empty());
        assert!(warnings.iter().any(|w| w.contains("without matching `end`")));
    }

    #[test]
    fn test_hidden_html_carrier() {
        let para = para_of(
            "<w:p><w:r><w:rPr><w:vanish/></w:rPr><w:t xml:space=\"preserve\">\u{200b}&lt;!-- note --&gt;</w:t></w:r></w:p>",
        );
        assert_eq!(
            para.children,
            vec![ParaChild::HiddenHtml {
                text: " note ".to_string()
            }]
        );
    }

    #[test]
    fn test_tracked_changes() {
        let para = para_of(
            r#"<w:p>
                <w:del w:id="1" w:author="A" w:date="2024-01-01T00:00:00Z"><w:r><w:delText>old</w:delText></w:r></w:del>
                <w:ins w:id="2" w:author="A" w:date="2024-01-01T00:00:00Z"><w:r><w:t>new</w:t></w:r></w:ins>
            </w:p>"#,
        );
        assert!(matches!(&para.children[0], ParaChild::Del { runs, .. } if runs[0].text == "old"));
        assert!(matches!(&para.children[1], ParaChild::Ins { runs, .. } if runs[0].text == "new"));
    }

    #[test]
    fn test_comment_anchors() {
        let para = para_of(
            r#"<w:p><w:commentRangeStart w:id="3"/><w:r><w:t>x</w:t></w:r><w:commentRangeEnd w:id="3"/><w:r><w:commentReference w:id="3"/></w:r></w:p>"#,
        );
        assert!(matches!(para.children[0], ParaChild::CommentStart { id: 3 }));
        assert!(matches!(para.children[2], ParaChild::CommentEnd { id: 3 }));
        assert!(matches!(para.children[3], ParaChild::CommentRef { id: 3 }));
    }

    #[test]
    fn test_math_element() {
        let para = para_of(
            r#"<w:p><m:oMath><m:r><m:t>x</m:t></m:r></m:oMath></w:p>"#,
        );
        assert_eq!(
            para.children,
            vec![ParaChild::Math {
                latex: "x".to_string(),
                display: false
            }]
        );
    }

    #[test]
    fn test_styles_parsing() {
        let tree = parse_tree(
            r#"<w:styles><w:style w:type="paragraph" w:styleId="H1"><w:name w:val="heading 1"/></w:style><w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/></w:style></w:styles>"#,
        )
        .unwrap();
        let styles = parse_styles(&tree);
        assert_eq!(styles.get("H1"), Some(&ParaStyle::Heading(1)));
        assert_eq!(styles.get("Quote"), Some(&ParaStyle::Quote));
    }

    #[test]
    fn test_numbering_parsing() {
        let tree = parse_tree(
            r#"<w:numbering>
                <w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
                <w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
                <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
                <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
            </w:numbering>"#,
        )
        .unwrap();
        let map = parse_numbering(&tree);
        assert_eq!(map.get(&1), Some(&false));
        assert_eq!(map.get(&2), Some(&true));
    }

    #[test]
    fn test_comments_parsing() {
        let tree = parse_tree(
            r#"<w:comments><w:comment w:id="0" w:author="Jane" w:date="2024-03-01T14:30:00Z"><w:p><w:r><w:t>first</w:t></w:r></w:p><w:p><w:r><w:t>second</w:t></w:r></w:p></w:comment></w:comments>"#,
        )
        .unwrap();
        let map = parse_comments(&tree);
        let comment = map.get(&0).unwrap();
        assert_eq!(comment.author, "Jane");
        assert_eq!(comment.text, "first\nsecond");
    }

    #[test]
    fn test_complex_table_detection() {
        let tree = parse_tree(
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        )
        .unwrap();
        let mut warnings = Vec::new();
        let table = parse_table(&tree, &PartMaps::default(), &mut warnings);
        assert!(table.complex);
    }
}
