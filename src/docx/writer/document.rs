//!
//! document.xml emission from the document model. Hyperlink relationship
//! ids are allocated on first use of a URL; revision ids are sequential in
//! document order.

use std::collections::HashMap;

use crate::docx::model::{Block, DocxModel, Para, ParaChild, ParaStyle, Run, RunProps, Table};
use crate::docx::xml::XmlBuilder;
use crate::math;
use crate::tokenizer::CellAlignment;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_M: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";

/// Hyperlink relationship registry; one rId per distinct URL.
#[derive(Debug, Default)]
pub struct RelRegistry {
    next: u32,
    by_url: HashMap<String, String>,
    /// `(rId, url)` pairs in allocation order.
    pub hyperlinks: Vec<(String, String)>,
}

impl RelRegistry {
    pub fn new(first_free_id: u32) -> Self {
        Self {
            next: first_free_id,
            ..Default::default()
        }
    }

    fn hyperlink(&mut self, url: &str) -> String {
        if let Some(rid) = self.by_url.get(url) {
            return rid.clone();
        }
        let rid = format!("rId{}", self.next);
        self.next += 1;
        self.by_url.insert(url.to_string(), rid.clone());
        self.hyperlinks.push((rid.clone(), url.to_string()));
        rid
    }
}

struct Emitter<'a> {
    xml: XmlBuilder,
    rels: &'a mut RelRegistry,
    next_revision_id: u32,
    warnings: Vec<String>,
}

/// Generate document.xml. Returns the XML and math-conversion warnings.
pub fn generate_document_xml(model: &DocxModel, rels: &mut RelRegistry) -> (String, Vec<String>) {
    let mut emitter = Emitter {
        xml: XmlBuilder::with_capacity(16 * 1024),
        rels,
        next_revision_id: 1,
        warnings: Vec::new(),
    };

    emitter
        .xml
        .raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    emitter.xml.open_with(
        "w:document",
        &[("xmlns:w", NS_W), ("xmlns:r", NS_R), ("xmlns:m", NS_M)],
    );
    emitter.xml.open("w:body");

    for block in &model.blocks {
        emitter.emit_block(block);
    }

    emitter
        .xml
        .open("w:sectPr")
        .empty_with("w:pgSz", &[("w:w", "12240"), ("w:h", "15840")])
        .empty_with(
            "w:pgMar",
            &[
                ("w:top", "1440"),
                ("w:right", "1440"),
                ("w:bottom", "1440"),
                ("w:left", "1440"),
            ],
        )
        .close("w:sectPr");
    emitter.xml.close("w:body").close("w:document");

    (emitter.xml.into_string(), emitter.warnings)
}

fn jc_val(alignment: CellAlignment) -> Option<&'static str> {
    match alignment {
        CellAlignment::None => None,
        CellAlignment::Left => Some("left"),
        CellAlignment::Center => Some("center"),
        CellAlignment::Right => Some("right"),
    }
}

impl Emitter<'_> {
    fn revision_id(&mut self) -> String {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        id.to_string()
    }

    fn emit_block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(para) => self.emit_para(para),
            Block::Table(table) => self.emit_table(table),
        }
    }

    fn emit_para(&mut self, para: &Para) {
        self.xml.open("w:p");

        let needs_ppr = para.style != ParaStyle::Normal
            || para.numbering.is_some()
            || para.alignment.is_some_and(|a| jc_val(a).is_some())
            || para.horizontal_rule;
        if needs_ppr {
            self.xml.open("w:pPr");
            if para.style != ParaStyle::Normal {
                self.xml.empty_with("w:pStyle", &[("w:val", &para.style.style_id())]);
            }
            if let Some((num_id, ilvl)) = para.numbering {
                self.xml
                    .open("w:numPr")
                    .empty_with("w:ilvl", &[("w:val", &ilvl.to_string())])
                    .empty_with("w:numId", &[("w:val", &num_id.to_string())])
                    .close("w:numPr");
            }
            if para.horizontal_rule {
                self.xml
                    .open("w:pBdr")
                    .empty_with(
                        "w:bottom",
                        &[("w:val", "single"), ("w:sz", "6"), ("w:space", "1"), ("w:color", "auto")],
                    )
                    .close("w:pBdr");
            }
            if let Some(jc) = para.alignment.and_then(jc_val) {
                self.xml.empty_with("w:jc", &[("w:val", jc)]);
            }
            self.xml.close("w:pPr");
        }

        for child in &para.children {
            self.emit_child(child);
        }

        self.xml.close("w:p");
    }

    fn emit_child(&mut self, child: &ParaChild) {
        match child {
            ParaChild::Run(run) => self.emit_run(run, false),
            ParaChild::Break => {
                self.xml.open("w:r").empty("w:br").close("w:r");
            }
            ParaChild::Hyperlink { url, runs } => {
                let rid = self.rels.hyperlink(url);
                self.xml
                    .open_with("w:hyperlink", &[("r:id", rid.as_str()), ("w:history", "1")]);
                for run in runs {
                    self.emit_styled_run(run, Some("Hyperlink"));
                }
                self.xml.close("w:hyperlink");
            }
            ParaChild::Math { latex, display } => {
                let (omml, warnings) = math::latex_to_omml(latex, *display);
                self.warnings.extend(warnings);
                self.xml.raw(&omml);
            }
            ParaChild::Ins { author, date, runs } => {
                let rev = self.revision_id();
                self.xml.open_with(
                    "w:ins",
                    &[("w:id", rev.as_str()), ("w:author", author), ("w:date", date)],
                );
                for run in runs {
                    self.emit_run(run, false);
                }
                self.xml.close("w:ins");
            }
            ParaChild::Del { author, date, runs } => {
                let rev = self.revision_id();
                self.xml.open_with(
                    "w:del",
                    &[("w:id", rev.as_str()), ("w:author", author), ("w:date", date)],
                );
                for run in runs {
                    self.emit_run(run, true);
                }
                self.xml.close("w:del");
            }
            ParaChild::CommentStart { id } => {
                self.xml
                    .empty_with("w:commentRangeStart", &[("w:id", id.to_string().as_str())]);
            }
            ParaChild::CommentEnd { id } => {
                self.xml
                    .empty_with("w:commentRangeEnd", &[("w:id", id.to_string().as_str())]);
            }
            ParaChild::CommentRef { id } => {
                self.xml
                    .open("w:r")
                    .empty_with("w:commentReference", &[("w:id", id.to_string().as_str())])
                    .close("w:r");
            }
            ParaChild::Field(field) => {
                self.xml
                    .open("w:r")
                    .empty_with("w:fldChar", &[("w:fldCharType", "begin")])
                    .close("w:r");
                self.xml
                    .open("w:r")
                    .open_with("w:instrText", &[("xml:space", "preserve")])
                    .text(&field.instr)
                    .close("w:instrText")
                    .close("w:r");
                self.xml
                    .open("w:r")
                    .empty_with("w:fldChar", &[("w:fldCharType", "separate")])
                    .close("w:r");
                for run in &field.result {
                    self.emit_run(run, false);
                }
                self.xml
                    .open("w:r")
                    .empty_with("w:fldChar", &[("w:fldCharType", "end")])
                    .close("w:r");
            }
            ParaChild::HiddenHtml { text } => {
                self.xml
                    .open("w:r")
                    .open("w:rPr")
                    .empty("w:vanish")
                    .close("w:rPr")
                    .open_with("w:t", &[("xml:space", "preserve")])
                    .text(&format!("\u{200b}<!--{text}-->"))
                    .close("w:t")
                    .close("w:r");
            }
        }
    }

    fn emit_run(&mut self, run: &Run, deleted: bool) {
        self.emit_run_inner(run, deleted, None);
    }

    fn emit_styled_run(&mut self, run: &Run, rstyle: Option<&str>) {
        self.emit_run_inner(run, false, rstyle);
    }

    fn emit_run_inner(&mut self, run: &Run, deleted: bool, rstyle: Option<&str>) {
        self.xml.open("w:r");
        let props = run.props;
        let has_props = rstyle.is_some() || !props.is_plain();
        if has_props {
            self.xml.open("w:rPr");
            if props.code {
                // Code styling wins; all other toggles are dropped.
                self.xml.empty_with("w:rStyle", &[("w:val", "CodeChar")]);
            } else {
                if let Some(style) = rstyle {
                    self.xml.empty_with("w:rStyle", &[("w:val", style)]);
                }
                emit_toggles(&mut self.xml, &props);
            }
            self.xml.close("w:rPr");
        }
        let tag = if deleted { "w:delText" } else { "w:t" };
        self.xml.open_with(tag, &[("xml:space", "preserve")]);
        self.xml.text(&run.text);
        self.xml.close(tag);
        self.xml.close("w:r");
    }

    fn emit_table(&mut self, table: &Table) {
        self.xml.open("w:tbl").open("w:tblPr").empty_with("w:tblStyle", &[("w:val", "TableGrid")]);
        self.xml.empty_with("w:tblW", &[("w:w", "0"), ("w:type", "auto")]);
        self.xml.open("w:tblBorders");
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            self.xml
                .empty_with(side, &[("w:val", "single"), ("w:sz", "4"), ("w:color", "auto")]);
        }
        self.xml.close("w:tblBorders").close("w:tblPr").empty("w:tblGrid");

        for row in &table.rows {
            self.xml.open("w:tr");
            if row.header {
                self.xml.open("w:trPr").empty("w:tblHeader").close("w:trPr");
            }
            for cell in &row.cells {
                self.xml.open("w:tc").open("w:tcPr").close("w:tcPr");
                if cell.is_empty() {
                    self.xml.open("w:p").close("w:p");
                }
                for block in cell {
                    self.emit_block(block);
                }
                self.xml.close("w:tc");
            }
            self.xml.close("w:tr");
        }

        self.xml.close("w:tbl");
    }
}

fn emit_toggles(xml: &mut XmlBuilder, props: &RunProps) {
    if props.bold {
        xml.empty("w:b");
    }
    if props.italic {
        xml.empty("w:i");
    }
    if props.strike {
        xml.empty("w:strike");
    }
    if props.underline {
        xml.empty_with("w:u", &[("w:val", "single")]);
    }
    if props.vanish {
        xml.empty("w:vanish");
    }
    if props.sup {
        xml.empty_with("w:vertAlign", &[("w:val", "superscript")]);
    }
    if props.sub {
        xml.empty_with("w:vertAlign", &[("w:val", "subscript")]);
    }
    if let Some(color) = props.highlight {
        xml.empty_with("w:highlight", &[("w:val", color.w_val())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::model::{Comment, Field};

    fn emit(model: &DocxModel) -> String {
        let mut rels = RelRegistry::new(10);
        generate_document_xml(model, &mut rels).0
    }

    fn para_model(children: Vec<ParaChild>) -> DocxModel {
        DocxModel {
            blocks: vec![Block::Paragraph(Para {
                children,
                ..Default::default()
            })],
            comments: Vec::new(),
            numberings: Vec::new(),
        }
    }

    #[test]
    fn test_plain_run() {
        let xml = emit(&para_model(vec![ParaChild::Run(Run::plain("hi"))]));
        assert!(xml.contains("<w:r><w:t xml:space=\"preserve\">hi</w:t></w:r>"));
    }

    #[test]
    fn test_code_run_drops_other_toggles() {
        let run = Run {
            text: "x".to_string(),
            props: RunProps {
                code: true,
                bold: true,
                highlight: Some(crate::tokenizer::highlight::HighlightColor::Red),
                ..Default::default()
            },
        };
        let xml = emit(&para_model(vec![ParaChild::Run(run)]));
        assert!(xml.contains("w:rStyle w:val=\"CodeChar\""));
        assert!(!xml.contains("<w:b/>"));
        assert!(!xml.contains("w:highlight"));
    }

    #[test]
    fn test_hyperlink_dedup() {
        let mut rels = RelRegistry::new(10);
        let model = para_model(vec![
            ParaChild::Hyperlink {
                url: "https://a.example".to_string(),
                runs: vec![Run::plain("one")],
            },
            ParaChild::Hyperlink {
                url: "https://a.example".to_string(),
                runs: vec![Run::plain("two")],
            },
        ]);
        let (xml, _) = generate_document_xml(&model, &mut rels);
        assert_eq!(rels.hyperlinks.len(), 1);
        assert_eq!(xml.matches("r:id=\"rId10\"").count(), 2);
    }

    #[test]
    fn test_deletion_uses_deltext() {
        let xml = emit(&para_model(vec![ParaChild::Del {
            author: "A".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
            runs: vec![Run::plain("gone")],
        }]));
        assert!(xml.contains("<w:del "));
        assert!(xml.contains("<w:delText xml:space=\"preserve\">gone</w:delText>"));
    }

    #[test]
    fn test_comment_anchor_sequence() {
        let xml = emit(&para_model(vec![
            ParaChild::CommentStart { id: 0 },
            ParaChild::Run(Run::plain("anchored")),
            ParaChild::CommentEnd { id: 0 },
            ParaChild::CommentRef { id: 0 },
        ]));
        let start = xml.find("commentRangeStart").unwrap();
        let end = xml.find("commentRangeEnd").unwrap();
        let reference = xml.find("commentReference").unwrap();
        assert!(start < end && end < reference);
    }

    #[test]
    fn test_field_sequence() {
        let xml = emit(&para_model(vec![ParaChild::Field(Field {
            instr: " ADDIN ZOTERO_ITEM CSL_CITATION {}".to_string(),
            result: vec![Run::plain("(Smith 2020)")],
        })]));
        let begin = xml.find("w:fldCharType=\"begin\"").unwrap();
        let instr = xml.find("w:instrText").unwrap();
        let sep = xml.find("w:fldCharType=\"separate\"").unwrap();
        let end = xml.find("w:fldCharType=\"end\"").unwrap();
        assert!(begin < instr && instr < sep && sep < end);
    }

    #[test]
    fn test_hidden_html_carrier_is_bit_exact() {
        let xml = emit(&para_model(vec![ParaChild::HiddenHtml {
            text: " hidden ".to_string(),
        }]));
        // Angle brackets are XML-escaped inside w:t; the decoded text is the
        // bit-exact carrier payload.
        assert!(xml.contains(
            "<w:r><w:rPr><w:vanish/></w:rPr><w:t xml:space=\"preserve\">\u{200b}&lt;!-- hidden --&gt;</w:t></w:r>"
        ));
    }

    #[test]
    fn test_inline_math_embeds_omath() {
        let xml = emit(&para_model(vec![ParaChild::Math {
            latex: "x^2".to_string(),
            display: false,
        }]));
        assert!(xml.contains("<m:oMath>"));
        assert!(!xml.contains("oMathPara"));
    }

    #[test]
    fn test_comments_model_not_referenced() {
        // comments.xml emission is separate; document only holds anchors
        let model = DocxModel {
            comments: vec![Comment {
                id: 0,
                author: "A".to_string(),
                date: "2024-01-01T00:00:00Z".to_string(),
                text: "t".to_string(),
            }],
            ..para_model(vec![])
        };
        let xml = emit(&model);
        assert!(!xml.contains("w:comment "));
    }
}
