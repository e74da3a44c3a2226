//!
//! Math tree -> OMML emission. Comments and line continuations become
//! zero-width hidden runs (`m:nor` + U+200B prefix) so they survive the trip
//! through Word untouched.

use crate::docx::xml::XmlBuilder;

use super::parser::{MathNode, MatrixKind};

/// Zero-width space marking a hidden carrier run.
pub const CARRIER_PREFIX: char = '\u{200b}';

/// Render a node sequence into `out` (contents of an `m:oMath`).
pub fn render_nodes(out: &mut XmlBuilder, nodes: &[MathNode]) {
    for node in nodes {
        render_node(out, node);
    }
}

fn render_run(out: &mut XmlBuilder, text: &str) {
    out.open("m:r")
        .open_with("m:t", &[("xml:space", "preserve")])
        .text(text)
        .close("m:t")
        .close("m:r");
}

/// `<m:r><m:rPr><m:nor/></m:rPr><m:t xml:space="preserve">\u{200B}...</m:t></m:r>`
fn render_hidden_run(out: &mut XmlBuilder, payload: &str) {
    out.open("m:r")
        .open("m:rPr")
        .empty("m:nor")
        .close("m:rPr")
        .open_with("m:t", &[("xml:space", "preserve")]);
    let mut text = String::with_capacity(payload.len() + 3);
    text.push(CARRIER_PREFIX);
    text.push_str(payload);
    out.text(&text).close("m:t").close("m:r");
}

fn render_node(out: &mut XmlBuilder, node: &MathNode) {
    match node {
        MathNode::Run(text) | MathNode::Literal(text) => render_run(out, text),
        MathNode::Group(children) => render_nodes(out, children),
        MathNode::Comment { ws, text } => {
            render_hidden_run(out, &format!("{ws}%{text}"));
        }
        MathNode::LineContinuation { ws } => {
            render_hidden_run(out, &format!("{ws}%\n"));
        }
        MathNode::Frac { num, den } => {
            out.open("m:f").open("m:num");
            render_nodes(out, num);
            out.close("m:num").open("m:den");
            render_nodes(out, den);
            out.close("m:den").close("m:f");
        }
        MathNode::Sup { base, sup } => {
            out.open("m:sSup").open("m:e");
            render_nodes(out, base);
            out.close("m:e").open("m:sup");
            render_nodes(out, sup);
            out.close("m:sup").close("m:sSup");
        }
        MathNode::Sub { base, sub } => {
            out.open("m:sSub").open("m:e");
            render_nodes(out, base);
            out.close("m:e").open("m:sub");
            render_nodes(out, sub);
            out.close("m:sub").close("m:sSub");
        }
        MathNode::SubSup { base, sub, sup } => {
            out.open("m:sSubSup").open("m:e");
            render_nodes(out, base);
            out.close("m:e").open("m:sub");
            render_nodes(out, sub);
            out.close("m:sub").open("m:sup");
            render_nodes(out, sup);
            out.close("m:sup").close("m:sSubSup");
        }
        MathNode::Sqrt { degree, body } => {
            out.open("m:rad");
            match degree {
                Some(degree) => {
                    out.open("m:deg");
                    render_nodes(out, degree);
                    out.close("m:deg");
                }
                None => {
                    out.open("m:radPr")
                        .empty_with("m:degHide", &[("m:val", "1")])
                        .close("m:radPr")
                        .empty("m:deg");
                }
            }
            out.open("m:e");
            render_nodes(out, body);
            out.close("m:e").close("m:rad");
        }
        MathNode::Nary { chr, sub, sup } => {
            out.open("m:nary")
                .open("m:naryPr")
                .empty_with("m:chr", &[("m:val", chr)])
                .empty_with("m:limLoc", &[("m:val", "undOvr")])
                .close("m:naryPr")
                .open("m:sub");
            render_nodes(out, sub);
            out.close("m:sub").open("m:sup");
            render_nodes(out, sup);
            out.close("m:sup").empty("m:e").close("m:nary");
        }
        MathNode::Delim { open, close, body } => {
            out.open("m:d")
                .open("m:dPr")
                .empty_with("m:begChr", &[("m:val", open)])
                .empty_with("m:endChr", &[("m:val", close)])
                .close("m:dPr")
                .open("m:e");
            render_nodes(out, body);
            out.close("m:e").close("m:d");
        }
        MathNode::Func { name, body } => {
            out.open("m:func")
                .open("m:fName")
                .open("m:r")
                .open_with("m:t", &[("xml:space", "preserve")])
                .text(name)
                .close("m:t")
                .close("m:r")
                .close("m:fName")
                .open("m:e");
            render_nodes(out, body);
            out.close("m:e").close("m:func");
        }
        MathNode::Accent { chr, base } => {
            out.open("m:acc")
                .open("m:accPr")
                .empty_with("m:chr", &[("m:val", chr)])
                .close("m:accPr")
                .open("m:e");
            render_nodes(out, base);
            out.close("m:e").close("m:acc");
        }
        MathNode::Matrix { kind, rows } => {
            let fence = match kind {
                MatrixKind::Plain => None,
                MatrixKind::Paren => Some(("(", ")")),
                MatrixKind::Bracket => Some(("[", "]")),
            };
            if let Some((open, close)) = fence {
                out.open("m:d")
                    .open("m:dPr")
                    .empty_with("m:begChr", &[("m:val", open)])
                    .empty_with("m:endChr", &[("m:val", close)])
                    .close("m:dPr")
                    .open("m:e");
            }
            out.open("m:m");
            for row in rows {
                out.open("m:mr");
                for cell in row {
                    out.open("m:e");
                    render_nodes(out, cell);
                    out.close("m:e");
                }
                out.close("m:mr");
            }
            out.close("m:m");
            if fence.is_some() {
                out.close("m:e").close("m:d");
            }
        }
        MathNode::EqArray { rows } => {
            out.open("m:eqArr");
            for row in rows {
                out.open("m:e");
                render_nodes(out, row);
                out.close("m:e");
            }
            out.close("m:eqArr");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::lexer::tokenize;
    use crate::math::parser::parse;

    fn omml_of(latex: &str) -> String {
        let (nodes, _) = parse(tokenize(latex));
        let mut out = XmlBuilder::with_capacity(256);
        render_nodes(&mut out, &nodes);
        out.into_string()
    }

    #[test]
    fn test_fraction_shape() {
        let xml = omml_of(r"\frac{1}{2}");
        assert_eq!(
            xml,
            "<m:f><m:num><m:r><m:t xml:space=\"preserve\">1</m:t></m:r></m:num>\
             <m:den><m:r><m:t xml:space=\"preserve\">2</m:t></m:r></m:den></m:f>"
        );
    }

    #[test]
    fn test_superscript_shape() {
        let xml = omml_of("x^2");
        assert!(xml.starts_with("<m:sSup><m:e>"));
        assert!(xml.contains("<m:sup>"));
    }

    #[test]
    fn test_comment_becomes_hidden_run() {
        let xml = omml_of("x^2 % note");
        assert!(xml.contains("<m:nor/>"));
        assert!(xml.contains("\u{200b} % note"));
    }

    #[test]
    fn test_line_continuation_payload() {
        let xml = omml_of("a+%\nb");
        assert!(xml.contains("\u{200b}%\n"));
    }

    #[test]
    fn test_nary_has_chr() {
        let xml = omml_of(r"\sum_{i}^{n}");
        assert!(xml.contains("m:chr m:val=\"∑\""));
        assert!(xml.contains("<m:sub><m:r>"));
    }

    #[test]
    fn test_sqrt_deghide() {
        let xml = omml_of(r"\sqrt{x}");
        assert!(xml.contains("m:degHide"));
        let xml = omml_of(r"\sqrt[3]{x}");
        assert!(!xml.contains("m:degHide"));
        assert!(xml.contains("<m:deg>"));
    }

    #[test]
    fn test_text_escaping() {
        let xml = omml_of("a&b");
        assert!(xml.contains("a&amp;b"));
    }
}
