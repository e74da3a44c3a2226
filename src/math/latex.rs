//!
//! OMML -> LaTeX. Walks a parsed OMML tree; hidden carrier runs (m:nor +
//! U+200B) are decoded back into `%` comments and line continuations with
//! their original whitespace.

use crate::docx::xml::XmlElement;

use super::omml::CARRIER_PREFIX;
use super::symbols;

/// Render the contents of an `m:oMath` (or `m:oMathPara`) element.
pub fn render(el: &XmlElement) -> String {
    let mut out = String::new();
    render_children(el, &mut out);
    out
}

fn render_children(el: &XmlElement, out: &mut String) {
    for child in el.elements() {
        render_element(child, out);
    }
}

fn render_element(el: &XmlElement, out: &mut String) {
    match el.local_name() {
        "oMath" | "oMathPara" => render_children(el, out),
        "r" => render_run(el, out),
        "f" => {
            out.push_str("\\frac{");
            render_opt(el.find("num"), out);
            out.push_str("}{");
            render_opt(el.find("den"), out);
            out.push('}');
        }
        "sSup" => {
            render_base(el.find("e"), out);
            out.push('^');
            render_script(el.find("sup"), out);
        }
        "sSub" => {
            render_base(el.find("e"), out);
            out.push('_');
            render_script(el.find("sub"), out);
        }
        "sSubSup" => {
            render_base(el.find("e"), out);
            out.push('_');
            render_script(el.find("sub"), out);
            out.push('^');
            render_script(el.find("sup"), out);
        }
        "rad" => {
            let hidden = el
                .find("radPr")
                .and_then(|pr| pr.find("degHide"))
                .and_then(|dh| dh.attr("val"))
                .is_some_and(|v| v == "1" || v == "true" || v == "on");
            out.push_str("\\sqrt");
            if !hidden {
                if let Some(deg) = el.find("deg") {
                    let rendered = render(deg);
                    if !rendered.is_empty() {
                        out.push('[');
                        out.push_str(&rendered);
                        out.push(']');
                    }
                }
            }
            out.push('{');
            render_opt(el.find("e"), out);
            out.push('}');
        }
        "nary" => {
            let chr = el
                .find("naryPr")
                .and_then(|pr| pr.find("chr"))
                .and_then(|chr| chr.attr("val"))
                .unwrap_or("∫");
            match chr.chars().next().and_then(symbols::nary_command_for_char) {
                Some(cmd) => {
                    out.push('\\');
                    out.push_str(cmd);
                }
                None => out.push_str(chr),
            }
            let sub = el.find("sub").map(render).unwrap_or_default();
            let sup = el.find("sup").map(render).unwrap_or_default();
            if !sub.is_empty() {
                out.push_str("_{");
                out.push_str(&sub);
                out.push('}');
            }
            if !sup.is_empty() {
                out.push_str("^{");
                out.push_str(&sup);
                out.push('}');
            }
            out.push(' ');
            render_opt(el.find("e"), out);
        }
        "d" => render_delim(el, out),
        "m" => render_matrix(el, "matrix", out),
        "eqArr" => {
            out.push_str("\\begin{align*}");
            let rows: Vec<String> = el.children_named("e").map(|row| render(row)).collect();
            out.push_str(&rows.join(" \\\\ "));
            out.push_str("\\end{align*}");
        }
        "func" => {
            let name = el.find("fName").map(|n| n.text()).unwrap_or_default();
            out.push('\\');
            out.push_str(name.trim());
            let body = el.find("e").map(render).unwrap_or_default();
            if body.is_empty() {
                out.push(' ');
            } else {
                out.push('{');
                out.push_str(&body);
                out.push('}');
            }
        }
        "acc" => {
            let chr = el
                .find("accPr")
                .and_then(|pr| pr.find("chr"))
                .and_then(|chr| chr.attr("val"))
                .unwrap_or("\u{0302}");
            match chr.chars().next().and_then(symbols::accent_command_for_char) {
                Some(cmd) => {
                    out.push('\\');
                    out.push_str(cmd);
                    out.push('{');
                    render_opt(el.find("e"), out);
                    out.push('}');
                }
                None => {
                    render_opt(el.find("e"), out);
                    out.push_str(chr);
                }
            }
        }
        // Property containers carry no content of their own.
        name if name.ends_with("Pr") => {}
        _ => render_children(el, out),
    }
}

fn render_opt(el: Option<&XmlElement>, out: &mut String) {
    if let Some(el) = el {
        render_children(el, out);
    }
}

/// A script base: bare when it renders to a single character.
fn render_base(el: Option<&XmlElement>, out: &mut String) {
    let rendered = el.map(render).unwrap_or_default();
    if rendered.chars().count() == 1 && !rendered.starts_with('\\') {
        out.push_str(&rendered);
    } else {
        out.push('{');
        out.push_str(&rendered);
        out.push('}');
    }
}

/// A script argument: bare single character, braced otherwise.
fn render_script(el: Option<&XmlElement>, out: &mut String) {
    let rendered = el.map(render).unwrap_or_default();
    if rendered.chars().count() == 1 && rendered.chars().all(|c| c.is_alphanumeric()) {
        out.push_str(&rendered);
    } else {
        out.push('{');
        out.push_str(&rendered);
        out.push('}');
    }
}

fn render_run(el: &XmlElement, out: &mut String) {
    let text: String = el.children_named("t").map(|t| t.text()).collect();

    let hidden = el
        .find("rPr")
        .map(|pr| pr.find("nor").is_some())
        .unwrap_or(false);
    if hidden && text.starts_with(CARRIER_PREFIX) {
        let payload = &text[CARRIER_PREFIX.len_utf8()..];
        out.push_str(payload);
        if !payload.ends_with('\n') {
            out.push('\n');
        }
        return;
    }

    // A run containing a backslash is a literal LaTeX fallback; emit
    // verbatim. Otherwise map symbols back to commands and escape specials.
    if text.contains('\\') {
        out.push_str(&text);
        return;
    }
    for ch in text.chars() {
        match symbols::command_for_char(ch) {
            Some(cmd) => {
                out.push('\\');
                out.push_str(cmd);
                out.push(' ');
            }
            None => match ch {
                '%' | '$' | '#' | '_' | '&' | '{' | '}' | '^' | '~' => {
                    out.push('\\');
                    out.push(ch);
                }
                _ => out.push(ch),
            },
        }
    }
}

fn render_delim(el: &XmlElement, out: &mut String) {
    let pr = el.find("dPr");
    let beg = pr.and_then(|pr| pr.find("begChr")).and_then(|c| c.attr("val")).unwrap_or("(");
    let end = pr.and_then(|pr| pr.find("endChr")).and_then(|c| c.attr("val")).unwrap_or(")");

    // A fenced matrix reconstructs as pmatrix/bmatrix.
    let inner: Vec<&XmlElement> = el.children_named("e").collect();
    if inner.len() == 1 {
        let only: Vec<&XmlElement> = inner[0].elements().collect();
        if only.len() == 1 && only[0].local_name() == "m" {
            let env = match (beg, end) {
                ("(", ")") => Some("pmatrix"),
                ("[", "]") => Some("bmatrix"),
                _ => None,
            };
            if let Some(env) = env {
                render_matrix(only[0], env, out);
                return;
            }
        }
    }

    out.push_str("\\left");
    out.push_str(&delim_char(beg));
    for e in inner {
        render_children(e, out);
    }
    out.push_str("\\right");
    out.push_str(&delim_char(end));
}

fn delim_char(chr: &str) -> String {
    match chr {
        "" => ".".to_string(),
        "{" => "\\{".to_string(),
        "}" => "\\}".to_string(),
        "⟨" => "\\langle ".to_string(),
        "⟩" => "\\rangle ".to_string(),
        other => other.to_string(),
    }
}

fn render_matrix(el: &XmlElement, env: &str, out: &mut String) {
    out.push_str(&format!("\\begin{{{env}}}"));
    let rows: Vec<String> = el
        .children_named("mr")
        .map(|row| {
            row.children_named("e")
                .map(|cell| render(cell))
                .collect::<Vec<_>>()
                .join(" & ")
        })
        .collect();
    out.push_str(&rows.join(" \\\\ "));
    out.push_str(&format!("\\end{{{env}}}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::{XmlBuilder, parse_tree};
    use crate::math::lexer::tokenize;
    use crate::math::omml::render_nodes;
    use crate::math::parser::parse;

    /// LaTeX -> OMML -> LaTeX.
    fn round_trip(latex: &str) -> String {
        let (nodes, warnings) = parse(tokenize(latex));
        assert!(warnings.is_empty(), "warnings for `{latex}`: {warnings:?}");
        let mut xml = XmlBuilder::with_capacity(512);
        xml.open("m:oMath");
        render_nodes(&mut xml, &nodes);
        xml.close("m:oMath");
        let tree = parse_tree(&xml.into_string()).unwrap();
        render(&tree)
    }

    #[test]
    fn test_fraction_round_trip() {
        assert_eq!(round_trip(r"\frac{a}{b}"), r"\frac{a}{b}");
    }

    #[test]
    fn test_superscript_bare_single_char() {
        assert_eq!(round_trip("x^2"), "x^2");
    }

    #[test]
    fn test_subsup_round_trip() {
        assert_eq!(round_trip("x_i^2"), "x_i^2");
    }

    #[test]
    fn test_comment_preserved_with_whitespace() {
        assert_eq!(round_trip("x^2 % superscript"), "x^2 % superscript\n");
    }

    #[test]
    fn test_line_continuation_preserved() {
        let latex = "a+%\nb";
        assert_eq!(round_trip(latex), "a+%\nb");
    }

    #[test]
    fn test_sqrt_round_trip() {
        assert_eq!(round_trip(r"\sqrt{x}"), r"\sqrt{x}");
        assert_eq!(round_trip(r"\sqrt[3]{x}"), r"\sqrt[3]{x}");
    }

    #[test]
    fn test_nary_round_trip() {
        assert_eq!(round_trip(r"\sum_{i=1}^{n} i"), r"\sum_{i=1}^{n} i");
    }

    #[test]
    fn test_greek_round_trip() {
        assert_eq!(round_trip(r"\alpha +\beta "), r"\alpha +\beta ");
    }

    #[test]
    fn test_delimiters_round_trip() {
        assert_eq!(round_trip(r"\left(x\right)"), r"\left(x\right)");
    }

    #[test]
    fn test_matrix_round_trip() {
        let latex = r"\begin{pmatrix}a & b \\ c & d\end{pmatrix}";
        assert_eq!(round_trip(latex), latex);
    }

    #[test]
    fn test_escaped_percent_round_trip() {
        assert_eq!(round_trip(r"50\%"), r"50\%");
    }

    #[test]
    fn test_unknown_command_verbatim() {
        let (nodes, _) = parse(tokenize(r"\mystery"));
        let mut xml = XmlBuilder::with_capacity(128);
        xml.open("m:oMath");
        render_nodes(&mut xml, &nodes);
        xml.close("m:oMath");
        let tree = parse_tree(&xml.into_string()).unwrap();
        assert_eq!(render(&tree), r"\mystery");
    }
}
