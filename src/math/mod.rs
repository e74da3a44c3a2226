//!
//! The LaTeX <-> OMML bridge. LaTeX is lexed and parsed into a small math
//! tree that both directions share; `%` comments survive as zero-width
//! hidden runs inside the OMML.

pub mod latex;
pub mod lexer;
pub mod omml;
pub mod parser;
pub mod symbols;

use crate::docx::xml::{XmlBuilder, XmlElement, parse_tree};
use crate::error::ConvertResult;

/// Translate LaTeX math into a complete OMML fragment: `m:oMath` for inline
/// math, `m:oMathPara` wrapping for display math.
pub fn latex_to_omml(latex: &str, display: bool) -> (String, Vec<String>) {
    let (nodes, warnings) = parser::parse(lexer::tokenize(latex));
    let mut xml = XmlBuilder::with_capacity(latex.len() * 4 + 64);
    if display {
        xml.open("m:oMathPara");
    }
    xml.open("m:oMath");
    omml::render_nodes(&mut xml, &nodes);
    xml.close("m:oMath");
    if display {
        xml.close("m:oMathPara");
    }
    (xml.into_string(), warnings)
}

/// Translate an OMML fragment (as raw XML) back into LaTeX.
pub fn omml_to_latex(xml: &str) -> ConvertResult<String> {
    let tree = parse_tree(xml)?;
    Ok(omml_tree_to_latex(&tree))
}

/// Translate an already-parsed OMML element back into LaTeX.
pub fn omml_tree_to_latex(el: &XmlElement) -> String {
    latex::render(el)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_wrapper() {
        let (xml, warnings) = latex_to_omml("x^2", false);
        assert!(xml.starts_with("<m:oMath>"));
        assert!(xml.ends_with("</m:oMath>"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_display_wrapper() {
        let (xml, _) = latex_to_omml(r"\frac{1}{2}", true);
        assert!(xml.starts_with("<m:oMathPara><m:oMath>"));
        assert!(xml.ends_with("</m:oMath></m:oMathPara>"));
    }

    #[test]
    fn test_full_round_trip_through_strings() {
        let (xml, _) = latex_to_omml(r"\frac{a}{b}+c", false);
        let back = omml_to_latex(&xml).unwrap();
        assert_eq!(back, r"\frac{a}{b}+c");
    }

    #[test]
    fn test_unsupported_construct_warns() {
        let (_, warnings) = latex_to_omml(r"\oddball{x}", false);
        assert!(warnings.iter().any(|w| w.contains("oddball")));
    }
}
