//!
//! numbering.xml generation. One abstract numbering per list in the
//! document; ordered and unordered lists differ in their level format.

use crate::docx::model::NumberingDef;
use crate::docx::xml::XmlBuilder;

const BULLETS: [&str; 3] = ["\u{f0b7}", "o", "\u{f0a7}"];
const LEVELS: u32 = 9;

/// Generate numbering.xml for the registered lists.
pub fn generate_numbering_xml(defs: &[NumberingDef]) -> String {
    let mut xml = XmlBuilder::with_capacity(4 * 1024);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with(
        "w:numbering",
        &[(
            "xmlns:w",
            "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        )],
    );

    for def in defs {
        let abstract_id = def.num_id.to_string();
        xml.open_with("w:abstractNum", &[("w:abstractNumId", &abstract_id)]);
        for level in 0..LEVELS {
            let indent = (720 * (level + 1)).to_string();
            xml.open_with("w:lvl", &[("w:ilvl", &level.to_string())]);
            if def.ordered {
                xml.empty_with("w:start", &[("w:val", "1")])
                    .empty_with("w:numFmt", &[("w:val", "decimal")])
                    .empty_with("w:lvlText", &[("w:val", &format!("%{}.", level + 1))]);
            } else {
                xml.empty_with("w:numFmt", &[("w:val", "bullet")]).empty_with(
                    "w:lvlText",
                    &[("w:val", BULLETS[(level as usize) % BULLETS.len()])],
                );
            }
            xml.empty_with("w:lvlJc", &[("w:val", "left")])
                .open("w:pPr")
                .empty_with("w:ind", &[("w:left", &indent), ("w:hanging", "360")])
                .close("w:pPr")
                .close("w:lvl");
        }
        xml.close("w:abstractNum");
    }

    for def in defs {
        let id = def.num_id.to_string();
        xml.open_with("w:num", &[("w:numId", &id)])
            .empty_with("w:abstractNumId", &[("w:val", &id)])
            .close("w:num");
    }

    xml.close("w:numbering");
    xml.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_and_bullet_lists() {
        let defs = [
            NumberingDef { num_id: 1, ordered: true },
            NumberingDef { num_id: 2, ordered: false },
        ];
        let xml = generate_numbering_xml(&defs);
        assert!(xml.contains("w:abstractNumId=\"1\""));
        assert!(xml.contains("w:val=\"decimal\""));
        assert!(xml.contains("w:val=\"bullet\""));
        assert!(xml.contains("<w:num w:numId=\"2\">"));
    }
}
