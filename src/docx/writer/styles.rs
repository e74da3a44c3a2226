//!
//! styles.xml generation and font-override resolution. Sizes are half-points
//! throughout (1 pt = 2 hp).

use std::sync::LazyLock;

use regex::Regex;

use crate::docx::xml::XmlBuilder;
use crate::frontmatter::{FontStyle, Frontmatter};

/// Default body size in half-points (11 pt).
pub const DEFAULT_BODY_HP: u32 = 22;
/// Default heading sizes H1..H6 in half-points.
pub const DEFAULT_HEADING_HP: [u32; 6] = [32, 26, 24, 22, 20, 18];
pub const DEFAULT_TITLE_HP: u32 = 56;
pub const DEFAULT_NOTE_HP: u32 = 20;
pub const DEFAULT_CODE_BLOCK_HP: u32 = 20;

const DEFAULT_BODY_FONT: &str = "Calibri";
const DEFAULT_CODE_FONT: &str = "Consolas";

/// Resolved font configuration for style emission.
#[derive(Debug, Clone, PartialEq)]
pub struct FontResolution {
    pub body_font: String,
    pub code_font: String,
    pub header_font: Option<String>,
    pub title_font: Option<String>,
    pub body_hp: u32,
    pub code_hp: u32,
    pub heading_hp: [u32; 6],
    pub title_hp: u32,
    pub footnote_hp: u32,
    pub endnote_hp: u32,
    pub code_block_hp: u32,
    pub heading_styles: [Option<FontStyle>; 6],
    pub title_style: Option<FontStyle>,
}

fn to_hp(points: f64) -> u32 {
    (points * 2.0).round().max(1.0) as u32
}

/// Apply the override rules from the frontmatter.
pub fn resolve_fonts(fm: &Frontmatter) -> FontResolution {
    let body_hp = fm.font_size.map(to_hp).unwrap_or(DEFAULT_BODY_HP);

    // Code size: explicit wins; otherwise derived from the body size as
    // max(2, 2S - 2); otherwise the default.
    let code_hp = match (fm.code_font_size, fm.font_size) {
        (Some(code), _) => to_hp(code),
        (None, Some(body)) => ((body * 2.0).round() as i64 - 2).max(2) as u32,
        (None, None) => DEFAULT_CODE_BLOCK_HP,
    };

    // Headings scale proportionally with the body unless overridden per
    // level; a short override array inherits its last element.
    let mut heading_hp = DEFAULT_HEADING_HP;
    if fm.font_size.is_some() {
        for (idx, hp) in heading_hp.iter_mut().enumerate() {
            *hp = proportional(DEFAULT_HEADING_HP[idx], body_hp);
        }
    }
    for (idx, hp) in heading_hp.iter_mut().enumerate() {
        if let Some(size) = level_override(&fm.header_font_size, idx) {
            *hp = to_hp(size);
        }
    }

    let mut heading_styles = [None; 6];
    for (idx, style) in heading_styles.iter_mut().enumerate() {
        *style = level_override(&fm.header_font_style, idx);
    }

    FontResolution {
        body_font: fm.font.clone().unwrap_or_else(|| DEFAULT_BODY_FONT.to_string()),
        code_font: fm.code_font.clone().unwrap_or_else(|| DEFAULT_CODE_FONT.to_string()),
        header_font: fm.header_font.clone(),
        title_font: fm.title_font.clone(),
        body_hp,
        code_hp,
        heading_hp,
        title_hp: fm.title_font_size.map(to_hp).unwrap_or(DEFAULT_TITLE_HP),
        footnote_hp: DEFAULT_NOTE_HP,
        endnote_hp: DEFAULT_NOTE_HP,
        code_block_hp: code_hp,
        heading_styles,
        title_style: fm.title_font_style,
    }
}

/// `round(default / 22 * body)`
pub fn proportional(default_hp: u32, body_hp: u32) -> u32 {
    ((default_hp as f64) / (DEFAULT_BODY_HP as f64) * (body_hp as f64)).round() as u32
}

/// Per-level override with last-element inheritance.
fn level_override<T: Copy>(values: &[T], idx: usize) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    Some(*values.get(idx).unwrap_or(values.last().expect("non-empty")))
}

fn rpr_style_toggles(xml: &mut XmlBuilder, style: &FontStyle) {
    if style.bold {
        xml.empty("w:b");
    }
    if style.italic {
        xml.empty("w:i");
    }
    if style.underline {
        xml.empty_with("w:u", &[("w:val", "single")]);
    }
}

fn heading_default_style(level: usize) -> FontStyle {
    // H1-H4 bold by default, deeper levels italic.
    if level < 4 {
        FontStyle {
            bold: true,
            ..Default::default()
        }
    } else {
        FontStyle {
            italic: true,
            ..Default::default()
        }
    }
}

/// Generate a complete styles.xml.
pub fn generate_styles_xml(fonts: &FontResolution) -> String {
    let mut xml = XmlBuilder::with_capacity(8 * 1024);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with(
        "w:styles",
        &[(
            "xmlns:w",
            "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        )],
    );

    // Document defaults carry the body font and size.
    xml.open("w:docDefaults")
        .open("w:rPrDefault")
        .open("w:rPr")
        .empty_with(
            "w:rFonts",
            &[
                ("w:ascii", &fonts.body_font),
                ("w:hAnsi", &fonts.body_font),
                ("w:cs", &fonts.body_font),
            ],
        )
        .empty_with("w:sz", &[("w:val", &fonts.body_hp.to_string())])
        .empty_with("w:szCs", &[("w:val", &fonts.body_hp.to_string())])
        .close("w:rPr")
        .close("w:rPrDefault")
        .close("w:docDefaults");

    // Normal
    xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", "Normal"), ("w:default", "1")])
        .empty_with("w:name", &[("w:val", "Normal")])
        .close("w:style");

    // Headings
    for level in 0..6 {
        let id = format!("Heading{}", level + 1);
        let name = format!("heading {}", level + 1);
        xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", &id)])
            .empty_with("w:name", &[("w:val", &name)])
            .empty_with("w:basedOn", &[("w:val", "Normal")])
            .empty_with("w:next", &[("w:val", "Normal")])
            .open("w:pPr")
            .empty_with("w:outlineLvl", &[("w:val", &level.to_string())])
            .empty_with("w:keepNext", &[])
            .close("w:pPr")
            .open("w:rPr");
        if let Some(font) = &fonts.header_font {
            xml.empty_with("w:rFonts", &[("w:ascii", font), ("w:hAnsi", font)]);
        }
        let style = fonts.heading_styles[level].unwrap_or_else(|| heading_default_style(level));
        rpr_style_toggles(&mut xml, &style);
        xml.empty_with("w:sz", &[("w:val", &fonts.heading_hp[level].to_string())])
            .empty_with("w:szCs", &[("w:val", &fonts.heading_hp[level].to_string())])
            .close("w:rPr")
            .close("w:style");
    }

    // Title
    xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", "Title")])
        .empty_with("w:name", &[("w:val", "Title")])
        .empty_with("w:basedOn", &[("w:val", "Normal")])
        .empty_with("w:next", &[("w:val", "Normal")])
        .open("w:rPr");
    if let Some(font) = &fonts.title_font {
        xml.empty_with("w:rFonts", &[("w:ascii", font), ("w:hAnsi", font)]);
    }
    if let Some(style) = &fonts.title_style {
        rpr_style_toggles(&mut xml, style);
    }
    xml.empty_with("w:sz", &[("w:val", &fonts.title_hp.to_string())])
        .empty_with("w:szCs", &[("w:val", &fonts.title_hp.to_string())])
        .close("w:rPr")
        .close("w:style");

    // Quote / IntenseQuote
    for (id, name) in [("Quote", "Quote"), ("IntenseQuote", "Intense Quote")] {
        xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])
            .empty_with("w:name", &[("w:val", name)])
            .empty_with("w:basedOn", &[("w:val", "Normal")])
            .open("w:pPr")
            .empty_with("w:ind", &[("w:left", "720")])
            .close("w:pPr")
            .open("w:rPr")
            .empty("w:i")
            .close("w:rPr")
            .close("w:style");
    }

    // Inline code character style
    xml.open_with("w:style", &[("w:type", "character"), ("w:styleId", "CodeChar")])
        .empty_with("w:name", &[("w:val", "Code Char")])
        .open("w:rPr")
        .empty_with(
            "w:rFonts",
            &[("w:ascii", &fonts.code_font), ("w:hAnsi", &fonts.code_font)],
        )
        .empty_with("w:sz", &[("w:val", &fonts.code_hp.to_string())])
        .close("w:rPr")
        .close("w:style");

    // Code block paragraph style
    xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", "CodeBlock")])
        .empty_with("w:name", &[("w:val", "Code Block")])
        .empty_with("w:basedOn", &[("w:val", "Normal")])
        .open("w:rPr")
        .empty_with(
            "w:rFonts",
            &[("w:ascii", &fonts.code_font), ("w:hAnsi", &fonts.code_font)],
        )
        .empty_with("w:sz", &[("w:val", &fonts.code_block_hp.to_string())])
        .close("w:rPr")
        .close("w:style");

    // Footnote / endnote text
    for (id, name, hp) in [
        ("FootnoteText", "footnote text", fonts.footnote_hp),
        ("EndnoteText", "endnote text", fonts.endnote_hp),
    ] {
        xml.open_with("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])
            .empty_with("w:name", &[("w:val", name)])
            .empty_with("w:basedOn", &[("w:val", "Normal")])
            .open("w:rPr")
            .empty_with("w:sz", &[("w:val", &hp.to_string())])
            .close("w:rPr")
            .close("w:style");
    }

    // Hyperlink character style
    xml.open_with("w:style", &[("w:type", "character"), ("w:styleId", "Hyperlink")])
        .empty_with("w:name", &[("w:val", "Hyperlink")])
        .open("w:rPr")
        .empty_with("w:color", &[("w:val", "0563C1")])
        .empty_with("w:u", &[("w:val", "single")])
        .close("w:rPr")
        .close("w:style");

    xml.close("w:styles");
    xml.into_string()
}

static SZ_IN_STYLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<w:sz w:val="\d+"\s*/>"#).unwrap());

/// Patch a template's styles.xml with the frontmatter's explicit size
/// overrides. Only styles whose size the frontmatter actually sets are
/// touched; everything else stays as the template authored it.
pub fn patch_template_styles(template_xml: &str, fm: &Frontmatter, fonts: &FontResolution) -> String {
    let mut patched = template_xml.to_string();

    let mut targets: Vec<(String, u32)> = Vec::new();
    if fm.font_size.is_some() {
        targets.push(("Normal".to_string(), fonts.body_hp));
        for (idx, hp) in fonts.heading_hp.iter().enumerate() {
            targets.push((format!("Heading{}", idx + 1), *hp));
        }
    } else {
        for (idx, _) in fm.header_font_size.iter().enumerate().take(6) {
            targets.push((format!("Heading{}", idx + 1), fonts.heading_hp[idx]));
        }
    }
    if fm.title_font_size.is_some() {
        targets.push(("Title".to_string(), fonts.title_hp));
    }
    if fm.code_font_size.is_some() || fm.font_size.is_some() {
        targets.push(("CodeBlock".to_string(), fonts.code_block_hp));
        targets.push(("CodeChar".to_string(), fonts.code_hp));
    }

    for (style_id, hp) in targets {
        patched = patch_style_size(&patched, &style_id, hp);
    }
    patched
}

fn patch_style_size(xml: &str, style_id: &str, hp: u32) -> String {
    let marker = format!("w:styleId=\"{style_id}\"");
    let Some(start) = xml.find(&marker) else {
        return xml.to_string();
    };
    let Some(end_rel) = xml[start..].find("</w:style>") else {
        return xml.to_string();
    };
    let end = start + end_rel;
    let section = &xml[start..end];
    let replacement = format!("<w:sz w:val=\"{hp}\"/>");
    let new_section = if SZ_IN_STYLE.is_match(section) {
        SZ_IN_STYLE.replace_all(section, replacement.as_str()).into_owned()
    } else if let Some(rpr) = section.find("<w:rPr>") {
        let insert_at = rpr + "<w:rPr>".len();
        format!("{}{}{}", &section[..insert_at], replacement, &section[insert_at..])
    } else {
        return xml.to_string();
    };
    format!("{}{}{}", &xml[..start], new_section, &xml[end..])
}
