//!
//! The document model shared by the DOCX writer and reader. The writer
//! lowers Markdown tokens into this tree before serializing OOXML; the
//! reader lifts parsed OOXML into it before rendering Markdown. Cross
//! references (comments, numbering) are integer ids into flat registries.

use crate::tokenizer::CellAlignment;
use crate::tokenizer::highlight::HighlightColor;

/// Character-level formatting on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunProps {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub sup: bool,
    pub sub: bool,
    /// Styled with the inline code character style.
    pub code: bool,
    /// `w:vanish` hidden text.
    pub vanish: bool,
    pub highlight: Option<HighlightColor>,
}

impl RunProps {
    pub fn is_plain(&self) -> bool {
        *self == RunProps::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub props: RunProps,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            props: RunProps::default(),
        }
    }
}

/// A Word complex field: instruction text plus the cached result runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub instr: String,
    pub result: Vec<Run>,
}

impl Field {
    /// Whether the instruction is a Zotero citation field.
    pub fn is_zotero_citation(&self) -> bool {
        self.instr.trim_start().starts_with("ADDIN ZOTERO_ITEM CSL_CITATION")
    }
}

/// Inline-level content of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum ParaChild {
    Run(Run),
    /// `w:br`
    Break,
    Hyperlink {
        url: String,
        runs: Vec<Run>,
    },
    Math {
        latex: String,
        display: bool,
    },
    /// Tracked insertion (`w:ins`).
    Ins {
        author: String,
        date: String,
        runs: Vec<Run>,
    },
    /// Tracked deletion (`w:del` with `w:delText`).
    Del {
        author: String,
        date: String,
        runs: Vec<Run>,
    },
    CommentStart {
        id: u32,
    },
    CommentEnd {
        id: u32,
    },
    CommentRef {
        id: u32,
    },
    Field(Field),
    /// Hidden-carrier run holding an HTML comment (vanish + U+200B).
    HiddenHtml {
        text: String,
    },
}

/// Paragraph style, resolved to the known style set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParaStyle {
    #[default]
    Normal,
    Heading(u8),
    Title,
    Quote,
    CodeBlock,
}

impl ParaStyle {
    pub fn style_id(&self) -> String {
        match self {
            ParaStyle::Normal => "Normal".to_string(),
            ParaStyle::Heading(level) => format!("Heading{level}"),
            ParaStyle::Title => "Title".to_string(),
            ParaStyle::Quote => "Quote".to_string(),
            ParaStyle::CodeBlock => "CodeBlock".to_string(),
        }
    }

    pub fn from_style_id(id: &str) -> ParaStyle {
        match id {
            "Title" => ParaStyle::Title,
            "Quote" | "IntenseQuote" | "BlockQuote" => ParaStyle::Quote,
            "CodeBlock" | "HTMLPreformatted" => ParaStyle::CodeBlock,
            _ => {
                if let Some(level) = id.strip_prefix("Heading").and_then(|l| l.parse::<u8>().ok()) {
                    if (1..=6).contains(&level) {
                        return ParaStyle::Heading(level);
                    }
                }
                ParaStyle::Normal
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Para {
    pub style: ParaStyle,
    /// `(numId, ilvl)` when the paragraph is a list item.
    pub numbering: Option<(u32, u32)>,
    pub alignment: Option<CellAlignment>,
    /// Rendered as a bottom-border paragraph (thematic break).
    pub horizontal_rule: bool,
    pub children: Vec<ParaChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub header: bool,
    pub cells: Vec<Vec<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub alignments: Vec<CellAlignment>,
    pub rows: Vec<TableRow>,
    /// Set when the table uses merges the pipe syntax cannot express.
    pub complex: bool,
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Para),
    Table(Table),
}

/// A comment entry (`comments.xml`).
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: u32,
    pub author: String,
    pub date: String,
    pub text: String,
}

/// A numbering definition used by list paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingDef {
    pub num_id: u32,
    pub ordered: bool,
}

/// The whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxModel {
    pub blocks: Vec<Block>,
    pub comments: Vec<Comment>,
    pub numberings: Vec<NumberingDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_id_round_trip() {
        for style in [
            ParaStyle::Normal,
            ParaStyle::Heading(1),
            ParaStyle::Heading(6),
            ParaStyle::Title,
            ParaStyle::Quote,
            ParaStyle::CodeBlock,
        ] {
            assert_eq!(ParaStyle::from_style_id(&style.style_id()), style);
        }
    }

    #[test]
    fn test_unknown_style_is_normal() {
        assert_eq!(ParaStyle::from_style_id("ListParagraph"), ParaStyle::Normal);
        assert_eq!(ParaStyle::from_style_id("Heading9"), ParaStyle::Normal);
    }

    #[test]
    fn test_zotero_field_detection() {
        let field = Field {
            instr: " ADDIN ZOTERO_ITEM CSL_CITATION {\"x\":1}".to_string(),
            result: vec![],
        };
        assert!(field.is_zotero_citation());
        let other = Field {
            instr: " PAGEREF _Toc1".to_string(),
            result: vec![],
        };
        assert!(!other.is_zotero_citation());
    }
}
