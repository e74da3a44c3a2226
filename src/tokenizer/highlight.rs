//!
//! Format-highlight colors. The 14 canonical identifiers map one-to-one onto
//! the OOXML `w:highlight` palette, which is what makes `==text=={color}`
//! round-trip losslessly.

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// The canonical highlight palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightColor {
    Yellow,
    Green,
    Turquoise,
    Pink,
    Blue,
    Red,
    DarkBlue,
    Teal,
    Violet,
    DarkRed,
    DarkYellow,
    Gray50,
    Gray25,
    Black,
}

static BY_ID: phf::Map<&'static str, HighlightColor> = phf_map! {
    "yellow" => HighlightColor::Yellow,
    "green" => HighlightColor::Green,
    "turquoise" => HighlightColor::Turquoise,
    "pink" => HighlightColor::Pink,
    "blue" => HighlightColor::Blue,
    "red" => HighlightColor::Red,
    "dark-blue" => HighlightColor::DarkBlue,
    "teal" => HighlightColor::Teal,
    "violet" => HighlightColor::Violet,
    "dark-red" => HighlightColor::DarkRed,
    "dark-yellow" => HighlightColor::DarkYellow,
    "gray-50" => HighlightColor::Gray50,
    "gray-25" => HighlightColor::Gray25,
    "black" => HighlightColor::Black,
};

impl HighlightColor {
    /// Look up a `{color-id}` suffix.
    pub fn from_id(id: &str) -> Option<HighlightColor> {
        BY_ID.get(id).copied()
    }

    /// The canonical identifier used in Markdown.
    pub fn id(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Turquoise => "turquoise",
            HighlightColor::Pink => "pink",
            HighlightColor::Blue => "blue",
            HighlightColor::Red => "red",
            HighlightColor::DarkBlue => "dark-blue",
            HighlightColor::Teal => "teal",
            HighlightColor::Violet => "violet",
            HighlightColor::DarkRed => "dark-red",
            HighlightColor::DarkYellow => "dark-yellow",
            HighlightColor::Gray50 => "gray-50",
            HighlightColor::Gray25 => "gray-25",
            HighlightColor::Black => "black",
        }
    }

    /// The OOXML `w:highlight` value.
    pub fn w_val(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Turquoise => "cyan",
            HighlightColor::Pink => "magenta",
            HighlightColor::Blue => "blue",
            HighlightColor::Red => "red",
            HighlightColor::DarkBlue => "darkBlue",
            HighlightColor::Teal => "darkCyan",
            HighlightColor::Violet => "darkMagenta",
            HighlightColor::DarkRed => "darkRed",
            HighlightColor::DarkYellow => "darkYellow",
            HighlightColor::Gray50 => "darkGray",
            HighlightColor::Gray25 => "lightGray",
            HighlightColor::Black => "black",
        }
    }

    /// Inverse of [`HighlightColor::w_val`].
    pub fn from_w_val(val: &str) -> Option<HighlightColor> {
        let color = match val {
            "yellow" => HighlightColor::Yellow,
            "green" => HighlightColor::Green,
            "cyan" => HighlightColor::Turquoise,
            "magenta" => HighlightColor::Pink,
            "blue" => HighlightColor::Blue,
            "red" => HighlightColor::Red,
            "darkBlue" => HighlightColor::DarkBlue,
            "darkCyan" => HighlightColor::Teal,
            "darkMagenta" => HighlightColor::Violet,
            "darkRed" => HighlightColor::DarkRed,
            "darkYellow" => HighlightColor::DarkYellow,
            "darkGray" => HighlightColor::Gray50,
            "lightGray" => HighlightColor::Gray25,
            "black" => HighlightColor::Black,
            _ => return None,
        };
        Some(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ids_round_trip() {
        for id in BY_ID.keys() {
            let color = HighlightColor::from_id(id).unwrap();
            assert_eq!(color.id(), *id);
            assert_eq!(HighlightColor::from_w_val(color.w_val()), Some(color));
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(HighlightColor::from_id("chartreuse"), None);
    }

    #[test]
    fn test_palette_size() {
        assert_eq!(BY_ID.len(), 14);
    }
}
