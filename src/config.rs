//!
//! Option structs for the conversion entry points. All state is call-scoped:
//! the converter keeps no process-wide configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::tokenizer::highlight::HighlightColor;

/// How grouped citations with mixed Zotero/plain entries are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MixedCitationStyle {
    /// Each citation item is emitted on its own (field code or plain text).
    #[default]
    Separate,
    /// All items of a `[@a; @b]` group share a single field code where possible.
    Unified,
}

/// Citation key scheme used when importing Zotero field codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
#[value(rename_all = "camelCase")]
pub enum CitationKeyFormat {
    /// `smith2020Climate` - first author, year, first significant title word.
    #[default]
    AuthorYearTitle,
    /// `smith2020`
    AuthorYear,
    /// Sequential `ref1`, `ref2`, ...
    Numeric,
}

/// Callback consulted when a CSL style referenced by the document is not
/// available locally. Returning `true` permits the caller to attempt a
/// download; the core itself performs no I/O either way.
pub type StyleNotFoundCallback = Box<dyn Fn(&str) -> bool>;

/// Options for the Markdown -> DOCX direction.
pub struct ExportOptions {
    /// Author name stamped on tracked changes and comments.
    pub author_name: Option<String>,
    /// A `.docx` whose styles/theme/settings seed the output archive.
    pub template_docx: Option<Vec<u8>>,
    pub mixed_citation_style: MixedCitationStyle,
    /// Fallback for `==text=={color}` when the color id is unrecognized.
    pub default_highlight: HighlightColor,
    /// Directory the caller caches CSL styles in (informational only).
    pub csl_cache_dir: Option<String>,
    /// Directory of the source document, for resolving relative paths.
    pub source_dir: Option<String>,
    pub on_style_not_found: Option<StyleNotFoundCallback>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            author_name: None,
            template_docx: None,
            mixed_citation_style: MixedCitationStyle::default(),
            default_highlight: HighlightColor::Yellow,
            csl_cache_dir: None,
            source_dir: None,
            on_style_not_found: None,
        }
    }
}

impl std::fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOptions")
            .field("author_name", &self.author_name)
            .field("template_docx", &self.template_docx.as_ref().map(Vec::len))
            .field("mixed_citation_style", &self.mixed_citation_style)
            .field("default_highlight", &self.default_highlight)
            .field("csl_cache_dir", &self.csl_cache_dir)
            .field("source_dir", &self.source_dir)
            .field(
                "on_style_not_found",
                &self.on_style_not_found.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// Options for the DOCX -> Markdown direction.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub citation_key_format: CitationKeyFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_options() {
        let opts = ExportOptions::default();
        assert_eq!(opts.mixed_citation_style, MixedCitationStyle::Separate);
        assert_eq!(opts.default_highlight, HighlightColor::Yellow);
        assert!(opts.author_name.is_none());
    }

    #[test]
    fn test_citation_key_format_default() {
        assert_eq!(CitationKeyFormat::default(), CitationKeyFormat::AuthorYearTitle);
    }
}
