//!
//! mdocx converts Manuscript Markdown (CommonMark + CriticMarkup + Pandoc
//! citations + format highlights + LaTeX math + HTML comments) to and from
//! Microsoft Word's OOXML `.docx` container. The conversion core is pure:
//! bytes in, bytes out, warnings collected on the side.

pub mod bibtex;
pub mod config;
pub mod docx;
pub mod error;
pub mod exit_codes;
pub mod frontmatter;
pub mod inert;
pub mod math;
pub mod tokenizer;

pub use bibtex::{BibEntry, BibStore};
pub use config::{CitationKeyFormat, ExportOptions, ImportOptions, MixedCitationStyle};
pub use error::{ConvertError, ConvertResult};
pub use tokenizer::highlight::HighlightColor;

use tokenizer::TokenizerOptions;

/// Result of a Markdown -> DOCX conversion.
#[derive(Debug)]
pub struct Export {
    pub docx: Vec<u8>,
    pub warnings: Vec<String>,
}

/// Result of a DOCX -> Markdown conversion.
#[derive(Debug)]
pub struct Import {
    pub markdown: String,
    pub bibtex: Option<String>,
    pub warnings: Vec<String>,
}

/// Convert Manuscript Markdown (with optional BibTeX) to DOCX bytes.
pub fn convert_md_to_docx(
    markdown: &str,
    bibtex_text: Option<&str>,
    opts: &ExportOptions,
) -> ConvertResult<Export> {
    let mut warnings = Vec::new();

    let (fm, body_start, fm_warnings) = frontmatter::parse(markdown);
    warnings.extend(fm_warnings);

    let (bib, bib_warnings) = match bibtex_text {
        Some(text) => bibtex::parse(text),
        None => (BibStore::new(), Vec::new()),
    };
    warnings.extend(bib_warnings);

    let tokenizer_opts = TokenizerOptions {
        default_highlight: opts.default_highlight,
    };
    let (tokens, token_warnings) = tokenizer::tokenize(&markdown[body_start..], &tokenizer_opts);
    warnings.extend(token_warnings);

    let (docx, writer_warnings) = docx::writer::write_docx(&fm, &tokens, &bib, opts)?;
    warnings.extend(writer_warnings);

    Ok(Export { docx, warnings })
}

/// Convert DOCX bytes to Markdown plus a companion BibTeX serialization.
pub fn convert_docx(bytes: &[u8], opts: &ImportOptions) -> ConvertResult<Import> {
    let outcome = docx::reader::read_docx(bytes, opts)?;
    let bibtex = docx::reader::bibtex_of(&outcome);
    Ok(Import {
        markdown: outcome.markdown,
        bibtex,
        warnings: outcome.warnings,
    })
}

/// Parse BibTeX text.
pub fn parse_bibtex(text: &str) -> (BibStore, Vec<String>) {
    bibtex::parse(text)
}

/// Serialize a BibTeX store.
pub fn serialize_bibtex(store: &BibStore) -> String {
    bibtex::serialize(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_md_to_docx_smoke() {
        let export = convert_md_to_docx("# Title\n\nSome **bold** text.\n", None, &ExportOptions::default())
            .expect("conversion succeeds");
        // A ZIP archive starts with the PK signature.
        assert_eq!(&export.docx[..2], b"PK");
    }

    #[test]
    fn test_export_then_import() {
        let export = convert_md_to_docx("plain paragraph\n", None, &ExportOptions::default()).unwrap();
        let import = convert_docx(&export.docx, &ImportOptions::default()).unwrap();
        assert_eq!(import.markdown, "plain paragraph\n");
        assert!(import.bibtex.is_none());
    }

    #[test]
    fn test_invalid_docx_is_error() {
        let result = convert_docx(b"definitely not a zip", &ImportOptions::default());
        assert!(matches!(result, Err(ConvertError::InvalidDocx(_))));
    }
}
