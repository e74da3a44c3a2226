//!
//! DOCX import: unzip the archive, parse its parts, lift the body into the
//! document model, and render Markdown plus a BibTeX store.

pub mod document;
pub mod fields;
pub mod markdown;

use std::io::{Cursor, Read};

use crate::bibtex::{self, BibStore};
use crate::config::ImportOptions;
use crate::docx::model::DocxModel;
use crate::docx::xml::{XmlElement, parse_tree};
use crate::error::{ConvertError, ConvertResult};

use document::PartMaps;
use fields::CitationCollector;

/// Result of a DOCX -> Markdown conversion.
#[derive(Debug)]
pub struct ReadOutcome {
    pub markdown: String,
    pub bib: BibStore,
    pub warnings: Vec<String>,
}

/// Convert DOCX bytes into Markdown plus bibliography.
pub fn read_docx(bytes: &[u8], opts: &ImportOptions) -> ConvertResult<ReadOutcome> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ConvertError::InvalidDocx(format!("not a ZIP archive: {err}")))?;
    let mut warnings = Vec::new();

    let document_xml = read_part(&mut archive, "word/document.xml")
        .ok_or_else(|| ConvertError::InvalidDocx("missing word/document.xml".to_string()))?;
    let document = parse_tree(&document_xml)?;

    let mut maps = PartMaps::default();
    if let Some(tree) = read_optional_tree(&mut archive, "word/styles.xml", &mut warnings) {
        maps.styles = document::parse_styles(&tree);
    }
    if let Some(tree) = read_optional_tree(&mut archive, "word/numbering.xml", &mut warnings) {
        maps.numbering_ordered = document::parse_numbering(&tree);
    }
    if let Some(tree) = read_optional_tree(&mut archive, "word/comments.xml", &mut warnings) {
        maps.comments = document::parse_comments(&tree);
    }
    if let Some(tree) = read_optional_tree(&mut archive, "word/_rels/document.xml.rels", &mut warnings) {
        maps.rels = document::parse_rels(&tree);
    }

    let body = document
        .find("body")
        .ok_or_else(|| ConvertError::InvalidDocx("document.xml has no w:body".to_string()))?;
    let model = DocxModel {
        blocks: document::parse_body(body, &maps, &mut warnings),
        comments: maps.comments.values().cloned().collect(),
        numberings: Vec::new(),
    };

    let mut collector = CitationCollector::new(opts.citation_key_format);
    let markdown = markdown::render_markdown(
        &model,
        &maps.numbering_ordered,
        &maps.comments,
        &mut collector,
        &mut warnings,
    );
    warnings.extend(std::mem::take(&mut collector.warnings));

    Ok(ReadOutcome {
        markdown,
        bib: collector.store,
        warnings,
    })
}

/// Serialize the collected bibliography, or None when it is empty.
pub fn bibtex_of(outcome: &ReadOutcome) -> Option<String> {
    (!outcome.bib.is_empty()).then(|| bibtex::serialize(&outcome.bib))
}

fn read_part(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_optional_tree(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<XmlElement> {
    let content = read_part(archive, name)?;
    match parse_tree(&content) {
        Ok(tree) => Some(tree),
        Err(err) => {
            warnings.push(format!("Could not parse {name} ({err}); part ignored"));
            None
        }
    }
}
