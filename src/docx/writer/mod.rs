//!
//! DOCX assembly: lower tokens to the document model, emit the OOXML parts,
//! and package them as a ZIP archive. The archive is built fully in memory.

pub mod citations;
pub mod comments;
pub mod document;
pub mod lower;
pub mod numbering;
pub mod styles;

use std::io::{Cursor, Read, Write};

use crate::bibtex::BibStore;
use crate::config::ExportOptions;
use crate::docx::xml::XmlBuilder;
use crate::error::ConvertResult;
use crate::frontmatter::Frontmatter;
use crate::tokenizer::MdToken;

use document::RelRegistry;

const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Parts pulled from a template archive.
#[derive(Debug, Default)]
struct TemplateParts {
    styles: Option<String>,
    theme: Option<Vec<u8>>,
    settings: Option<String>,
}

/// Convert tokens (plus frontmatter and bibliography) into DOCX bytes.
pub fn write_docx(
    fm: &Frontmatter,
    tokens: &[MdToken],
    bib: &BibStore,
    opts: &ExportOptions,
) -> ConvertResult<(Vec<u8>, Vec<String>)> {
    let mut warnings = Vec::new();

    if let Some(csl) = &fm.csl {
        let resolved = opts.on_style_not_found.as_ref().map(|cb| cb(csl)).unwrap_or(false);
        if !resolved {
            warnings.push(format!(
                "CSL style `{csl}` is not available; citations keep their field codes"
            ));
        }
    }

    let (model, lower_warnings) = lower::lower(fm, tokens, bib, opts);
    warnings.extend(lower_warnings);

    let fonts = styles::resolve_fonts(fm);
    let template = load_template(opts, &mut warnings);
    let styles_xml = match &template.styles {
        Some(template_styles) => styles::patch_template_styles(template_styles, fm, &fonts),
        None => styles::generate_styles_xml(&fonts),
    };

    let mut rels = RelRegistry::new(10);
    let (document_xml, doc_warnings) = document::generate_document_xml(&model, &mut rels);
    warnings.extend(doc_warnings);

    let has_numbering = !model.numberings.is_empty();
    let has_comments = !model.comments.is_empty();

    let numbering_xml = has_numbering.then(|| numbering::generate_numbering_xml(&model.numberings));
    let comments_xml = has_comments.then(|| comments::generate_comments_xml(&model.comments));

    let document_rels = document_rels_xml(&rels, has_numbering, has_comments, &template);
    let content_types = content_types_xml(has_numbering, has_comments, &template);

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(package_rels_xml().as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(styles_xml.as_bytes())?;

    if let Some(numbering_xml) = &numbering_xml {
        zip.start_file("word/numbering.xml", options)?;
        zip.write_all(numbering_xml.as_bytes())?;
    }
    if let Some(comments_xml) = &comments_xml {
        zip.start_file("word/comments.xml", options)?;
        zip.write_all(comments_xml.as_bytes())?;
    }
    if let Some(theme) = &template.theme {
        zip.start_file("word/theme/theme1.xml", options)?;
        zip.write_all(theme)?;
    }
    if let Some(settings) = &template.settings {
        zip.start_file("word/settings.xml", options)?;
        zip.write_all(settings.as_bytes())?;
    }

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(document_rels.as_bytes())?;

    let cursor = zip.finish()?;
    Ok((cursor.into_inner(), warnings))
}

fn load_template(opts: &ExportOptions, warnings: &mut Vec<String>) -> TemplateParts {
    let Some(bytes) = &opts.template_docx else {
        return TemplateParts::default();
    };
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes.as_slice())) {
        Ok(archive) => archive,
        Err(err) => {
            warnings.push(format!("Template is not a valid DOCX archive ({err}); using generated styles"));
            return TemplateParts::default();
        }
    };

    let mut parts = TemplateParts::default();
    parts.styles = read_zip_string(&mut archive, "word/styles.xml");
    if parts.styles.is_none() {
        warnings.push("Template has no word/styles.xml; using generated styles".to_string());
    }
    parts.theme = read_zip_bytes(&mut archive, "word/theme/theme1.xml");
    parts.settings = read_zip_string(&mut archive, "word/settings.xml");
    parts
}

fn read_zip_string(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_zip_bytes(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).ok()?;
    Some(content)
}

fn package_rels_xml() -> String {
    let mut xml = XmlBuilder::with_capacity(512);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with("Relationships", &[("xmlns", REL_NS)])
        .empty_with(
            "Relationship",
            &[
                ("Id", "rId1"),
                ("Type", &format!("{REL_OFFICE}/officeDocument")),
                ("Target", "word/document.xml"),
            ],
        )
        .close("Relationships");
    xml.into_string()
}

fn document_rels_xml(
    rels: &RelRegistry,
    has_numbering: bool,
    has_comments: bool,
    template: &TemplateParts,
) -> String {
    let mut xml = XmlBuilder::with_capacity(1024);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with("Relationships", &[("xmlns", REL_NS)]);
    xml.empty_with(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", &format!("{REL_OFFICE}/styles")),
            ("Target", "styles.xml"),
        ],
    );
    if has_numbering {
        xml.empty_with(
            "Relationship",
            &[
                ("Id", "rId2"),
                ("Type", &format!("{REL_OFFICE}/numbering")),
                ("Target", "numbering.xml"),
            ],
        );
    }
    if has_comments {
        xml.empty_with(
            "Relationship",
            &[
                ("Id", "rId3"),
                ("Type", &format!("{REL_OFFICE}/comments")),
                ("Target", "comments.xml"),
            ],
        );
    }
    if template.theme.is_some() {
        xml.empty_with(
            "Relationship",
            &[
                ("Id", "rId4"),
                ("Type", &format!("{REL_OFFICE}/theme")),
                ("Target", "theme/theme1.xml"),
            ],
        );
    }
    if template.settings.is_some() {
        xml.empty_with(
            "Relationship",
            &[
                ("Id", "rId5"),
                ("Type", &format!("{REL_OFFICE}/settings")),
                ("Target", "settings.xml"),
            ],
        );
    }
    for (rid, url) in &rels.hyperlinks {
        xml.empty_with(
            "Relationship",
            &[
                ("Id", rid),
                ("Type", &format!("{REL_OFFICE}/hyperlink")),
                ("Target", url),
                ("TargetMode", "External"),
            ],
        );
    }
    xml.close("Relationships");
    xml.into_string()
}

fn content_types_xml(has_numbering: bool, has_comments: bool, template: &TemplateParts) -> String {
    let mut xml = XmlBuilder::with_capacity(1024);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    );
    xml.empty_with(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    );
    xml.empty_with("Default", &[("Extension", "xml"), ("ContentType", "application/xml")]);
    let overrides: &[(&str, &str, bool)] = &[
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            true,
        ),
        (
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            true,
        ),
        (
            "/word/numbering.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
            has_numbering,
        ),
        (
            "/word/comments.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml",
            has_comments,
        ),
        (
            "/word/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml",
            template.theme.is_some(),
        ),
        (
            "/word/settings.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml",
            template.settings.is_some(),
        ),
    ];
    for (part, content_type, present) in overrides {
        if *present {
            xml.empty_with("Override", &[("PartName", part), ("ContentType", content_type)]);
        }
    }
    xml.close("Types");
    xml.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenizerOptions, tokenize};

    fn export(md: &str) -> (Vec<u8>, Vec<String>) {
        let (tokens, _) = tokenize(md, &TokenizerOptions::default());
        write_docx(
            &Frontmatter::default(),
            &tokens,
            &BibStore::new(),
            &ExportOptions::default(),
        )
        .unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> Option<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        Some(content)
    }

    #[test]
    fn test_minimal_archive_parts() {
        let (bytes, _) = export("hello\n");
        assert!(read_part(&bytes, "[Content_Types].xml").is_some());
        assert!(read_part(&bytes, "_rels/.rels").is_some());
        assert!(read_part(&bytes, "word/document.xml").unwrap().contains("hello"));
        assert!(read_part(&bytes, "word/styles.xml").is_some());
        assert!(read_part(&bytes, "word/numbering.xml").is_none());
        assert!(read_part(&bytes, "word/comments.xml").is_none());
    }

    #[test]
    fn test_list_produces_numbering_part() {
        let (bytes, _) = export("- a\n- b\n");
        assert!(read_part(&bytes, "word/numbering.xml").is_some());
        let ct = read_part(&bytes, "[Content_Types].xml").unwrap();
        assert!(ct.contains("/word/numbering.xml"));
    }

    #[test]
    fn test_comment_produces_comments_part() {
        let (bytes, _) = export("{==x==} {>>note<<}\n");
        let comments = read_part(&bytes, "word/comments.xml").unwrap();
        assert!(comments.contains("note"));
        let rels = read_part(&bytes, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains("comments.xml"));
    }

    #[test]
    fn test_hyperlink_relationship() {
        let (bytes, _) = export("[x](https://example.com)\n");
        let rels = read_part(&bytes, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains("https://example.com"));
        assert!(rels.contains("TargetMode=\"External\""));
    }

    #[test]
    fn test_csl_warning_without_callback() {
        let (tokens, _) = tokenize("x\n", &TokenizerOptions::default());
        let fm = Frontmatter {
            csl: Some("apa".to_string()),
            ..Default::default()
        };
        let (_, warnings) = write_docx(&fm, &tokens, &BibStore::new(), &ExportOptions::default()).unwrap();
        assert!(warnings.iter().any(|w| w.contains("apa")));
    }
}
