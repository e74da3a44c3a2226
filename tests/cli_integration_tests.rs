//!
//! CLI behavior: direction dispatch by extension, output handling, exit
//! codes.

use assert_cmd::Command;
use predicates::prelude::*;

fn mdocx() -> Command {
    Command::cargo_bin("mdocx").expect("binary builds")
}

#[test]
fn test_help() {
    mdocx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--citation-key-format"))
        .stdout(predicate::str::contains("--mixed-citation-style"));
}

#[test]
fn test_version() {
    mdocx().arg("--version").assert().success();
}

#[test]
fn test_unsupported_extension_is_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "hello").unwrap();
    mdocx()
        .arg(&input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported input extension"));
}

#[test]
fn test_export_then_import() {
    let dir = tempfile::tempdir().unwrap();
    let md_path = dir.path().join("doc.md");
    std::fs::write(&md_path, "# Hello\n\nSome **bold** text.\n").unwrap();

    mdocx().arg(&md_path).assert().success();
    let docx_path = dir.path().join("doc.docx");
    assert!(docx_path.exists());

    let out_md = dir.path().join("back.md");
    mdocx().arg(&docx_path).arg("--output").arg(&out_md).assert().success();
    let back = std::fs::read_to_string(&out_md).unwrap();
    assert!(back.contains("# Hello"));
    assert!(back.contains("**bold**"));
}

#[test]
fn test_refuses_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let md_path = dir.path().join("doc.md");
    std::fs::write(&md_path, "text\n").unwrap();
    let docx_path = dir.path().join("doc.docx");
    std::fs::write(&docx_path, "existing").unwrap();

    mdocx()
        .arg(&md_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    mdocx().arg(&md_path).arg("--force").assert().success();
}

#[test]
fn test_import_writes_companion_bib() {
    let dir = tempfile::tempdir().unwrap();
    let md_path = dir.path().join("cited.md");
    std::fs::write(&md_path, "see [@smith2020]\n").unwrap();
    let bib_path = dir.path().join("refs.bib");
    std::fs::write(
        &bib_path,
        "@article{smith2020,\n  author = {Smith, John},\n  title = {Signals},\n  year = {2020},\n  zotero-key = {ABCD1234},\n  zotero-uri = {http://zotero.org/users/9/items/ABCD1234},\n}\n",
    )
    .unwrap();

    mdocx()
        .arg(&md_path)
        .arg("--bib")
        .arg(&bib_path)
        .arg("--mixed-citation-style")
        .arg("unified")
        .assert()
        .success();

    let docx_path = dir.path().join("cited.docx");
    let back_md = dir.path().join("back.md");
    mdocx()
        .arg(&docx_path)
        .arg("--output")
        .arg(&back_md)
        .arg("--citation-key-format")
        .arg("authorYear")
        .assert()
        .success();

    let companion = dir.path().join("back.bib");
    assert!(companion.exists(), "companion .bib not written");
    let bib = std::fs::read_to_string(&companion).unwrap();
    assert!(bib.contains("zotero-key = {ABCD1234}"));
    let markdown = std::fs::read_to_string(&back_md).unwrap();
    assert!(markdown.contains("[@smith2020]"));
}

#[test]
fn test_frontmatter_bibliography_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let bib_path = dir.path().join("refs.bib");
    std::fs::write(&bib_path, "@article{doe99,\n  author = {Doe, Jane},\n  year = {1999},\n}\n").unwrap();
    let md_path = dir.path().join("doc.md");
    std::fs::write(&md_path, "---\nbibliography: refs.bib\n---\n\n[@doe99]\n").unwrap();

    // No `key not found` warning means the frontmatter bibliography loaded.
    mdocx()
        .arg(&md_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("not found").not());
}
