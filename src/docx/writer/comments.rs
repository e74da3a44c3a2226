//!
//! comments.xml generation.

use crate::docx::model::Comment;
use crate::docx::xml::XmlBuilder;

/// Generate comments.xml for the collected comment entries. Newlines in a
/// merged comment body become separate paragraphs.
pub fn generate_comments_xml(comments: &[Comment]) -> String {
    let mut xml = XmlBuilder::with_capacity(2 * 1024);
    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.open_with(
        "w:comments",
        &[(
            "xmlns:w",
            "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        )],
    );

    for comment in comments {
        xml.open_with(
            "w:comment",
            &[
                ("w:id", comment.id.to_string().as_str()),
                ("w:author", &comment.author),
                ("w:date", &comment.date),
                ("w:initials", initials(&comment.author).as_str()),
            ],
        );
        for line in comment.text.split('\n') {
            xml.open("w:p").open("w:r").open_with("w:t", &[("xml:space", "preserve")]);
            xml.text(line);
            xml.close("w:t").close("w:r").close("w:p");
        }
        xml.close("w:comment");
    }

    xml.close("w:comments");
    xml.into_string()
}

fn initials(author: &str) -> String {
    let letters: String = author
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect();
    if letters.is_empty() { "A".to_string() } else { letters }
}
