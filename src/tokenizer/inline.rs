//!
//! Hand-rolled inline scanner. Works on the cleaned inline source of one
//! block; a segment map translates positions back to document offsets so the
//! inert-zone index can gate every domain grammar.

use crate::inert::{InertKind, InertZoneIndex};

use super::critic::{self, CriticKind};
use super::highlight::HighlightColor;
use super::{MdRun, TextStyle, citation};

/// One contiguous piece of cleaned text and its origin in the document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub clean_start: usize,
    pub doc_start: usize,
    pub len: usize,
}

/// Map a cleaned-text offset back to its document offset.
pub(crate) fn doc_pos(map: &[Segment], clean: usize) -> usize {
    if map.is_empty() {
        return clean;
    }
    let idx = map.partition_point(|seg| seg.clean_start <= clean);
    let seg = &map[idx.saturating_sub(1).min(map.len() - 1)];
    seg.doc_start + (clean - seg.clean_start.min(clean))
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    critic: bool,
    html_comment: bool,
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    map: &'a [Segment],
    inert: &'a InertZoneIndex,
    default_highlight: HighlightColor,
}

/// Scan cleaned inline source into runs.
pub(crate) fn scan(
    text: &str,
    map: &[Segment],
    inert: &InertZoneIndex,
    default_highlight: HighlightColor,
    warnings: &mut Vec<String>,
) -> Vec<MdRun> {
    let scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        map,
        inert,
        default_highlight,
    };
    scanner.parse_runs(
        0,
        text.len(),
        TextStyle::default(),
        Flags {
            critic: true,
            html_comment: true,
        },
        warnings,
    )
}

fn flush(buf: &mut String, style: TextStyle, out: &mut Vec<MdRun>) {
    if !buf.is_empty() {
        out.push(MdRun::Text {
            text: std::mem::take(buf),
            style,
        });
    }
}

/// CommonMark code-span padding: one space is stripped from each side when
/// both sides have one and the content is not all spaces.
fn strip_code_padding(content: &str) -> &str {
    if content.len() >= 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && content.chars().any(|c| c != ' ')
    {
        &content[1..content.len() - 1]
    } else {
        content
    }
}

impl<'a> Scanner<'a> {
    fn doc(&self, pos: usize) -> usize {
        doc_pos(self.map, pos)
    }

    /// Find `needle` in `[from, end)`, skipping escaped positions and inert
    /// zones. Byte-wise, so multibyte text cannot cause misaligned slicing.
    fn find_str(&self, from: usize, end: usize, needle: &str) -> Option<usize> {
        let needle = needle.as_bytes();
        let mut j = from;
        while j + needle.len() <= end {
            if self.bytes[j] == b'\\' {
                j += 2;
                continue;
            }
            if self.inert.is_inside(self.doc(j)) {
                j += 1;
                continue;
            }
            if self.bytes[j..].starts_with(needle) {
                return Some(j);
            }
            j += 1;
        }
        None
    }

    /// Find a closing delimiter run of exactly-or-longer length `n` of `ch`,
    /// requiring a non-whitespace character before it (right-flanking) and a
    /// non-empty interior.
    fn find_emphasis_close(&self, from: usize, end: usize, ch: u8, n: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            if self.bytes[j] == b'\\' {
                j += 2;
                continue;
            }
            if self.inert.is_inside(self.doc(j)) {
                j += 1;
                continue;
            }
            if self.bytes[j] == ch {
                let run = self.bytes[j..end].iter().take_while(|&&b| b == ch).count();
                if run >= n && j > from && !self.bytes[j - 1].is_ascii_whitespace() {
                    return Some(j);
                }
                j += run;
            } else {
                j += 1;
            }
        }
        None
    }

    /// Find a run of exactly `n` backticks.
    fn find_backtick_run(&self, from: usize, end: usize, n: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            if self.bytes[j] == b'`' {
                let run = self.bytes[j..end].iter().take_while(|&&b| b == b'`').count();
                if run == n {
                    return Some(j);
                }
                j += run;
            } else {
                j += 1;
            }
        }
        None
    }

    fn parse_runs(
        &self,
        start: usize,
        end: usize,
        style: TextStyle,
        flags: Flags,
        warnings: &mut Vec<String>,
    ) -> Vec<MdRun> {
        let mut out = Vec::new();
        let mut buf = String::new();
        let mut i = start;

        while i < end {
            match self.bytes[i] {
                b'\\' if i + 1 < end => {
                    let next = self.bytes[i + 1];
                    if next == b'\n' {
                        flush(&mut buf, style, &mut out);
                        out.push(MdRun::HardBreak);
                        i += 2;
                    } else if next.is_ascii_punctuation() {
                        buf.push(next as char);
                        i += 2;
                    } else {
                        buf.push('\\');
                        i += 1;
                    }
                }
                b'\n' => {
                    if buf.ends_with("  ") {
                        while buf.ends_with(' ') {
                            buf.pop();
                        }
                        flush(&mut buf, style, &mut out);
                        out.push(MdRun::HardBreak);
                    } else {
                        while buf.ends_with(' ') {
                            buf.pop();
                        }
                        buf.push(' ');
                    }
                    i += 1;
                }
                b'`' => {
                    let zone = self
                        .inert
                        .zone_starting_at(self.doc(i))
                        .filter(|z| z.kind == InertKind::InlineCode);
                    if zone.is_some() {
                        let open = self.bytes[i..end].iter().take_while(|&&b| b == b'`').count();
                        if let Some(close) = self.find_backtick_run(i + open, end, open) {
                            flush(&mut buf, style, &mut out);
                            let content = strip_code_padding(&self.text[i + open..close]).replace('\n', " ");
                            let mut code_style = style;
                            code_style.code = true;
                            out.push(MdRun::Text {
                                text: content,
                                style: code_style,
                            });
                            i = close + open;
                            continue;
                        }
                    }
                    buf.push('`');
                    i += 1;
                }
                b'$' => {
                    match self.inert.zone_starting_at(self.doc(i)).map(|z| z.kind) {
                        Some(InertKind::MathInline) => {
                            if let Some(close) = self.find_math_close(i + 1, end) {
                                flush(&mut buf, style, &mut out);
                                out.push(MdRun::InlineMath {
                                    latex: self.text[i + 1..close].to_string(),
                                });
                                i = close + 1;
                                continue;
                            }
                        }
                        Some(InertKind::MathBlock) => {
                            if let Some(close) = self.find_str(i + 2, end, "$$") {
                                flush(&mut buf, style, &mut out);
                                out.push(MdRun::InlineMath {
                                    latex: self.text[i + 2..close].trim().to_string(),
                                });
                                i = close + 2;
                                continue;
                            }
                        }
                        _ => {}
                    }
                    buf.push('$');
                    i += 1;
                }
                b'{' if flags.critic => {
                    if let Some(kind) = critic::detect_opener(&self.text[i..end]) {
                        if let Some(next) = self.parse_critic(i, end, kind, style, flags, &mut buf, &mut out, warnings)
                        {
                            i = next;
                            continue;
                        }
                    } else if let Some((len, id)) = critic::parse_range_mark(&self.text[i..end]) {
                        flush(&mut buf, style, &mut out);
                        out.push(MdRun::CriticRangeEnd { id });
                        i += len;
                        continue;
                    } else if let Some((len, id, body)) = critic::parse_id_comment(&self.text[i..end]) {
                        let meta = critic::parse_comment_meta(&body);
                        flush(&mut buf, style, &mut out);
                        out.push(MdRun::CriticComment {
                            text: meta.text,
                            author: meta.author,
                            date: meta.date,
                            id: Some(id),
                            leading_ws: String::new(),
                            anchored: false,
                        });
                        i += len;
                        continue;
                    }
                    buf.push('{');
                    i += 1;
                }
                b'=' if i + 1 < end && self.bytes[i + 1] == b'=' => {
                    if let Some(next) = self.parse_highlight(i, end, style, flags, &mut buf, &mut out, warnings) {
                        i = next;
                        continue;
                    }
                    buf.push_str("==");
                    i += 2;
                }
                b'*' | b'_' => {
                    let ch = self.bytes[i];
                    if let Some(next) = self.parse_emphasis(i, end, ch, style, flags, &mut buf, &mut out, warnings) {
                        i = next;
                        continue;
                    }
                    buf.push(ch as char);
                    i += 1;
                }
                b'~' => {
                    if i + 1 < end && self.bytes[i + 1] == b'~' {
                        if let Some(close) = self.find_str(i + 2, end, "~~").filter(|&c| c > i + 2) {
                            let mut inner = style;
                            inner.strike = true;
                            flush(&mut buf, style, &mut out);
                            out.extend(self.parse_runs(i + 2, close, inner, flags, warnings));
                            i = close + 2;
                            continue;
                        }
                        buf.push_str("~~");
                        i += 2;
                        continue;
                    }
                    if let Some(close) = self.find_tight_close(i + 1, end, b'~') {
                        let mut inner = style;
                        inner.sub = true;
                        flush(&mut buf, style, &mut out);
                        out.extend(self.parse_runs(i + 1, close, inner, flags, warnings));
                        i = close + 1;
                        continue;
                    }
                    buf.push('~');
                    i += 1;
                }
                b'^' => {
                    if let Some(close) = self.find_tight_close(i + 1, end, b'^') {
                        let mut inner = style;
                        inner.sup = true;
                        flush(&mut buf, style, &mut out);
                        out.extend(self.parse_runs(i + 1, close, inner, flags, warnings));
                        i = close + 1;
                        continue;
                    }
                    buf.push('^');
                    i += 1;
                }
                b'<' => {
                    if let Some(next) = self.parse_angle(i, end, style, flags, &mut buf, &mut out, warnings) {
                        i = next;
                        continue;
                    }
                    buf.push('<');
                    i += 1;
                }
                b'[' => {
                    if let Some((len, items)) = citation::try_parse(&self.text[i..end]) {
                        flush(&mut buf, style, &mut out);
                        out.push(MdRun::Citation { items });
                        i += len;
                        continue;
                    }
                    if let Some((run, next)) = self.parse_link(i, end, style, flags, warnings) {
                        flush(&mut buf, style, &mut out);
                        out.push(run);
                        i = next;
                        continue;
                    }
                    buf.push('[');
                    i += 1;
                }
                _ => {
                    let ch = self.text[i..].chars().next().unwrap_or('\u{fffd}');
                    buf.push(ch);
                    i += ch.len_utf8();
                }
            }
        }

        flush(&mut buf, style, &mut out);
        out
    }

    /// Closing `$` for inline math: same line, unescaped, not preceded by
    /// whitespace.
    fn find_math_close(&self, from: usize, end: usize) -> Option<usize> {
        let mut j = from;
        while j < end && self.bytes[j] != b'\n' {
            if self.bytes[j] == b'\\' {
                j += 2;
                continue;
            }
            if self.bytes[j] == b'$' && j > from && !self.bytes[j - 1].is_ascii_whitespace() {
                return Some(j);
            }
            j += 1;
        }
        None
    }

    /// Closing delimiter with no whitespace anywhere in the interior
    /// (superscript/subscript rule).
    fn find_tight_close(&self, from: usize, end: usize, ch: u8) -> Option<usize> {
        let mut j = from;
        while j < end {
            let b = self.bytes[j];
            if b == b'\\' {
                j += 2;
                continue;
            }
            if b == ch {
                return (j > from).then_some(j);
            }
            if b.is_ascii_whitespace() {
                return None;
            }
            j += 1;
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_emphasis(
        &self,
        i: usize,
        end: usize,
        ch: u8,
        style: TextStyle,
        flags: Flags,
        buf: &mut String,
        out: &mut Vec<MdRun>,
        warnings: &mut Vec<String>,
    ) -> Option<usize> {
        let run = self.bytes[i..end].iter().take_while(|&&b| b == ch).count().min(3);
        // The opener must be left-flanking: no whitespace after it. An
        // underscore inside a word never opens emphasis.
        let content_start = i + run;
        if content_start >= end || self.bytes[content_start].is_ascii_whitespace() {
            return None;
        }
        if ch == b'_' && i > 0 && self.bytes[i - 1].is_ascii_alphanumeric() {
            return None;
        }

        for take in (1..=run).rev() {
            let open = i + take;
            if let Some(close) = self.find_emphasis_close(open, end, ch, take) {
                let mut inner = style;
                match take {
                    3 => {
                        inner.bold = true;
                        inner.italic = true;
                    }
                    2 => inner.bold = true,
                    _ => inner.italic = true,
                }
                flush(buf, style, out);
                out.extend(self.parse_runs(open, close, inner, flags, warnings));
                return Some(close + take);
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_highlight(
        &self,
        i: usize,
        end: usize,
        style: TextStyle,
        flags: Flags,
        buf: &mut String,
        out: &mut Vec<MdRun>,
        warnings: &mut Vec<String>,
    ) -> Option<usize> {
        let close = self.find_str(i + 2, end, "==").filter(|&c| c > i + 2)?;
        let mut after = close + 2;

        let mut color = None;
        if after < end && self.bytes[after] == b'{' {
            if let Some(len) = self.bytes[after + 1..end].iter().position(|&b| b == b'}') {
                let id = &self.text[after + 1..after + 1 + len];
                if !id.is_empty()
                    && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                {
                    color = Some(HighlightColor::from_id(id).unwrap_or_else(|| {
                        warnings.push(format!(
                            "Unrecognized highlight color `{id}`, using `{}`",
                            self.default_highlight.id()
                        ));
                        self.default_highlight
                    }));
                    after = after + 1 + len + 1;
                }
            }
        }

        let mut inner = style;
        inner.highlight = Some(color.unwrap_or(self.default_highlight));
        flush(buf, style, out);
        out.extend(self.parse_runs(i + 2, close, inner, flags, warnings));
        Some(after)
    }

    /// CriticMarkup element at `i`. Returns the next scan position, or None
    /// when the closer is missing (the sigil is then literal text).
    #[allow(clippy::too_many_arguments)]
    fn parse_critic(
        &self,
        i: usize,
        end: usize,
        kind: CriticKind,
        style: TextStyle,
        flags: Flags,
        buf: &mut String,
        out: &mut Vec<MdRun>,
        warnings: &mut Vec<String>,
    ) -> Option<usize> {
        let interior_start = i + 3;
        let close = self.find_str(interior_start, end, kind.closer())?;
        let inner_flags = Flags {
            critic: false,
            html_comment: false,
        };
        let mut after = close + 3;

        flush(buf, style, out);
        match kind {
            CriticKind::Insertion => {
                let children = self.parse_runs(interior_start, close, style, inner_flags, warnings);
                out.push(MdRun::CriticIns { children });
            }
            CriticKind::Deletion => {
                let children = self.parse_runs(interior_start, close, style, inner_flags, warnings);
                out.push(MdRun::CriticDel { children });
            }
            CriticKind::Substitution => {
                let sep = self.find_str(interior_start, close, "~>");
                match sep {
                    Some(sep) => {
                        let old = self.parse_runs(interior_start, sep, style, inner_flags, warnings);
                        let new = self.parse_runs(sep + 2, close, style, inner_flags, warnings);
                        out.push(MdRun::CriticSub { old, new });
                    }
                    None => {
                        warnings.push("Substitution without `~>` separator treated as insertion".to_string());
                        let children = self.parse_runs(interior_start, close, style, inner_flags, warnings);
                        out.push(MdRun::CriticIns { children });
                    }
                }
            }
            CriticKind::Highlight => {
                let children = self.parse_runs(interior_start, close, style, inner_flags, warnings);
                let mut id = None;
                if let Some((len, mark_id)) = critic::parse_range_mark(&self.text[after..end]) {
                    id = Some(mark_id);
                    after += len;
                }
                out.push(MdRun::CriticHighlight { children, id });
            }
            CriticKind::Comment => {
                let meta = critic::parse_comment_meta(&self.text[interior_start..close]);
                out.push(MdRun::CriticComment {
                    text: meta.text,
                    author: meta.author,
                    date: meta.date,
                    id: None,
                    leading_ws: String::new(),
                    anchored: false,
                });
            }
        }

        // A comment separated from the element only by whitespace anchors to
        // it; the whitespace is preserved on the comment run.
        if !matches!(kind, CriticKind::Comment) {
            loop {
                let ws_start = after;
                let mut j = after;
                while j < end && matches!(self.bytes[j], b' ' | b'\t' | b'\n') {
                    j += 1;
                }
                if self.bytes[j..end.min(self.bytes.len())].starts_with(b"{>>") {
                    if let Some(comment_close) = self.find_str(j + 3, end, "<<}") {
                        let meta = critic::parse_comment_meta(&self.text[j + 3..comment_close]);
                        out.push(MdRun::CriticComment {
                            text: meta.text,
                            author: meta.author,
                            date: meta.date,
                            id: None,
                            leading_ws: self.text[ws_start..j].to_string(),
                            anchored: true,
                        });
                        after = comment_close + 3;
                        continue;
                    }
                }
                after = ws_start;
                break;
            }
        }

        Some(after)
    }

    /// `<...>` constructs: HTML comments, `<u>` underline, autolinks.
    #[allow(clippy::too_many_arguments)]
    fn parse_angle(
        &self,
        i: usize,
        end: usize,
        style: TextStyle,
        flags: Flags,
        buf: &mut String,
        out: &mut Vec<MdRun>,
        warnings: &mut Vec<String>,
    ) -> Option<usize> {
        let rest = &self.bytes[i..end];
        if rest.starts_with(b"<!--") {
            if !flags.html_comment {
                return None;
            }
            let close = self.find_str(i + 4, end, "-->")?;
            flush(buf, style, out);
            out.push(MdRun::HtmlComment {
                text: self.text[i + 4..close].to_string(),
            });
            return Some(close + 3);
        }
        if rest.starts_with(b"<u>") {
            let close = self.find_str(i + 3, end, "</u>")?;
            let mut inner = style;
            inner.underline = true;
            flush(buf, style, out);
            out.extend(self.parse_runs(i + 3, close, inner, flags, warnings));
            return Some(close + 4);
        }
        if rest.starts_with(b"<http://") || rest.starts_with(b"<https://") || rest.starts_with(b"<mailto:") {
            let close = self.find_str(i + 1, end, ">")?;
            let url = self.text[i + 1..close].to_string();
            flush(buf, style, out);
            out.push(MdRun::Link {
                children: vec![MdRun::Text {
                    text: url.clone(),
                    style,
                }],
                url,
            });
            return Some(close + 1);
        }
        None
    }

    /// `[text](url)` links.
    fn parse_link(
        &self,
        i: usize,
        end: usize,
        style: TextStyle,
        flags: Flags,
        warnings: &mut Vec<String>,
    ) -> Option<(MdRun, usize)> {
        let mut depth = 1usize;
        let mut j = i + 1;
        while j < end {
            match self.bytes[j] {
                b'\\' => j += 1,
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        if depth != 0 || self.bytes.get(j + 1) != Some(&b'(') {
            return None;
        }

        let mut paren_depth = 1usize;
        let mut k = j + 2;
        while k < end {
            match self.bytes[k] {
                b'\\' => k += 1,
                b'(' => paren_depth += 1,
                b')' => {
                    paren_depth -= 1;
                    if paren_depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            k += 1;
        }
        if paren_depth != 0 {
            return None;
        }

        let children = self.parse_runs(i + 1, j, style, flags, warnings);
        let url = self.text[j + 2..k].trim().to_string();
        Some((MdRun::Link { url, children }, k + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{MdToken, TokenizerOptions, tokenize};

    fn runs(text: &str) -> Vec<MdRun> {
        let (tokens, _) = tokenize(text, &TokenizerOptions::default());
        match tokens.into_iter().next() {
            Some(MdToken::Paragraph { children }) => children,
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    fn warnings_of(text: &str) -> Vec<String> {
        tokenize(text, &TokenizerOptions::default()).1
    }

    fn plain(text: &str) -> MdRun {
        MdRun::Text {
            text: text.to_string(),
            style: TextStyle::default(),
        }
    }

    #[test]
    fn test_emphasis_nesting() {
        let got = runs("a **bold** and *it* end\n");
        assert_eq!(got.len(), 5);
        assert_eq!(got[0], plain("a "));
        assert_eq!(
            got[1],
            MdRun::Text {
                text: "bold".into(),
                style: TextStyle {
                    bold: true,
                    ..Default::default()
                }
            }
        );
        assert_eq!(
            got[3],
            MdRun::Text {
                text: "it".into(),
                style: TextStyle {
                    italic: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_triple_emphasis() {
        let got = runs("***both***\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "both".into(),
                style: TextStyle {
                    bold: true,
                    italic: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_code_span_inert() {
        let got = runs("before `{++added++}` after\n");
        assert_eq!(got.len(), 3);
        assert_eq!(
            got[1],
            MdRun::Text {
                text: "{++added++}".into(),
                style: TextStyle {
                    code: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_critic_insertion_and_deletion() {
        let got = runs("{++new++} and {--old--}\n");
        assert_eq!(got[0], MdRun::CriticIns { children: vec![plain("new")] });
        assert_eq!(got[2], MdRun::CriticDel { children: vec![plain("old")] });
    }

    #[test]
    fn test_critic_substitution() {
        let got = runs("{~~typo~>fixed~~}\n");
        assert_eq!(
            got[0],
            MdRun::CriticSub {
                old: vec![plain("typo")],
                new: vec![plain("fixed")],
            }
        );
    }

    #[test]
    fn test_anchored_comment_with_whitespace() {
        let got = runs("{==text==} {>>comment<<}\n");
        assert_eq!(
            got[0],
            MdRun::CriticHighlight {
                children: vec![plain("text")],
                id: None,
            }
        );
        match &got[1] {
            MdRun::CriticComment {
                text,
                leading_ws,
                anchored,
                ..
            } => {
                assert_eq!(text, "comment");
                assert_eq!(leading_ws, " ");
                assert!(anchored);
            }
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn test_comment_author_date() {
        let got = runs("{>>jane (2024-03-01 14:30): check this<<}\n");
        match &got[0] {
            MdRun::CriticComment {
                text, author, date, anchored, ..
            } => {
                assert_eq!(text, "check this");
                assert_eq!(author.as_deref(), Some("jane"));
                assert_eq!(date.as_deref(), Some("2024-03-01 14:30"));
                assert!(!anchored);
            }
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn test_id_forms() {
        let got = runs("{==range start==}{##r1} middle {##r1} {#r1>>the body<<}\n");
        assert_eq!(
            got[0],
            MdRun::CriticHighlight {
                children: vec![plain("range start")],
                id: Some("r1".into()),
            }
        );
        assert!(matches!(&got[2], MdRun::CriticRangeEnd { id } if id == "r1"));
        assert!(
            matches!(&got[4], MdRun::CriticComment { id: Some(id), text, .. } if id == "r1" && text == "the body")
        );
    }

    #[test]
    fn test_format_highlight_with_color() {
        let got = runs("==alert=={red}\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "alert".into(),
                style: TextStyle {
                    highlight: Some(HighlightColor::Red),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_format_highlight_default_color() {
        let got = runs("==note==\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "note".into(),
                style: TextStyle {
                    highlight: Some(HighlightColor::Yellow),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_unknown_color_falls_back_with_warning() {
        let warnings = warnings_of("==x=={chartreuse}\n");
        assert!(warnings.iter().any(|w| w.contains("chartreuse")));
        let got = runs("==x=={chartreuse}\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "x".into(),
                style: TextStyle {
                    highlight: Some(HighlightColor::Yellow),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_html_comment_inline() {
        let got = runs("text <!-- hidden --> more\n");
        assert_eq!(got.len(), 3);
        assert_eq!(got[1], MdRun::HtmlComment { text: " hidden ".into() });
    }

    #[test]
    fn test_html_comment_not_in_critic() {
        let got = runs("{++keep <!-- x --> it++}\n");
        match &got[0] {
            MdRun::CriticIns { children } => {
                assert_eq!(children, &[plain("keep <!-- x --> it")]);
            }
            other => panic!("expected insertion, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_math_run() {
        let got = runs("value $x^2$ grows\n");
        assert_eq!(got[1], MdRun::InlineMath { latex: "x^2".into() });
    }

    #[test]
    fn test_citation_run() {
        let got = runs("see [@smith2020, p. 20; @jones2019]\n");
        match &got[1] {
            MdRun::Citation { items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].locator.as_deref(), Some("p. 20"));
            }
            other => panic!("expected citation, got {other:?}"),
        }
    }

    #[test]
    fn test_citation_inside_code_is_inert() {
        let got = runs("`[@smith2020]`\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "[@smith2020]".into(),
                style: TextStyle {
                    code: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_link() {
        let got = runs("a [label](https://example.com) b\n");
        assert_eq!(
            got[1],
            MdRun::Link {
                url: "https://example.com".into(),
                children: vec![plain("label")],
            }
        );
    }

    #[test]
    fn test_underline_tag() {
        let got = runs("<u>under</u>\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "under".into(),
                style: TextStyle {
                    underline: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_superscript_subscript() {
        let got = runs("E=mc^2^ and H~2~O\n");
        assert!(got.iter().any(|r| matches!(r, MdRun::Text { text, style } if text == "2" && style.sup)));
        assert!(got.iter().any(|r| matches!(r, MdRun::Text { text, style } if text == "2" && style.sub)));
    }

    #[test]
    fn test_strikethrough() {
        let got = runs("~~gone~~\n");
        assert_eq!(
            got[0],
            MdRun::Text {
                text: "gone".into(),
                style: TextStyle {
                    strike: true,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_soft_break_becomes_space() {
        let got = runs("line one\nline two\n");
        assert_eq!(got, vec![plain("line one line two")]);
    }

    #[test]
    fn test_unclosed_critic_is_literal() {
        let got = runs("{++never closed\n");
        assert_eq!(got, vec![plain("{++never closed")]);
    }

    #[test]
    fn test_escaped_sigils() {
        let got = runs("\\{++not critic++}\n");
        assert_eq!(got, vec![plain("{++not critic++}")]);
    }
}
