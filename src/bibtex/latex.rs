//!
//! LaTeX escape handling for BibTeX field values. Parsing turns accent
//! sequences and escaped specials into Unicode; serialization escapes the
//! BibTeX special characters so the output parses back to the same value.

use phf::phf_map;

/// Standalone LaTeX commands that map to a single Unicode string.
static COMMAND_CHARS: phf::Map<&'static str, &'static str> = phf_map! {
    "ss" => "\u{00df}", // ß
    "o" => "\u{00f8}",
    "O" => "\u{00d8}",
    "l" => "\u{0142}",
    "L" => "\u{0141}",
    "ae" => "\u{00e6}",
    "AE" => "\u{00c6}",
    "oe" => "\u{0153}",
    "OE" => "\u{0152}",
    "aa" => "\u{00e5}",
    "AA" => "\u{00c5}",
    "i" => "\u{0131}",
    "j" => "\u{0237}",
};

/// Compose an accent command with its base character.
///
/// Covers the precomposed range that BibTeX exports actually use; anything
/// outside it is left verbatim by the caller.
fn compose(accent: char, base: char) -> Option<char> {
    let composed = match (accent, base) {
        ('\'', 'a') => 'á', ('\'', 'e') => 'é', ('\'', 'i') => 'í',
        ('\'', 'o') => 'ó', ('\'', 'u') => 'ú', ('\'', 'y') => 'ý',
        ('\'', 'c') => 'ć', ('\'', 'n') => 'ń', ('\'', 's') => 'ś', ('\'', 'z') => 'ź',
        ('\'', 'A') => 'Á', ('\'', 'E') => 'É', ('\'', 'I') => 'Í',
        ('\'', 'O') => 'Ó', ('\'', 'U') => 'Ú', ('\'', 'Y') => 'Ý',
        ('\'', 'C') => 'Ć', ('\'', 'N') => 'Ń', ('\'', 'S') => 'Ś', ('\'', 'Z') => 'Ź',
        ('`', 'a') => 'à', ('`', 'e') => 'è', ('`', 'i') => 'ì',
        ('`', 'o') => 'ò', ('`', 'u') => 'ù',
        ('`', 'A') => 'À', ('`', 'E') => 'È', ('`', 'I') => 'Ì',
        ('`', 'O') => 'Ò', ('`', 'U') => 'Ù',
        ('"', 'a') => 'ä', ('"', 'e') => 'ë', ('"', 'i') => 'ï',
        ('"', 'o') => 'ö', ('"', 'u') => 'ü', ('"', 'y') => 'ÿ',
        ('"', 'A') => 'Ä', ('"', 'E') => 'Ë', ('"', 'I') => 'Ï',
        ('"', 'O') => 'Ö', ('"', 'U') => 'Ü',
        ('^', 'a') => 'â', ('^', 'e') => 'ê', ('^', 'i') => 'î',
        ('^', 'o') => 'ô', ('^', 'u') => 'û',
        ('^', 'A') => 'Â', ('^', 'E') => 'Ê', ('^', 'I') => 'Î',
        ('^', 'O') => 'Ô', ('^', 'U') => 'Û',
        ('~', 'a') => 'ã', ('~', 'n') => 'ñ', ('~', 'o') => 'õ',
        ('~', 'A') => 'Ã', ('~', 'N') => 'Ñ', ('~', 'O') => 'Õ',
        ('c', 'c') => 'ç', ('c', 'C') => 'Ç',
        ('v', 'c') => 'č', ('v', 's') => 'š', ('v', 'z') => 'ž',
        ('v', 'r') => 'ř', ('v', 'e') => 'ě', ('v', 'd') => 'ď',
        ('v', 't') => 'ť', ('v', 'n') => 'ň',
        ('v', 'C') => 'Č', ('v', 'S') => 'Š', ('v', 'Z') => 'Ž', ('v', 'R') => 'Ř',
        ('u', 'a') => 'ă', ('u', 'g') => 'ğ', ('u', 'A') => 'Ă', ('u', 'G') => 'Ğ',
        ('=', 'a') => 'ā', ('=', 'e') => 'ē', ('=', 'i') => 'ī',
        ('=', 'o') => 'ō', ('=', 'u') => 'ū',
        ('.', 'z') => 'ż', ('.', 'Z') => 'Ż', ('.', 'e') => 'ė',
        ('k', 'a') => 'ą', ('k', 'e') => 'ę', ('k', 'A') => 'Ą', ('k', 'E') => 'Ę',
        ('H', 'o') => 'ő', ('H', 'u') => 'ű', ('H', 'O') => 'Ő', ('H', 'U') => 'Ű',
        ('r', 'a') => 'å', ('r', 'A') => 'Å', ('r', 'u') => 'ů',
        _ => return None,
    };
    Some(composed)
}

fn is_accent_command(ch: char) -> bool {
    matches!(ch, '\'' | '`' | '"' | '^' | '~' | '=' | '.' | 'c' | 'v' | 'u' | 'k' | 'H' | 'r')
}

/// Try to consume a single LaTeX escape starting at `\` (byte position
/// `pos` points at the backslash). Returns the replacement string and the
/// number of chars consumed, or None to leave the sequence verbatim.
fn take_escape(chars: &[char], pos: usize) -> Option<(String, usize)> {
    debug_assert_eq!(chars[pos], '\\');
    let next = *chars.get(pos + 1)?;

    // Escaped specials: \& \% \$ \# \_ \{ \}
    if matches!(next, '&' | '%' | '$' | '#' | '_' | '{' | '}') {
        return Some((next.to_string(), 2));
    }
    // \~{} and \^{} are escaped tilde/caret; bare \~x / \^x are accents.
    if matches!(next, '~' | '^') && chars.get(pos + 2) == Some(&'{') && chars.get(pos + 3) == Some(&'}') {
        return Some((next.to_string(), 4));
    }
    // \textbackslash{} for a literal backslash
    let rest: String = chars[pos + 1..].iter().collect();
    if rest.starts_with("textbackslash{}") {
        return Some(("\\".to_string(), 1 + "textbackslash{}".len()));
    }

    if is_accent_command(next) {
        // \'e form
        if let Some(&base) = chars.get(pos + 2) {
            if base.is_ascii_alphabetic() {
                // Letter accents (\c, \v, ...) need a brace or space separator
                // to be unambiguous; the symbol accents compose directly.
                if !next.is_ascii_alphabetic() {
                    if let Some(composed) = compose(next, base) {
                        return Some((composed.to_string(), 3));
                    }
                }
            }
            // \'{e} and \c{c} forms
            if base == '{'
                && chars.get(pos + 4) == Some(&'}')
                && let Some(&inner) = chars.get(pos + 3)
                && let Some(composed) = compose(next, inner)
            {
                return Some((composed.to_string(), 5));
            }
            // \c c and \v s forms (letter accent + space + base)
            if next.is_ascii_alphabetic()
                && base == ' '
                && let Some(&inner) = chars.get(pos + 3)
                && let Some(composed) = compose(next, inner)
            {
                return Some((composed.to_string(), 4));
            }
        }
    }

    // Standalone commands: \ss \o \ae ... terminated by non-letter
    let mut end = pos + 1;
    while end < chars.len() && chars[end].is_ascii_alphabetic() {
        end += 1;
    }
    if end > pos + 1 {
        let name: String = chars[pos + 1..end].iter().collect();
        if let Some(replacement) = COMMAND_CHARS.get(name.as_str()) {
            // Swallow an empty trailing group (\ss{}) or the terminating space (\ss e)
            let consumed = if chars.get(end) == Some(&'{') && chars.get(end + 1) == Some(&'}') {
                end - pos + 2
            } else if chars.get(end) == Some(&' ') {
                end - pos + 1
            } else {
                end - pos
            };
            return Some((replacement.to_string(), consumed));
        }
    }

    None
}

/// Unescape LaTeX sequences in a parsed field value.
///
/// Unknown commands are left verbatim. `{\'e}`-style braced accents lose
/// their wrapping braces; other brace groups are preserved.
pub fn unescape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if let Some((replacement, consumed)) = take_escape(&chars, i) {
                    out.push_str(&replacement);
                    i += consumed;
                } else {
                    out.push('\\');
                    i += 1;
                }
            }
            '{' if chars.get(i + 1) == Some(&'\\') => {
                // {\'e} -> é when the group holds exactly one escape
                if let Some((replacement, consumed)) = take_escape(&chars, i + 1) {
                    if chars.get(i + 1 + consumed) == Some(&'}') {
                        out.push_str(&replacement);
                        i += consumed + 2;
                        continue;
                    }
                }
                out.push('{');
                i += 1;
            }
            ch => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

/// Escape the BibTeX special characters in a value for serialization.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '$' => out.push_str("\\$"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '~' => out.push_str("\\~{}"),
            '^' => out.push_str("\\^{}"),
            '\\' => out.push_str("\\textbackslash{}"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_accents() {
        assert_eq!(unescape(r"Caf\'e"), "Café");
        assert_eq!(unescape(r#"M\"uller"#), "Müller");
        assert_eq!(unescape(r"{\'e}tude"), "étude");
        assert_eq!(unescape(r"Fran\c{c}ois"), "François");
        assert_eq!(unescape(r"\v{S}koda"), "Škoda");
    }

    #[test]
    fn test_unescape_specials() {
        assert_eq!(unescape(r"AT\&T"), "AT&T");
        assert_eq!(unescape(r"100\%"), "100%");
        assert_eq!(unescape(r"a\_b"), "a_b");
        assert_eq!(unescape(r"\{x\}"), "{x}");
        assert_eq!(unescape(r"a\~{}b"), "a~b");
    }

    #[test]
    fn test_unescape_commands() {
        assert_eq!(unescape(r"Stra\ss e"), "Straße"); // trailing space is the terminator
        assert_eq!(unescape(r"\ss{}"), "ß");
        assert_eq!(unescape(r"\o re"), "øre");
    }

    #[test]
    fn test_unknown_command_verbatim() {
        assert_eq!(unescape(r"\unknown{x}"), r"\unknown{x}");
    }

    #[test]
    fn test_escape_round_trip() {
        for value in ["AT&T", "100% sure", "a_b {c}", "x~y^z", "back\\slash"] {
            assert_eq!(unescape(&escape(value)), value);
        }
    }
}
