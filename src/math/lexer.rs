//!
//! LaTeX math lexer. Produces a flat token stream; `%` comments and line
//! continuations become first-class tokens so they can ride through OMML as
//! hidden carrier runs.

/// One lexical token of a LaTeX math expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathToken {
    /// `\name` with an alphabetic name.
    Command(String),
    /// `\X` with a single non-alphabetic character (`\{`, `\%`, `\\`, ...).
    Escaped(char),
    /// A single ordinary character (letters, digits, operators, spaces).
    Char(char),
    GroupOpen,
    GroupClose,
    Sup,
    Sub,
    Align,
    Newline,
    /// `% text` up to end of line; `ws` is the run of spaces/tabs directly
    /// before the `%`.
    Comment { ws: String, text: String },
    /// A line ending in a bare `%` (comment with no body).
    LineContinuation { ws: String },
}

/// Tokenize LaTeX math source.
pub fn tokenize(latex: &str) -> Vec<MathToken> {
    let chars: Vec<char> = latex.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    tokens.push(MathToken::Char('\\'));
                    i += 1;
                    continue;
                };
                if next.is_ascii_alphabetic() {
                    let mut j = i + 1;
                    while j < chars.len() && chars[j].is_ascii_alphabetic() {
                        j += 1;
                    }
                    tokens.push(MathToken::Command(chars[i + 1..j].iter().collect()));
                    i = j;
                } else {
                    tokens.push(MathToken::Escaped(next));
                    i += 2;
                }
            }
            '{' => {
                tokens.push(MathToken::GroupOpen);
                i += 1;
            }
            '}' => {
                tokens.push(MathToken::GroupClose);
                i += 1;
            }
            '^' => {
                tokens.push(MathToken::Sup);
                i += 1;
            }
            '_' => {
                tokens.push(MathToken::Sub);
                i += 1;
            }
            '&' => {
                tokens.push(MathToken::Align);
                i += 1;
            }
            '\n' => {
                tokens.push(MathToken::Newline);
                i += 1;
            }
            '%' => {
                // Unescaped (escapes were consumed above). Pull the
                // whitespace run that precedes the comment off the stream.
                let mut ws = String::new();
                while matches!(tokens.last(), Some(MathToken::Char(' ')) | Some(MathToken::Char('\t'))) {
                    if let Some(MathToken::Char(c)) = tokens.pop() {
                        ws.insert(0, c);
                    }
                }
                let mut j = i + 1;
                while j < chars.len() && chars[j] != '\n' {
                    j += 1;
                }
                let text: String = chars[i + 1..j].iter().collect();
                if text.is_empty() {
                    tokens.push(MathToken::LineContinuation { ws });
                } else {
                    tokens.push(MathToken::Comment { ws, text });
                }
                // The newline belongs to the comment.
                i = if j < chars.len() { j + 1 } else { j };
            }
            ch => {
                tokens.push(MathToken::Char(ch));
                i += 1;
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_and_chars() {
        let toks = tokenize(r"\frac{a}{b}");
        assert_eq!(
            toks,
            vec![
                MathToken::Command("frac".into()),
                MathToken::GroupOpen,
                MathToken::Char('a'),
                MathToken::GroupClose,
                MathToken::GroupOpen,
                MathToken::Char('b'),
                MathToken::GroupClose,
            ]
        );
    }

    #[test]
    fn test_scripts() {
        let toks = tokenize("x^2_i");
        assert_eq!(
            toks,
            vec![
                MathToken::Char('x'),
                MathToken::Sup,
                MathToken::Char('2'),
                MathToken::Sub,
                MathToken::Char('i'),
            ]
        );
    }

    #[test]
    fn test_comment_captures_preceding_ws() {
        let toks = tokenize("x^2 % superscript");
        assert_eq!(
            toks.last(),
            Some(&MathToken::Comment {
                ws: " ".into(),
                text: " superscript".into()
            })
        );
        // the ws was removed from the stream
        assert_eq!(toks.len(), 4);
    }

    #[test]
    fn test_line_continuation() {
        let toks = tokenize("a +%\nb");
        assert!(toks.contains(&MathToken::LineContinuation { ws: String::new() }));
        assert_eq!(toks.last(), Some(&MathToken::Char('b')));
    }

    #[test]
    fn test_escaped_percent_is_not_comment() {
        let toks = tokenize(r"50\% luck");
        assert!(toks.contains(&MathToken::Escaped('%')));
        assert!(!toks.iter().any(|t| matches!(t, MathToken::Comment { .. })));
    }

    #[test]
    fn test_double_backslash() {
        let toks = tokenize(r"a \\ b");
        assert!(toks.contains(&MathToken::Escaped('\\')));
    }

    #[test]
    fn test_align_and_newline() {
        let toks = tokenize("a & b\nc");
        assert!(toks.contains(&MathToken::Align));
        assert!(toks.contains(&MathToken::Newline));
    }
}
