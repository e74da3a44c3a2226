//!
//! LaTeX math parser: token stream -> tree. The construct set mirrors what
//! the OMML side can express; anything else degrades to a literal run
//! carrying the raw LaTeX, with a warning.

use super::lexer::MathToken;
use super::symbols;

/// Matrix fence style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    Plain,
    Paren,
    Bracket,
}

/// A node of the math tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    Run(String),
    Group(Vec<MathNode>),
    Frac { num: Vec<MathNode>, den: Vec<MathNode> },
    Sup { base: Vec<MathNode>, sup: Vec<MathNode> },
    Sub { base: Vec<MathNode>, sub: Vec<MathNode> },
    SubSup { base: Vec<MathNode>, sub: Vec<MathNode>, sup: Vec<MathNode> },
    Sqrt { degree: Option<Vec<MathNode>>, body: Vec<MathNode> },
    Nary { chr: String, sub: Vec<MathNode>, sup: Vec<MathNode> },
    Delim { open: String, close: String, body: Vec<MathNode> },
    Func { name: String, body: Vec<MathNode> },
    Accent { chr: String, base: Vec<MathNode> },
    Matrix { kind: MatrixKind, rows: Vec<Vec<Vec<MathNode>>> },
    EqArray { rows: Vec<Vec<MathNode>> },
    /// Unsupported construct, kept verbatim.
    Literal(String),
    Comment { ws: String, text: String },
    LineContinuation { ws: String },
}

struct Parser {
    tokens: Vec<MathToken>,
    pos: usize,
    warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Stops {
    group_close: bool,
    right: bool,
}

/// Parse tokens into a node sequence.
pub fn parse(tokens: Vec<MathToken>) -> (Vec<MathNode>, Vec<String>) {
    let mut parser = Parser {
        tokens,
        pos: 0,
        warnings: Vec::new(),
    };
    let nodes = parser.parse_sequence(Stops::default());
    (nodes, parser.warnings)
}

impl Parser {
    fn peek(&self) -> Option<&MathToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<MathToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_sequence(&mut self, stops: Stops) -> Vec<MathNode> {
        let mut nodes = Vec::new();
        while let Some(tok) = self.peek() {
            match tok {
                MathToken::GroupClose if stops.group_close => break,
                MathToken::Command(name) if stops.right && name == "right" => break,
                _ => {}
            }
            self.parse_one(&mut nodes);
        }
        nodes
    }

    fn parse_one(&mut self, nodes: &mut Vec<MathNode>) {
        let Some(tok) = self.next() else { return };
        match tok {
            MathToken::Char(c) => {
                if c == ' ' || c == '\t' {
                    return; // canonical whitespace
                }
                push_char(nodes, c);
            }
            MathToken::Newline => {}
            MathToken::Escaped(c) => {
                if c == '\\' {
                    nodes.push(MathNode::Literal("\\\\".to_string()));
                } else {
                    push_char(nodes, c);
                }
            }
            MathToken::GroupOpen => {
                let inner = self.parse_sequence(Stops {
                    group_close: true,
                    ..Default::default()
                });
                self.consume_group_close();
                nodes.push(MathNode::Group(inner));
            }
            MathToken::GroupClose => {} // stray
            MathToken::Sup => {
                let arg = self.parse_arg();
                attach_sup(nodes, arg);
            }
            MathToken::Sub => {
                let arg = self.parse_arg();
                attach_sub(nodes, arg);
            }
            MathToken::Align => push_char(nodes, '&'),
            MathToken::Comment { ws, text } => nodes.push(MathNode::Comment { ws, text }),
            MathToken::LineContinuation { ws } => nodes.push(MathNode::LineContinuation { ws }),
            MathToken::Command(name) => self.parse_command(&name, nodes),
        }
    }

    fn parse_command(&mut self, name: &str, nodes: &mut Vec<MathNode>) {
        match name {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.parse_arg();
                let den = self.parse_arg();
                nodes.push(MathNode::Frac { num, den });
            }
            "sqrt" => {
                let degree = self.parse_optional_bracket();
                let body = self.parse_arg();
                nodes.push(MathNode::Sqrt { degree, body });
            }
            "left" => {
                let open = self.parse_delimiter_char().unwrap_or_else(|| "(".to_string());
                let body = self.parse_sequence(Stops {
                    right: true,
                    ..Default::default()
                });
                let close = if matches!(self.peek(), Some(MathToken::Command(c)) if c == "right") {
                    self.next();
                    self.parse_delimiter_char().unwrap_or_else(|| ")".to_string())
                } else {
                    self.warnings.push("`\\left` without matching `\\right`".to_string());
                    ")".to_string()
                };
                nodes.push(MathNode::Delim { open, close, body });
            }
            "right" => {
                // Unmatched; keep it visible rather than losing it.
                self.parse_delimiter_char();
                self.warnings.push("`\\right` without matching `\\left`".to_string());
            }
            "begin" => self.parse_environment(nodes),
            "end" => {
                self.parse_env_name();
                self.warnings.push("`\\end` without matching `\\begin`".to_string());
            }
            _ => {
                if let Some(chr) = symbols::nary_char(name) {
                    let mut nary = MathNode::Nary {
                        chr: chr.to_string(),
                        sub: Vec::new(),
                        sup: Vec::new(),
                    };
                    // Attach scripts that follow directly.
                    loop {
                        match self.peek() {
                            Some(MathToken::Sub) => {
                                self.next();
                                let arg = self.parse_arg();
                                if let MathNode::Nary { sub, .. } = &mut nary {
                                    *sub = arg;
                                }
                            }
                            Some(MathToken::Sup) => {
                                self.next();
                                let arg = self.parse_arg();
                                if let MathNode::Nary { sup, .. } = &mut nary {
                                    *sup = arg;
                                }
                            }
                            _ => break,
                        }
                    }
                    nodes.push(nary);
                } else if let Some(chr) = symbols::accent_char(name) {
                    let base = self.parse_arg();
                    nodes.push(MathNode::Accent {
                        chr: chr.to_string(),
                        base,
                    });
                } else if symbols::is_function(name) {
                    let body = if matches!(self.peek(), Some(MathToken::GroupOpen)) {
                        self.parse_arg()
                    } else {
                        Vec::new()
                    };
                    nodes.push(MathNode::Func {
                        name: name.to_string(),
                        body,
                    });
                } else if let Some(sym) = symbols::symbol_for_command(name) {
                    for c in sym.chars() {
                        push_char(nodes, c);
                    }
                } else {
                    self.warnings.push(format!("Unsupported LaTeX command `\\{name}`"));
                    nodes.push(MathNode::Literal(format!("\\{name}")));
                }
            }
        }
    }

    /// One argument: a braced group, or a single unit.
    fn parse_arg(&mut self) -> Vec<MathNode> {
        match self.peek() {
            Some(MathToken::GroupOpen) => {
                self.next();
                let inner = self.parse_sequence(Stops {
                    group_close: true,
                    ..Default::default()
                });
                self.consume_group_close();
                inner
            }
            Some(_) => {
                // Skip insignificant whitespace before the unit.
                while matches!(self.peek(), Some(MathToken::Char(' ')) | Some(MathToken::Char('\t'))) {
                    self.next();
                }
                let mut unit = Vec::new();
                if self.peek().is_some() {
                    self.parse_one(&mut unit);
                }
                unit
            }
            None => Vec::new(),
        }
    }

    /// `[degree]` after `\sqrt`.
    fn parse_optional_bracket(&mut self) -> Option<Vec<MathNode>> {
        if !matches!(self.peek(), Some(MathToken::Char('['))) {
            return None;
        }
        self.next();
        let mut inner_tokens = Vec::new();
        while let Some(tok) = self.peek() {
            if matches!(tok, MathToken::Char(']')) {
                self.next();
                break;
            }
            inner_tokens.push(self.next().unwrap_or(MathToken::Char(' ')));
        }
        let (nodes, warnings) = parse(inner_tokens);
        self.warnings.extend(warnings);
        Some(nodes)
    }

    /// Delimiter after `\left`/`\right`: a plain char, an escaped brace, or
    /// `\langle`/`\rangle`. `.` is the invisible delimiter.
    fn parse_delimiter_char(&mut self) -> Option<String> {
        match self.peek().cloned() {
            Some(MathToken::Char(c)) => {
                self.next();
                Some(if c == '.' { String::new() } else { c.to_string() })
            }
            Some(MathToken::Escaped(c)) => {
                self.next();
                Some(c.to_string())
            }
            Some(MathToken::Command(name)) if name == "langle" || name == "rangle" => {
                self.next();
                Some(symbols::symbol_for_command(&name).unwrap_or_default().to_string())
            }
            _ => None,
        }
    }

    fn parse_env_name(&mut self) -> String {
        if !matches!(self.peek(), Some(MathToken::GroupOpen)) {
            return String::new();
        }
        self.next();
        let mut name = String::new();
        while let Some(tok) = self.next() {
            match tok {
                MathToken::GroupClose => break,
                MathToken::Char(c) => name.push(c),
                _ => {}
            }
        }
        name
    }

    fn parse_environment(&mut self, nodes: &mut Vec<MathNode>) {
        let name = self.parse_env_name();

        // Collect the body tokens up to the matching \end{name}.
        let mut body = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.next() {
                None => {
                    self.warnings.push(format!("Unterminated environment `{name}`"));
                    break;
                }
                Some(MathToken::Command(cmd)) if cmd == "begin" => {
                    depth += 1;
                    body.push(MathToken::Command(cmd));
                }
                Some(MathToken::Command(cmd)) if cmd == "end" => {
                    if depth == 0 {
                        self.parse_env_name();
                        break;
                    }
                    depth -= 1;
                    body.push(MathToken::Command(cmd));
                }
                Some(tok) => body.push(tok),
            }
        }

        let kind = match name.as_str() {
            "matrix" => Some(MatrixKind::Plain),
            "pmatrix" => Some(MatrixKind::Paren),
            "bmatrix" => Some(MatrixKind::Bracket),
            _ => None,
        };

        if let Some(kind) = kind {
            let rows = split_rows(&body)
                .into_iter()
                .map(|row| {
                    split_cells(&row)
                        .into_iter()
                        .map(|cell| {
                            let (nodes, warnings) = parse(cell);
                            self.warnings.extend(warnings);
                            nodes
                        })
                        .collect()
                })
                .collect();
            nodes.push(MathNode::Matrix { kind, rows });
        } else if name == "align*" || name == "align" || name == "aligned" {
            let rows = split_rows(&body)
                .into_iter()
                .map(|row| {
                    let (nodes, warnings) = parse(row);
                    self.warnings.extend(warnings);
                    nodes
                })
                .collect();
            nodes.push(MathNode::EqArray { rows });
        } else {
            self.warnings.push(format!("Unsupported LaTeX environment `{name}`"));
            nodes.push(MathNode::Literal(format!(
                "\\begin{{{name}}}{}\\end{{{name}}}",
                tokens_to_latex(&body)
            )));
        }
    }

    fn consume_group_close(&mut self) {
        if matches!(self.peek(), Some(MathToken::GroupClose)) {
            self.next();
        }
    }
}

fn push_char(nodes: &mut Vec<MathNode>, c: char) {
    if let Some(MathNode::Run(text)) = nodes.last_mut() {
        text.push(c);
        return;
    }
    nodes.push(MathNode::Run(c.to_string()));
}

fn attach_sup(nodes: &mut Vec<MathNode>, arg: Vec<MathNode>) {
    match nodes.pop() {
        Some(MathNode::Sub { base, sub }) => nodes.push(MathNode::SubSup { base, sub, sup: arg }),
        Some(MathNode::Group(children)) => nodes.push(MathNode::Sup {
            base: children,
            sup: arg,
        }),
        Some(MathNode::Run(mut text)) => {
            // Scripts bind to the last character of a run.
            let last = text.pop();
            if !text.is_empty() {
                nodes.push(MathNode::Run(text));
            }
            let base = last.map(|c| vec![MathNode::Run(c.to_string())]).unwrap_or_default();
            nodes.push(MathNode::Sup { base, sup: arg });
        }
        Some(node) => nodes.push(MathNode::Sup {
            base: vec![node],
            sup: arg,
        }),
        None => nodes.push(MathNode::Sup {
            base: Vec::new(),
            sup: arg,
        }),
    }
}

fn attach_sub(nodes: &mut Vec<MathNode>, arg: Vec<MathNode>) {
    match nodes.pop() {
        Some(MathNode::Sup { base, sup }) => nodes.push(MathNode::SubSup { base, sub: arg, sup }),
        Some(MathNode::Group(children)) => nodes.push(MathNode::Sub {
            base: children,
            sub: arg,
        }),
        Some(MathNode::Run(mut text)) => {
            let last = text.pop();
            if !text.is_empty() {
                nodes.push(MathNode::Run(text));
            }
            let base = last.map(|c| vec![MathNode::Run(c.to_string())]).unwrap_or_default();
            nodes.push(MathNode::Sub { base, sub: arg });
        }
        Some(node) => nodes.push(MathNode::Sub {
            base: vec![node],
            sub: arg,
        }),
        None => nodes.push(MathNode::Sub {
            base: Vec::new(),
            sub: arg,
        }),
    }
}

/// Split environment body tokens into rows at `\\`, respecting groups.
fn split_rows(tokens: &[MathToken]) -> Vec<Vec<MathToken>> {
    split_at(tokens, |tok| matches!(tok, MathToken::Escaped('\\')))
}

/// Split a row into cells at `&`, respecting groups.
fn split_cells(tokens: &[MathToken]) -> Vec<Vec<MathToken>> {
    split_at(tokens, |tok| matches!(tok, MathToken::Align))
}

fn split_at(tokens: &[MathToken], is_sep: impl Fn(&MathToken) -> bool) -> Vec<Vec<MathToken>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0usize;
    for tok in tokens {
        match tok {
            MathToken::GroupOpen => depth += 1,
            MathToken::GroupClose => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && is_sep(tok) {
            parts.push(Vec::new());
        } else {
            parts.last_mut().expect("parts is never empty").push(tok.clone());
        }
    }
    // An empty trailing row from a final \\ is noise.
    if parts.last().is_some_and(|p| p.iter().all(|t| matches!(t, MathToken::Char(' ') | MathToken::Newline))) {
        parts.pop();
    }
    parts
}

/// Reconstruct LaTeX from raw tokens (fallback paths only).
pub fn tokens_to_latex(tokens: &[MathToken]) -> String {
    let mut out = String::new();
    for tok in tokens {
        match tok {
            MathToken::Command(name) => {
                out.push('\\');
                out.push_str(name);
                out.push(' ');
            }
            MathToken::Escaped(c) => {
                out.push('\\');
                out.push(*c);
            }
            MathToken::Char(c) => out.push(*c),
            MathToken::GroupOpen => out.push('{'),
            MathToken::GroupClose => out.push('}'),
            MathToken::Sup => out.push('^'),
            MathToken::Sub => out.push('_'),
            MathToken::Align => out.push('&'),
            MathToken::Newline => out.push('\n'),
            MathToken::Comment { ws, text } => {
                out.push_str(ws);
                out.push('%');
                out.push_str(text);
                out.push('\n');
            }
            MathToken::LineContinuation { ws } => {
                out.push_str(ws);
                out.push_str("%\n");
            }
        }
    }
    out
}
