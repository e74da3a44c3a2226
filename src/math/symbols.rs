//!
//! Static symbol tables for the LaTeX <-> OMML bridge: Greek letters, general
//! symbols, function names, accents, and n-ary operator characters.

use phf::{phf_map, phf_set};

/// Commands that translate to a single Unicode string.
static COMMAND_SYMBOLS: phf::Map<&'static str, &'static str> = phf_map! {
    // Greek lowercase
    "alpha" => "α", "beta" => "β", "gamma" => "γ", "delta" => "δ",
    "epsilon" => "ϵ", "varepsilon" => "ε", "zeta" => "ζ", "eta" => "η",
    "theta" => "θ", "vartheta" => "ϑ", "iota" => "ι", "kappa" => "κ",
    "lambda" => "λ", "mu" => "μ", "nu" => "ν", "xi" => "ξ",
    "pi" => "π", "varpi" => "ϖ", "rho" => "ρ", "varrho" => "ϱ",
    "sigma" => "σ", "varsigma" => "ς", "tau" => "τ", "upsilon" => "υ",
    "phi" => "ϕ", "varphi" => "φ", "chi" => "χ", "psi" => "ψ", "omega" => "ω",
    // Greek uppercase
    "Gamma" => "Γ", "Delta" => "Δ", "Theta" => "Θ", "Lambda" => "Λ",
    "Xi" => "Ξ", "Pi" => "Π", "Sigma" => "Σ", "Upsilon" => "Υ",
    "Phi" => "Φ", "Psi" => "Ψ", "Omega" => "Ω",
    // Binary operators and relations
    "times" => "×", "div" => "÷", "cdot" => "⋅", "pm" => "±", "mp" => "∓",
    "leq" => "≤", "le" => "≤", "geq" => "≥", "ge" => "≥", "neq" => "≠",
    "approx" => "≈", "equiv" => "≡", "sim" => "∼", "simeq" => "≃",
    "propto" => "∝", "ll" => "≪", "gg" => "≫",
    // Sets and logic
    "in" => "∈", "notin" => "∉", "ni" => "∋", "subset" => "⊂", "supset" => "⊃",
    "subseteq" => "⊆", "supseteq" => "⊇", "cup" => "∪", "cap" => "∩",
    "setminus" => "∖", "emptyset" => "∅", "forall" => "∀", "exists" => "∃",
    "neg" => "¬", "land" => "∧", "lor" => "∨", "wedge" => "∧", "vee" => "∨",
    // Arrows
    "to" => "→", "rightarrow" => "→", "leftarrow" => "←",
    "Rightarrow" => "⇒", "Leftarrow" => "⇐", "leftrightarrow" => "↔",
    "Leftrightarrow" => "⇔", "mapsto" => "↦", "uparrow" => "↑", "downarrow" => "↓",
    // Misc
    "infty" => "∞", "partial" => "∂", "nabla" => "∇", "hbar" => "ℏ",
    "ell" => "ℓ", "aleph" => "ℵ", "Re" => "ℜ", "Im" => "ℑ", "wp" => "℘",
    "prime" => "′", "circ" => "∘", "bullet" => "∙", "star" => "⋆", "ast" => "∗",
    "oplus" => "⊕", "ominus" => "⊖", "otimes" => "⊗", "oslash" => "⊘",
    "perp" => "⊥", "parallel" => "∥", "mid" => "∣", "angle" => "∠",
    "triangle" => "△", "ldots" => "…", "cdots" => "⋯", "dots" => "…",
    "vdots" => "⋮", "ddots" => "⋱", "langle" => "⟨", "rangle" => "⟩",
};

/// N-ary operators: command -> operator character.
static NARY: phf::Map<&'static str, &'static str> = phf_map! {
    "sum" => "∑",
    "prod" => "∏",
    "coprod" => "∐",
    "int" => "∫",
    "iint" => "∬",
    "iiint" => "∭",
    "oint" => "∮",
    "bigcup" => "⋃",
    "bigcap" => "⋂",
    "bigoplus" => "⨁",
    "bigotimes" => "⨂",
};

/// Accent commands -> combining character used by `m:acc`.
static ACCENTS: phf::Map<&'static str, &'static str> = phf_map! {
    "hat" => "\u{0302}",
    "bar" => "\u{0305}",
    "vec" => "\u{20d7}",
    "tilde" => "\u{0303}",
    "dot" => "\u{0307}",
    "ddot" => "\u{0308}",
    "check" => "\u{030c}",
    "breve" => "\u{0306}",
    "acute" => "\u{0301}",
    "grave" => "\u{0300}",
};

/// Function names rendered upright via `m:func`.
static FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "sin", "cos", "tan", "cot", "sec", "csc",
    "sinh", "cosh", "tanh", "coth",
    "arcsin", "arccos", "arctan",
    "log", "ln", "lg", "exp",
    "min", "max", "sup", "inf",
    "lim", "liminf", "limsup",
    "arg", "det", "deg", "dim", "gcd", "hom", "ker", "Pr",
};

pub fn symbol_for_command(name: &str) -> Option<&'static str> {
    COMMAND_SYMBOLS.get(name).copied()
}

pub fn nary_char(name: &str) -> Option<&'static str> {
    NARY.get(name).copied()
}

pub fn accent_char(name: &str) -> Option<&'static str> {
    ACCENTS.get(name).copied()
}

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(name)
}

/// Reverse lookup for the OMML -> LaTeX direction. Only characters that the
/// forward tables produce are mapped back; everything else stays verbatim.
pub fn command_for_char(ch: char) -> Option<&'static str> {
    let name = match ch {
        'α' => "alpha", 'β' => "beta", 'γ' => "gamma", 'δ' => "delta",
        'ϵ' => "epsilon", 'ε' => "varepsilon", 'ζ' => "zeta", 'η' => "eta",
        'θ' => "theta", 'ϑ' => "vartheta", 'ι' => "iota", 'κ' => "kappa",
        'λ' => "lambda", 'μ' => "mu", 'ν' => "nu", 'ξ' => "xi",
        'π' => "pi", 'ϖ' => "varpi", 'ρ' => "rho", 'ϱ' => "varrho",
        'σ' => "sigma", 'ς' => "varsigma", 'τ' => "tau", 'υ' => "upsilon",
        'ϕ' => "phi", 'φ' => "varphi", 'χ' => "chi", 'ψ' => "psi", 'ω' => "omega",
        'Γ' => "Gamma", 'Δ' => "Delta", 'Θ' => "Theta", 'Λ' => "Lambda",
        'Ξ' => "Xi", 'Π' => "Pi", 'Σ' => "Sigma", 'Υ' => "Upsilon",
        'Φ' => "Phi", 'Ψ' => "Psi", 'Ω' => "Omega",
        '∞' => "infty", '∂' => "partial", '∇' => "nabla",
        _ => return None,
    };
    Some(name)
}

/// Reverse lookup for n-ary operator characters.
pub fn nary_command_for_char(ch: char) -> Option<&'static str> {
    let name = match ch {
        '∑' => "sum",
        '∏' => "prod",
        '∐' => "coprod",
        '∫' => "int",
        '∬' => "iint",
        '∭' => "iiint",
        '∮' => "oint",
        '⋃' => "bigcup",
        '⋂' => "bigcap",
        '⨁' => "bigoplus",
        '⨂' => "bigotimes",
        _ => return None,
    };
    Some(name)
}

/// Reverse lookup for accent characters.
pub fn accent_command_for_char(ch: char) -> Option<&'static str> {
    let name = match ch {
        '\u{0302}' => "hat",
        '\u{0305}' => "bar",
        '\u{20d7}' => "vec",
        '\u{0303}' => "tilde",
        '\u{0307}' => "dot",
        '\u{0308}' => "ddot",
        '\u{030c}' => "check",
        '\u{0306}' => "breve",
        '\u{0301}' => "acute",
        '\u{0300}' => "grave",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greek_round_trip() {
        for name in ["alpha", "Omega", "varphi", "pi"] {
            let sym = symbol_for_command(name).unwrap();
            let ch = sym.chars().next().unwrap();
            assert_eq!(command_for_char(ch), Some(name));
        }
    }

    #[test]
    fn test_nary_round_trip() {
        for name in ["sum", "int", "prod", "oint"] {
            let ch = nary_char(name).unwrap().chars().next().unwrap();
            assert_eq!(nary_command_for_char(ch), Some(name));
        }
    }

    #[test]
    fn test_accent_round_trip() {
        for name in ["hat", "bar", "vec"] {
            let ch = accent_char(name).unwrap().chars().next().unwrap();
            assert_eq!(accent_command_for_char(ch), Some(name));
        }
    }

    #[test]
    fn test_functions() {
        assert!(is_function("sin"));
        assert!(is_function("limsup"));
        assert!(!is_function("frac"));
    }
}
