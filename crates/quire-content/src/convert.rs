//! Math notation to Unicode symbol conversion.
//!
//! Authors type a constrained LaTeX-like notation (`\frac{1}{2}`, `x^{2}`,
//! `\sum_{i=1}^{n}`, `\alpha`) and the engine rewrites it into plain Unicode
//! text. There is no layout engine: every construct maps to a flat run of
//! characters, and anything that isn't recognised stays exactly as typed.
//!
//! Conversion is an ordered pipeline of [`NotationRule`]s. Each rule re-scans
//! the output of the previous one, and the order is load-bearing: bounded
//! operators consume their own `_{..}`/`^{..}` arguments before the generic
//! script rule runs, and fractions consume their braces before bare symbols
//! are looked up.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Fraction slash (U+2044), used for `a⁄b` style fractions.
pub const FRACTION_SLASH: char = '\u{2044}';

static FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:frac|dfrac|tfrac)\{([^{}]*)\}\{([^{}]*)\}").unwrap()
});

static BOUNDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\([A-Za-z]+)(?:_\{(?P<lo>[^{}]*)\}(?:\^\{(?P<hi>[^{}]*)\})?|\^\{(?P<hi2>[^{}]*)\}(?:_\{(?P<lo2>[^{}]*)\})?)?",
    )
    .unwrap()
});

static UNARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)(?:\[([0-9]+)\])?\{([^{}]*)\}").unwrap());

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)").unwrap());

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\^_])(?:\{([^{}]*)\}|([A-Za-z0-9+\-=()]))").unwrap());

/// ASCII operator digraphs, longest first so `<=>` is never read as `<=` + `>`.
const OPERATOR_DIGRAPHS: &[(&str, &str)] = &[
    ("<=>", "⇔"),
    ("<->", "↔"),
    ("<=", "≤"),
    (">=", "≥"),
    ("!=", "≠"),
    ("->", "→"),
    ("<-", "←"),
    ("=>", "⇒"),
    ("+-", "±"),
    ("~=", "≈"),
];

/// One stage of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationRule {
    /// `\frac{A}{B}` and friends.
    Fraction,
    /// `\sum_{lo}^{hi}`, `\int`, `\lim`, ... with optional bounds.
    BoundedOperator,
    /// `\sqrt{X}`, `\sqrt[3]{X}`, `\cbrt{X}`.
    UnaryOperator,
    /// `\alpha`, `\leq`, `->` and the rest of the one-to-one symbol table.
    NamedSymbol,
    /// `^{..}`, `_{..}` and their single-character shorthand.
    Script,
}

impl NotationRule {
    /// Rules in the order they must run.
    pub const PIPELINE: [NotationRule; 5] = [
        NotationRule::Fraction,
        NotationRule::BoundedOperator,
        NotationRule::UnaryOperator,
        NotationRule::NamedSymbol,
        NotationRule::Script,
    ];

    /// Apply this rule to `input`, borrowing when nothing matched.
    pub fn apply(self, input: &str) -> Cow<'_, str> {
        match self {
            NotationRule::Fraction => FRACTION_RE.replace_all(input, rewrite_fraction),
            NotationRule::BoundedOperator => BOUNDED_RE.replace_all(input, rewrite_bounded),
            NotationRule::UnaryOperator => UNARY_RE.replace_all(input, rewrite_unary),
            NotationRule::NamedSymbol => {
                let commands = COMMAND_RE.replace_all(input, |caps: &Captures| {
                    named_symbol(&caps[1])
                        .map(str::to_owned)
                        .unwrap_or_else(|| caps[0].to_owned())
                });
                with_digraphs(commands)
            }
            // Unmapped characters lifted out of a group can meet their
            // neighbours and spell a digraph (`x_{<}=`).
            NotationRule::Script => with_digraphs(SCRIPT_RE.replace_all(input, rewrite_script)),
        }
    }
}

/// Convert math notation into symbolic Unicode text.
///
/// Never fails. Unknown commands, unterminated braces and unmapped script
/// characters are left as they were typed.
pub fn convert(notation: &str) -> String {
    NotationRule::PIPELINE
        .iter()
        .fold(notation.to_owned(), |text, rule| match rule.apply(&text) {
            Cow::Borrowed(_) => text,
            Cow::Owned(rewritten) => rewritten,
        })
}

/// Map every character through the superscript table, passing unmapped ones through.
pub fn superscript(text: &str) -> String {
    text.chars()
        .map(|c| superscript_char(c).unwrap_or(c))
        .collect()
}

/// Map every character through the subscript table, passing unmapped ones through.
pub fn subscript(text: &str) -> String {
    text.chars().map(|c| subscript_char(c).unwrap_or(c)).collect()
}

fn rewrite_fraction(caps: &Captures) -> String {
    let numerator = &caps[1];
    let denominator = &caps[2];
    if let Some(glyph) = vulgar_fraction(numerator.trim(), denominator.trim()) {
        return glyph.to_string();
    }
    if is_single_alphanumeric(numerator) && is_single_alphanumeric(denominator) {
        format!("{numerator}{FRACTION_SLASH}{denominator}")
    } else {
        format!("({numerator})/({denominator})")
    }
}

fn rewrite_bounded(caps: &Captures) -> String {
    let Some(base) = bounded_operator(&caps[1]) else {
        return caps[0].to_owned();
    };
    let lower = caps.name("lo").or_else(|| caps.name("lo2"));
    let upper = caps.name("hi").or_else(|| caps.name("hi2"));

    let mut out = String::from(base);
    if let Some(lower) = lower {
        out.push_str(&subscript(lower.as_str()));
    }
    if let Some(upper) = upper {
        out.push_str(&superscript(upper.as_str()));
    }
    out
}

fn rewrite_unary(caps: &Captures) -> String {
    let index = caps.get(2).map(|m| m.as_str());
    let Some(glyph) = unary_operator(&caps[1], index) else {
        return caps[0].to_owned();
    };
    let operand = &caps[3];
    if is_single_alphanumeric(operand) {
        format!("{glyph}{operand}")
    } else {
        format!("{glyph}({operand})")
    }
}

fn rewrite_script(caps: &Captures) -> String {
    let map: fn(char) -> Option<char> = if &caps[1] == "^" {
        superscript_char
    } else {
        subscript_char
    };

    if let Some(group) = caps.get(2) {
        return group.as_str().chars().map(|c| map(c).unwrap_or(c)).collect();
    }

    // Shorthand only fires for characters that actually have a glyph, so
    // identifiers like `snake_case` survive.
    let c = caps[3].chars().next().unwrap_or_default();
    match map(c) {
        Some(mapped) => mapped.to_string(),
        None => caps[0].to_owned(),
    }
}

fn with_digraphs(text: Cow<'_, str>) -> Cow<'_, str> {
    if let Cow::Owned(replaced) = replace_digraphs(&text) {
        return Cow::Owned(replaced);
    }
    text
}

fn replace_digraphs(input: &str) -> Cow<'_, str> {
    if !OPERATOR_DIGRAPHS
        .iter()
        .any(|(token, _)| input.contains(token))
    {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    'scan: while let Some(c) = rest.chars().next() {
        for (token, glyph) in OPERATOR_DIGRAPHS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(glyph);
                rest = after;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

fn is_single_alphanumeric(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphanumeric())
}

fn vulgar_fraction(numerator: &str, denominator: &str) -> Option<char> {
    let glyph = match (numerator, denominator) {
        ("1", "2") => '½',
        ("1", "3") => '⅓',
        ("2", "3") => '⅔',
        ("1", "4") => '¼',
        ("3", "4") => '¾',
        ("1", "5") => '⅕',
        ("2", "5") => '⅖',
        ("3", "5") => '⅗',
        ("4", "5") => '⅘',
        ("1", "6") => '⅙',
        ("5", "6") => '⅚',
        ("1", "7") => '⅐',
        ("1", "8") => '⅛',
        ("3", "8") => '⅜',
        ("5", "8") => '⅝',
        ("7", "8") => '⅞',
        ("1", "9") => '⅑',
        ("1", "10") => '⅒',
        _ => return None,
    };
    Some(glyph)
}

fn bounded_operator(name: &str) -> Option<&'static str> {
    let base = match name {
        "sum" => "Σ",
        "prod" => "Π",
        "coprod" => "∐",
        "int" => "∫",
        "iint" => "∬",
        "iiint" => "∭",
        "oint" => "∮",
        "bigcup" => "⋃",
        "bigcap" => "⋂",
        "lim" => "lim",
        _ => return None,
    };
    Some(base)
}

fn unary_operator(name: &str, index: Option<&str>) -> Option<char> {
    match (name, index) {
        ("sqrt", None) => Some('√'),
        ("sqrt", Some("3")) | ("cbrt", None) => Some('∛'),
        ("sqrt", Some("4")) => Some('∜'),
        _ => None,
    }
}

fn named_symbol(name: &str) -> Option<&'static str> {
    let glyph = match name {
        // Greek, lower case
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" => "θ",
        "vartheta" => "ϑ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "omicron" => "ο",
        "pi" => "π",
        "varpi" => "ϖ",
        "rho" => "ρ",
        "sigma" => "σ",
        "varsigma" => "ς",
        "tau" => "τ",
        "upsilon" => "υ",
        "phi" => "φ",
        "varphi" => "ϕ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        // Greek, upper case
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Upsilon" => "Υ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        // Relations
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "simeq" => "≃",
        "cong" => "≅",
        "propto" => "∝",
        "ll" => "≪",
        "gg" => "≫",
        "perp" => "⊥",
        "parallel" => "∥",
        // Operators
        "times" => "×",
        "div" => "÷",
        "cdot" => "·",
        "pm" => "±",
        "mp" => "∓",
        "ast" => "∗",
        "circ" => "∘",
        "oplus" => "⊕",
        "otimes" => "⊗",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",
        "neg" | "lnot" => "¬",
        // Sets and logic
        "in" => "∈",
        "notin" => "∉",
        "ni" => "∋",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "supset" => "⊃",
        "supseteq" => "⊇",
        "cup" => "∪",
        "cap" => "∩",
        "emptyset" | "varnothing" => "∅",
        "forall" => "∀",
        "exists" => "∃",
        "nexists" => "∄",
        "therefore" => "∴",
        "because" => "∵",
        // Arrows
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "leftrightarrow" => "↔",
        "Rightarrow" | "implies" => "⇒",
        "Leftarrow" => "⇐",
        "Leftrightarrow" | "iff" => "⇔",
        "uparrow" => "↑",
        "downarrow" => "↓",
        "mapsto" => "↦",
        // Miscellaneous
        "infty" => "∞",
        "partial" => "∂",
        "nabla" => "∇",
        "angle" => "∠",
        "triangle" => "△",
        "degree" => "°",
        "prime" => "′",
        "hbar" => "ℏ",
        "ell" => "ℓ",
        "Re" => "ℜ",
        "Im" => "ℑ",
        "aleph" => "ℵ",
        "ldots" | "dots" => "…",
        "cdots" => "⋯",
        "vdots" => "⋮",
        "ddots" => "⋱",
        // Delimiter sizing has no meaning without layout.
        "left" | "right" => "",
        _ => return None,
    };
    Some(glyph)
}

fn superscript_char(c: char) -> Option<char> {
    let mapped = match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'a' => 'ᵃ',
        'b' => 'ᵇ',
        'c' => 'ᶜ',
        'd' => 'ᵈ',
        'e' => 'ᵉ',
        'f' => 'ᶠ',
        'g' => 'ᵍ',
        'h' => 'ʰ',
        'i' => 'ⁱ',
        'j' => 'ʲ',
        'k' => 'ᵏ',
        'l' => 'ˡ',
        'm' => 'ᵐ',
        'n' => 'ⁿ',
        'o' => 'ᵒ',
        'p' => 'ᵖ',
        'r' => 'ʳ',
        's' => 'ˢ',
        't' => 'ᵗ',
        'u' => 'ᵘ',
        'v' => 'ᵛ',
        'w' => 'ʷ',
        'x' => 'ˣ',
        'y' => 'ʸ',
        'z' => 'ᶻ',
        _ => return None,
    };
    Some(mapped)
}

fn subscript_char(c: char) -> Option<char> {
    let mapped = match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'h' => 'ₕ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'l' => 'ₗ',
        'm' => 'ₘ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'p' => 'ₚ',
        'r' => 'ᵣ',
        's' => 'ₛ',
        't' => 'ₜ',
        'u' => 'ᵤ',
        'v' => 'ᵥ',
        'x' => 'ₓ',
        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_greek_letters() {
        assert_eq!(convert(r"\pi"), "π");
        assert_eq!(convert(r"2\pi r"), "2π r");
        assert_eq!(convert(r"\Omega \omega"), "Ω ω");
    }

    #[test]
    fn converts_scripts() {
        assert_eq!(convert("x^{2}"), "x²");
        assert_eq!(convert("a_{n+1}"), "aₙ₊₁");
        assert_eq!(convert("e^{-1}"), "e⁻¹");
    }

    #[test]
    fn script_shorthand_only_fires_when_mapped() {
        assert_eq!(convert("x^2 + y_i"), "x² + yᵢ");
        // 'q' has no superscript and 'c' no subscript glyph.
        assert_eq!(convert("x^q"), "x^q");
        assert_eq!(convert("snake_case"), "snake_case");
    }

    #[test]
    fn unmapped_braced_script_characters_pass_through() {
        assert_eq!(convert("x^{q}"), "xq");
        assert_eq!(convert("x_{bq}"), "xbq");
    }

    #[test]
    fn digraphs_formed_by_script_groups_are_converted() {
        assert_eq!(convert("x_{<}="), "x≤");
        assert_eq!(convert("x_{<}-y"), "x←y");
        assert_eq!(convert(&convert("x_{<}=")), "x≤");
    }

    #[test]
    fn converts_fractions() {
        assert_eq!(convert(r"\frac{1}{2}"), "½");
        assert_eq!(convert(r"\frac{3}{4}"), "¾");
        assert_eq!(convert(r"\frac{a}{b}"), "a\u{2044}b");
        assert_eq!(convert(r"\dfrac{a+b}{c}"), "(a+b)/(c)");
        assert_eq!(convert(r"\frac{1}{10}"), "⅒");
        assert_eq!(convert(r"\frac{7}{9}"), "7\u{2044}9");
    }

    #[test]
    fn converts_roots() {
        assert_eq!(convert(r"\sqrt{x}"), "√x");
        assert_eq!(convert(r"\sqrt{x+1}"), "√(x+1)");
        assert_eq!(convert(r"\sqrt[3]{8}"), "∛8");
        assert_eq!(convert(r"\cbrt{y}"), "∛y");
        assert_eq!(convert(r"\sqrt[4]{ab}"), "∜(ab)");
        assert_eq!(convert(r"\sqrt[5]{x}"), r"\sqrt[5]{x}");
    }

    #[test]
    fn converts_bounded_operators() {
        let expected = format!("Σ{}{}", subscript("i=1"), superscript("n"));
        assert_eq!(convert(r"\sum_{i=1}^{n}"), expected);
        assert_eq!(expected, "Σᵢ₌₁ⁿ");
        assert_eq!(convert(r"\int_{0}^{1} x dx"), "∫₀¹ x dx");
        assert_eq!(convert(r"\int^{b}_{a}"), "∫ₐᵇ");
        assert_eq!(convert(r"\prod"), "Π");
        assert_eq!(convert(r"\lim_{n}"), "limₙ");
        // Bounds go through the script tables as-is, commands included.
        assert_eq!(convert(r"\lim_{x\to0}"), "limₓ\\ₜₒ₀");
    }

    #[test]
    fn bare_symbol_lookup_matches_whole_tokens() {
        assert_eq!(convert(r"a \leq b"), "a ≤ b");
        assert_eq!(convert(r"a \le b"), "a ≤ b");
        assert_eq!(convert(r"\infty"), "∞");
        assert_eq!(convert(r"\intercal"), r"\intercal");
        assert_eq!(convert(r"\unknown{x}"), r"\unknown{x}");
    }

    #[test]
    fn digraphs_replace_longest_first() {
        assert_eq!(convert("a <=> b"), "a ⇔ b");
        assert_eq!(convert("a <-> b"), "a ↔ b");
        assert_eq!(convert("a <= b -> c"), "a ≤ b → c");
        assert_eq!(convert("x +- 1"), "x ± 1");
    }

    #[test]
    fn unterminated_braces_stay_literal() {
        assert_eq!(convert(r"\frac{1}{2"), r"\frac{1}{2");
        assert_eq!(convert("x^{2"), "x^{2");
        assert_eq!(convert(r"\sqrt{x"), r"\sqrt{x");
    }

    #[test]
    fn conversion_is_idempotent_on_its_output() {
        let inputs = [
            r"\pi r^{2}",
            r"\frac{1}{2} + \frac{a}{b}",
            r"\sum_{i=1}^{n} i = \frac{n(n+1)}{2}",
            r"\sqrt{x^2+1} \neq \infty",
            r"\alpha <= \beta",
            "plain text, no notation",
            r"\frac{1}{2",
            "x_{<}=",
        ];
        for input in inputs {
            let once = convert(input);
            assert_eq!(convert(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn pipeline_order_is_fixed() {
        assert_eq!(
            NotationRule::PIPELINE,
            [
                NotationRule::Fraction,
                NotationRule::BoundedOperator,
                NotationRule::UnaryOperator,
                NotationRule::NamedSymbol,
                NotationRule::Script,
            ]
        );
        // A rule that matches nothing borrows its input.
        assert!(matches!(
            NotationRule::Fraction.apply("x + y"),
            Cow::Borrowed(_)
        ));
    }
}
