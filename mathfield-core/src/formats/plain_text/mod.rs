//! Plain math text export
//!
//! A one-line rendition for places that cannot show markup: clipboards,
//! logs, terminals. Symbols become their Unicode characters, fractions
//! become `a/b` with parentheses around compound parts, roots become
//! `sqrt(..)` / `root(n)(..)`, and scripts keep `_` and `^`.
//!
//! | Atom        | Output                     |
//! |-------------|----------------------------|
//! | Fraction    | `num/den`, `(a+b)/2`       |
//! | Binomial    | `binom(n, k)`              |
//! | Radical     | `sqrt(x)`, `root(3)(x)`    |
//! | Scripts     | `x_i^2`, `e^(i pi)`        |
//! | Fence       | delimiters around the body |
//! | Array       | `[[a, b], [c, d]]`         |
//! | Text        | verbatim                   |
//! | Placeholder | nothing                    |

use crate::atom::{AtomId, AtomKind, AtomTree, BranchName, Fence, FractionKind, OperatorKind};
use crate::error::FormatError;
use crate::format::Format;

pub fn to_plain_text(tree: &AtomTree, atoms: &[AtomId]) -> String {
    write_list(tree, atoms)
}

/// Unicode spelling of a command, when it has one.
pub(crate) fn symbol(value: &str) -> Option<&'static str> {
    Some(match value {
        "\\alpha" => "α",
        "\\beta" => "β",
        "\\gamma" => "γ",
        "\\delta" => "δ",
        "\\epsilon" | "\\varepsilon" => "ε",
        "\\zeta" => "ζ",
        "\\eta" => "η",
        "\\theta" | "\\vartheta" => "θ",
        "\\iota" => "ι",
        "\\kappa" => "κ",
        "\\lambda" => "λ",
        "\\mu" => "μ",
        "\\nu" => "ν",
        "\\xi" => "ξ",
        "\\pi" | "\\varpi" => "π",
        "\\rho" | "\\varrho" => "ρ",
        "\\sigma" | "\\varsigma" => "σ",
        "\\tau" => "τ",
        "\\upsilon" => "υ",
        "\\phi" | "\\varphi" => "φ",
        "\\chi" => "χ",
        "\\psi" => "ψ",
        "\\omega" => "ω",
        "\\Gamma" => "Γ",
        "\\Delta" => "Δ",
        "\\Theta" => "Θ",
        "\\Lambda" => "Λ",
        "\\Xi" => "Ξ",
        "\\Pi" => "Π",
        "\\Sigma" => "Σ",
        "\\Upsilon" => "Υ",
        "\\Phi" => "Φ",
        "\\Psi" => "Ψ",
        "\\Omega" => "Ω",
        "\\infty" => "∞",
        "\\partial" => "∂",
        "\\nabla" => "∇",
        "\\emptyset" | "\\varnothing" => "∅",
        "\\forall" => "∀",
        "\\exists" => "∃",
        "\\ell" => "ℓ",
        "\\hbar" => "ℏ",
        "\\aleph" => "ℵ",
        "\\prime" => "′",
        "\\ldots" | "\\dots" => "…",
        "\\cdots" => "⋯",
        "\\times" => "×",
        "\\cdot" => "·",
        "\\pm" => "±",
        "\\mp" => "∓",
        "\\div" => "÷",
        "\\ast" => "∗",
        "\\circ" => "∘",
        "\\cap" => "∩",
        "\\cup" => "∪",
        "\\wedge" | "\\land" => "∧",
        "\\vee" | "\\lor" => "∨",
        "\\setminus" => "∖",
        "\\oplus" => "⊕",
        "\\otimes" => "⊗",
        "\\le" | "\\leq" => "≤",
        "\\ge" | "\\geq" => "≥",
        "\\ne" | "\\neq" => "≠",
        "\\approx" => "≈",
        "\\equiv" => "≡",
        "\\sim" => "∼",
        "\\simeq" => "≃",
        "\\cong" => "≅",
        "\\propto" => "∝",
        "\\in" => "∈",
        "\\notin" => "∉",
        "\\ni" => "∋",
        "\\subset" => "⊂",
        "\\supset" => "⊃",
        "\\subseteq" => "⊆",
        "\\supseteq" => "⊇",
        "\\to" | "\\rightarrow" => "→",
        "\\leftarrow" => "←",
        "\\Rightarrow" | "\\implies" => "⇒",
        "\\Leftarrow" => "⇐",
        "\\leftrightarrow" => "↔",
        "\\Leftrightarrow" | "\\iff" => "⇔",
        "\\mapsto" => "↦",
        "\\mid" => "∣",
        "\\parallel" => "∥",
        "\\perp" => "⊥",
        "\\sum" => "∑",
        "\\prod" => "∏",
        "\\coprod" => "∐",
        "\\int" => "∫",
        "\\iint" => "∬",
        "\\iiint" => "∭",
        "\\oint" => "∮",
        "\\bigcup" => "⋃",
        "\\bigcap" => "⋂",
        "\\langle" => "⟨",
        "\\rangle" => "⟩",
        "\\lfloor" => "⌊",
        "\\rfloor" => "⌋",
        "\\lceil" => "⌈",
        "\\rceil" => "⌉",
        "\\lbrace" => "{",
        "\\rbrace" => "}",
        "\\lvert" | "\\rvert" => "|",
        "\\lVert" | "\\rVert" | "\\|" => "‖",
        "\\neg" | "\\lnot" => "¬",
        "\\backslash" => "\\",
        _ => return None,
    })
}

/// Plain spelling of a symbol value: Unicode when known, otherwise the
/// command name without its backslash.
pub(crate) fn symbol_text(value: &str) -> String {
    if let Some(s) = symbol(value) {
        return s.to_string();
    }
    match value.strip_prefix('\\') {
        Some(name) if name.chars().all(|c| !c.is_ascii_alphabetic()) => {
            // control symbols: `\{`, `\%`, spacing commands
            if matches!(name, "," | ":" | ";" | " ") {
                " ".to_string()
            } else if name == "!" {
                String::new()
            } else {
                name.to_string()
            }
        }
        Some(name) => name.to_string(),
        None => value.to_string(),
    }
}

fn delimiter_text(delim: &str) -> String {
    match delim {
        "." | "?" => String::new(),
        other => symbol_text(other),
    }
}

fn write_list(tree: &AtomTree, atoms: &[AtomId]) -> String {
    let mut out = String::new();
    let mut previous: Option<&AtomKind> = None;
    for id in atoms {
        let Some(atom) = tree.get(*id) else {
            continue;
        };
        let text = write_atom(tree, *id);
        match &atom.kind {
            AtomKind::Operator(OperatorKind::Relation) => {
                out.push(' ');
                out.push_str(&text);
                out.push(' ');
            }
            AtomKind::Operator(OperatorKind::Binary) => {
                let unary = matches!(
                    previous,
                    None | Some(AtomKind::Operator(
                        OperatorKind::Binary | OperatorKind::Relation | OperatorKind::Open
                    ))
                );
                if unary {
                    out.push_str(&text);
                } else {
                    out.push(' ');
                    out.push_str(&text);
                    out.push(' ');
                }
            }
            AtomKind::Operator(OperatorKind::Punctuation) => {
                out.push_str(&text);
                out.push(' ');
            }
            AtomKind::Operator(OperatorKind::Function | OperatorKind::Large) => {
                out.push_str(&text);
                if !atom.has_branch(BranchName::Superscript)
                    && !atom.has_branch(BranchName::Subscript)
                {
                    out.push(' ');
                }
            }
            _ => out.push_str(&text),
        }
        previous = Some(&atom.kind);
    }
    collapse_spaces(&out)
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' && (out.is_empty() || out.ends_with(' ')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end().to_string()
}

fn branch_text(tree: &AtomTree, id: AtomId, branch: BranchName) -> String {
    write_list(tree, tree.branch(id, branch))
}

/// Branch text, parenthesized unless it is a single atom.
fn operand(tree: &AtomTree, id: AtomId, branch: BranchName) -> String {
    let text = branch_text(tree, id, branch);
    let atoms = tree.branch(id, branch);
    let simple = atoms.len() == 1 && tree.get(atoms[0]).is_some_and(|a| a.is_leaf());
    let digits = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());
    if simple || digits {
        text
    } else {
        format!("({text})")
    }
}

fn write_atom(tree: &AtomTree, id: AtomId) -> String {
    let Some(atom) = tree.get(id) else {
        return String::new();
    };
    let mut out = match &atom.kind {
        AtomKind::Root | AtomKind::Group | AtomKind::Prompt(_) | AtomKind::Macro(_) => {
            branch_text(tree, id, BranchName::Body)
        }
        AtomKind::Ord | AtomKind::Operator(_) | AtomKind::Error => symbol_text(&atom.value),
        AtomKind::Space => " ".to_string(),
        AtomKind::Text => atom.value.replace('\u{a0}', " "),
        AtomKind::Placeholder | AtomKind::Subsup => String::new(),
        AtomKind::Fraction(FractionKind::Binomial) => format!(
            "binom({}, {})",
            branch_text(tree, id, BranchName::Above),
            branch_text(tree, id, BranchName::Below)
        ),
        AtomKind::Fraction(_) => format!(
            "{}/{}",
            operand(tree, id, BranchName::Above),
            operand(tree, id, BranchName::Below)
        ),
        AtomKind::Radical => {
            let body = branch_text(tree, id, BranchName::Body);
            if atom.has_branch(BranchName::Index) {
                format!("root({})({body})", branch_text(tree, id, BranchName::Index))
            } else {
                format!("sqrt({body})")
            }
        }
        AtomKind::Fence(fence) => {
            let close = match fence {
                Fence::Explicit { close, .. } => delimiter_text(close),
                Fence::Smart { .. } => String::new(),
            };
            format!(
                "{}{}{close}",
                delimiter_text(fence.open()),
                branch_text(tree, id, BranchName::Body)
            )
        }
        AtomKind::Array(info) => {
            let rows: Vec<String> = (0..info.rows)
                .map(|r| {
                    let cells: Vec<String> = (0..info.cols)
                        .map(|c| branch_text(tree, id, BranchName::Cell(r, c)))
                        .collect();
                    format!("[{}]", cells.join(", "))
                })
                .collect();
            format!("[{}]", rows.join(", "))
        }
        AtomKind::Accent => format!(
            "{}({})",
            symbol_text(&atom.value),
            branch_text(tree, id, BranchName::Body)
        ),
    };
    if atom.has_branch(BranchName::Subscript) {
        out.push('_');
        out.push_str(&operand(tree, id, BranchName::Subscript));
    }
    if atom.has_branch(BranchName::Superscript) {
        out.push('^');
        out.push_str(&operand(tree, id, BranchName::Superscript));
    }
    out
}

/// Format implementation for plain math text
pub struct PlainTextFormat;

impl Format for PlainTextFormat {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn description(&self) -> &str {
        "Plain math text with Unicode symbols"
    }

    fn file_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        Ok(to_plain_text(tree, atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseContext};

    fn plain(markup: &str) -> String {
        let tree = parse(markup, &ParseContext::default()).unwrap();
        to_plain_text(&tree, tree.body())
    }

    #[test]
    fn test_fractions() {
        assert_eq!(plain("\\frac{1}{2}"), "1/2");
        assert_eq!(plain("\\frac{a+b}{2}"), "(a + b)/2");
        assert_eq!(plain("\\frac{12}{x}"), "12/x");
        assert_eq!(plain("\\binom{n}{k}"), "binom(n, k)");
    }

    #[test]
    fn test_operators_and_symbols() {
        assert_eq!(plain("x+1=2"), "x + 1 = 2");
        assert_eq!(plain("-x\\le\\alpha"), "-x ≤ α");
        assert_eq!(plain("\\sin x"), "sin x");
    }

    #[test]
    fn test_scripts_and_roots() {
        assert_eq!(plain("x_i^2"), "x_i^2");
        assert_eq!(plain("e^{i\\pi}"), "e^(iπ)");
        assert_eq!(plain("\\sqrt{x}"), "sqrt(x)");
        assert_eq!(plain("\\sqrt[3]{x}"), "root(3)(x)");
    }

    #[test]
    fn test_fences_arrays_and_text() {
        assert_eq!(plain("\\left\\langle x\\right\\rangle"), "⟨x⟩");
        assert_eq!(plain("(x"), "(x");
        assert_eq!(plain("\\begin{matrix}a&b\\\\c&d\\end{matrix}"), "[[a, b], [c, d]]");
        assert_eq!(plain("\\text{if }x"), "if x");
    }
}
