//! Speakable text export
//!
//! Produces the words a screen reader or speech engine would say for an
//! expression. Nothing is spoken here; the host feeds the string to whatever
//! engine it uses.
//!
//! Compound parts are closed explicitly ("end fraction", "end root") so the
//! listener can tell where they stop. Simple parts (one symbol or a number)
//! are read without the closing words: `\frac{1}{2}` is "1 over 2".

use crate::atom::{AtomId, AtomKind, AtomTree, BranchName, Fence, FractionKind, OperatorKind};
use crate::error::FormatError;
use crate::format::Format;

pub fn to_spoken_text(tree: &AtomTree, atoms: &[AtomId]) -> String {
    normalize(&speak_list(tree, atoms))
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn symbol_words(value: &str) -> Option<&'static str> {
    Some(match value {
        "+" => "plus",
        "-" => "minus",
        "*" | "\\times" | "\\cdot" | "\\ast" => "times",
        "\\div" | "/" => "divided by",
        "\\pm" => "plus or minus",
        "\\mp" => "minus or plus",
        "=" => "equals",
        "<" => "is less than",
        ">" => "is greater than",
        "\\le" | "\\leq" => "is less than or equal to",
        "\\ge" | "\\geq" => "is greater than or equal to",
        "\\ne" | "\\neq" => "is not equal to",
        "\\approx" => "is approximately equal to",
        "\\equiv" => "is equivalent to",
        "\\sim" => "is similar to",
        "\\propto" => "is proportional to",
        "\\in" => "is an element of",
        "\\notin" => "is not an element of",
        "\\subset" => "is a subset of",
        "\\subseteq" => "is a subset of or equal to",
        "\\to" | "\\rightarrow" => "goes to",
        "\\Rightarrow" | "\\implies" => "implies",
        "\\iff" | "\\Leftrightarrow" => "if and only if",
        "\\mapsto" => "maps to",
        "\\cup" => "union",
        "\\cap" => "intersection",
        "\\wedge" | "\\land" => "and",
        "\\vee" | "\\lor" => "or",
        "\\neg" | "\\lnot" => "not",
        "\\forall" => "for all",
        "\\exists" => "there exists",
        "\\infty" => "infinity",
        "\\partial" => "partial",
        "\\nabla" => "nabla",
        "\\emptyset" | "\\varnothing" => "the empty set",
        "\\ldots" | "\\cdots" | "\\dots" => "dot dot dot",
        "\\prime" => "prime",
        "," => "comma",
        ";" => "semicolon",
        ":" => "colon",
        "(" => "open paren",
        ")" => "close paren",
        "[" => "open bracket",
        "]" => "close bracket",
        "\\{" | "\\lbrace" => "open brace",
        "\\}" | "\\rbrace" => "close brace",
        "|" | "\\lvert" | "\\rvert" => "vertical bar",
        "\\langle" => "open angle",
        "\\rangle" => "close angle",
        "\\sum" => "the sum",
        "\\prod" => "the product",
        "\\int" => "the integral",
        "\\oint" => "the contour integral",
        "\\sin" => "sine",
        "\\cos" => "cosine",
        "\\tan" => "tangent",
        "\\cot" => "cotangent",
        "\\sec" => "secant",
        "\\csc" => "cosecant",
        "\\ln" => "natural log",
        "\\log" => "log",
        "\\exp" => "exponential",
        "\\lim" => "the limit",
        "\\max" => "maximum",
        "\\min" => "minimum",
        "\\det" => "determinant",
        "\\gcd" => "greatest common divisor",
        "\\hat" | "\\widehat" => "hat",
        "\\bar" | "\\overline" => "bar",
        "\\vec" | "\\overrightarrow" => "vector",
        "\\dot" => "dot",
        "\\ddot" => "double dot",
        "\\tilde" | "\\widetilde" => "tilde",
        _ => return None,
    })
}

/// Words for a symbol: a known reading, else the command name.
fn word(value: &str) -> String {
    match symbol_words(value) {
        Some(words) => words.to_string(),
        None => value.trim_start_matches('\\').to_string(),
    }
}

fn closing_word(delim: &str) -> String {
    match delim {
        "." | "?" => String::new(),
        ")" => "close paren".to_string(),
        "]" => "close bracket".to_string(),
        other => word(other),
    }
}

fn speak_list(tree: &AtomTree, atoms: &[AtomId]) -> String {
    let mut words = Vec::new();
    let mut number = String::new();
    for id in atoms {
        let Some(atom) = tree.get(*id) else {
            continue;
        };
        let is_digit = atom.kind == AtomKind::Ord
            && atom.is_leaf()
            && (atom.value.chars().all(|c| c.is_ascii_digit()) || atom.value == ".");
        if is_digit {
            number.push_str(&atom.value);
            continue;
        }
        if !number.is_empty() {
            words.push(std::mem::take(&mut number));
        }
        words.push(speak_atom(tree, *id));
    }
    if !number.is_empty() {
        words.push(number);
    }
    words.join(" ")
}

/// One symbol or one number, read without closing words.
fn is_simple(tree: &AtomTree, atoms: &[AtomId]) -> bool {
    let all_digits = !atoms.is_empty()
        && atoms.iter().all(|id| {
            tree.get(*id).is_some_and(|a| {
                a.kind == AtomKind::Ord && a.is_leaf() && a.value.chars().all(|c| c.is_ascii_digit())
            })
        });
    let single = atoms.len() == 1
        && tree.get(atoms[0]).is_some_and(|a| {
            a.is_leaf() && matches!(a.kind, AtomKind::Ord | AtomKind::Text | AtomKind::Placeholder)
        });
    all_digits || single
}

fn speak_branch(tree: &AtomTree, id: AtomId, branch: BranchName) -> String {
    speak_list(tree, tree.branch(id, branch))
}

fn speak_atom(tree: &AtomTree, id: AtomId) -> String {
    let Some(atom) = tree.get(id) else {
        return String::new();
    };
    let mut out = match &atom.kind {
        AtomKind::Root | AtomKind::Group | AtomKind::Macro(_) => {
            speak_branch(tree, id, BranchName::Body)
        }
        AtomKind::Prompt(_) => {
            if tree.branch(id, BranchName::Body).is_empty() {
                "blank".to_string()
            } else {
                speak_branch(tree, id, BranchName::Body)
            }
        }
        AtomKind::Ord | AtomKind::Operator(_) | AtomKind::Error => word(&atom.value),
        AtomKind::Space | AtomKind::Subsup => String::new(),
        AtomKind::Text => atom.value.clone(),
        AtomKind::Placeholder => "blank".to_string(),
        AtomKind::Fraction(kind) => {
            let above = tree.branch(id, BranchName::Above);
            let below = tree.branch(id, BranchName::Below);
            let num = speak_list(tree, above);
            let den = speak_list(tree, below);
            match kind {
                FractionKind::Binomial => format!("{num} choose {den}"),
                _ if is_simple(tree, above) && is_simple(tree, below) => {
                    format!("{num} over {den}")
                }
                _ => format!("the fraction {num} over {den} end fraction"),
            }
        }
        AtomKind::Radical => {
            let body = tree.branch(id, BranchName::Body);
            let words = speak_list(tree, body);
            let lead = match tree.get(id).and_then(|a| a.branch(BranchName::Index)) {
                None => "the square root of".to_string(),
                Some(index) => {
                    let index_words = speak_list(tree, index);
                    match index_words.as_str() {
                        "" | "2" => "the square root of".to_string(),
                        "3" => "the cube root of".to_string(),
                        other => format!("the {other} root of"),
                    }
                }
            };
            if is_simple(tree, body) {
                format!("{lead} {words}")
            } else {
                format!("{lead} {words} end root")
            }
        }
        AtomKind::Fence(fence) => {
            let close = match fence {
                Fence::Explicit { close, .. } => closing_word(close),
                Fence::Smart { .. } => String::new(),
            };
            let open = match fence.open() {
                "." => String::new(),
                other => word(other),
            };
            format!("{open} {} {close}", speak_branch(tree, id, BranchName::Body))
        }
        AtomKind::Array(info) => {
            let mut parts = vec![format!("a {} by {} matrix", info.rows, info.cols)];
            for r in 0..info.rows {
                let cells: Vec<String> = (0..info.cols)
                    .map(|c| normalize(&speak_branch(tree, id, BranchName::Cell(r, c))))
                    .collect();
                parts.push(format!("row {}: {}", r + 1, cells.join(", ")));
            }
            parts.join(", ")
        }
        AtomKind::Accent => format!("{} {}", speak_branch(tree, id, BranchName::Body), word(&atom.value)),
    };

    if let Some(sub) = atom.branch(BranchName::Subscript) {
        let words = speak_list(tree, sub);
        if is_simple(tree, sub) {
            out.push_str(&format!(" sub {words}"));
        } else {
            out.push_str(&format!(" sub {words} end sub"));
        }
    }
    if let Some(sup) = atom.branch(BranchName::Superscript) {
        let words = normalize(&speak_list(tree, sup));
        let phrase = match words.as_str() {
            "2" => " squared".to_string(),
            "3" => " cubed".to_string(),
            "\\prime" | "prime" => " prime".to_string(),
            _ if is_simple(tree, sup) => format!(" to the power of {words}"),
            _ => format!(" to the power of {words} end exponent"),
        };
        out.push_str(&phrase);
    }
    if matches!(atom.kind, AtomKind::Operator(OperatorKind::Large)) && out.contains(" sub ") {
        // `\sum_{i=1}^{n}` reads better as "from .. to .."
        out = out.replacen(" sub ", " from ", 1).replacen(" to the power of ", " to ", 1);
        out = out.replace(" end sub", "").replace(" end exponent", "");
    }
    out
}

/// Format implementation for speakable text
pub struct SpokenTextFormat;

impl Format for SpokenTextFormat {
    fn name(&self) -> &str {
        "spoken-text"
    }

    fn description(&self) -> &str {
        "Words for reading an expression aloud"
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        Ok(to_spoken_text(tree, atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseContext};

    fn spoken(markup: &str) -> String {
        let tree = parse(markup, &ParseContext::default()).unwrap();
        to_spoken_text(&tree, tree.body())
    }

    #[test]
    fn test_simple_expressions() {
        assert_eq!(spoken("x+12=y"), "x plus 12 equals y");
        assert_eq!(spoken("\\frac{1}{2}"), "1 over 2");
        assert_eq!(spoken("x^2"), "x squared");
        assert_eq!(spoken("x^n"), "x to the power of n");
    }

    #[test]
    fn test_compound_parts_are_closed() {
        assert_eq!(
            spoken("\\frac{a+b}{2}"),
            "the fraction a plus b over 2 end fraction"
        );
        assert_eq!(spoken("\\sqrt{x+1}"), "the square root of x plus 1 end root");
        assert_eq!(spoken("\\sqrt[3]{x}"), "the cube root of x");
        assert_eq!(
            spoken("e^{i\\pi}"),
            "e to the power of i pi end exponent"
        );
    }

    #[test]
    fn test_fences_and_placeholders() {
        assert_eq!(spoken("(x)"), "open paren x close paren");
        assert_eq!(spoken("\\left[x\\right)"), "open bracket x close paren");
        assert_eq!(spoken("\\placeholder{}+1"), "blank plus 1");
    }

    #[test]
    fn test_large_operators_read_their_limits() {
        assert_eq!(spoken("\\sum_{i}^{n}"), "the sum from i to n");
    }
}
