//! Built-in command table.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::atom::{FontFamily, FractionKind, OperatorKind, Variant};

/// How the parser treats a built-in command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSpec {
    Ord,
    Operator(OperatorKind),
    Fraction(FractionKind),
    Sqrt,
    Accent,
    Space,
    /// `\mathbf{..}` and friends; keeps the current mode
    Variant(Variant),
    Family(FontFamily),
    /// `\text{..}`, `\textbf{..}`: switches the argument to text mode
    TextMode(Option<Variant>, Option<FontFamily>),
    /// `\textcolor{c}{..}`
    Color,
    /// `\color{c}`: applies to the rest of the current group
    ColorSwitch,
    /// `\colorbox{c}{..}`
    ColorBox,
    Left,
    Right,
    Begin,
    End,
    Placeholder,
    /// `\(`
    MathOpen,
    /// `\)`
    MathClose,
    RowSeparator,
    /// Text-mode character given by name (`\textbackslash`)
    TextSymbol(char),
}

/// Characters given by a control symbol (`\%`) in either mode.
pub fn escaped_char(name: &str) -> Option<char> {
    match name {
        "%" | "$" | "#" | "&" | "_" | "{" | "}" => name.chars().next(),
        _ => None,
    }
}

const ORDS: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "pi", "varpi", "rho", "varrho",
    "sigma", "varsigma", "tau", "upsilon", "phi", "varphi", "chi", "psi", "omega", "Gamma",
    "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi", "Omega", "infty",
    "partial", "nabla", "emptyset", "varnothing", "forall", "exists", "nexists", "ell", "hbar",
    "imath", "jmath", "aleph", "prime", "ldots", "cdots", "dots", "vdots", "ddots", "angle",
    "triangle", "degree", "backslash", "neg", "lnot", "top", "bot", "Re", "Im", "wp",
    "%", "$", "#", "&", "_", "|",
];

const BINARY: &[&str] = &[
    "times", "cdot", "pm", "mp", "div", "ast", "star", "circ", "bullet", "cap", "cup", "wedge",
    "land", "vee", "lor", "setminus", "oplus", "ominus", "otimes", "oslash", "odot", "sqcup",
    "sqcap", "uplus", "amalg",
];

const RELATIONS: &[&str] = &[
    "le", "leq", "ge", "geq", "ne", "neq", "approx", "equiv", "sim", "simeq", "cong", "propto",
    "in", "notin", "ni", "subset", "supset", "subseteq", "supseteq", "to", "rightarrow",
    "leftarrow", "Rightarrow", "Leftarrow", "leftrightarrow", "Leftrightarrow", "mapsto",
    "implies", "iff", "mid", "parallel", "perp", "ll", "gg", "prec", "succ", "preceq", "succeq",
    "models", "vdash", "dashv", "coloneq",
];

const PUNCTUATION: &[&str] = &["colon", "ldotp", "cdotp"];

const OPENERS: &[&str] = &["{", "langle", "lfloor", "lceil", "lbrace", "lvert", "lVert"];

const CLOSERS: &[&str] = &["}", "rangle", "rfloor", "rceil", "rbrace", "rvert", "rVert"];

const LARGE: &[&str] = &[
    "sum", "prod", "coprod", "int", "iint", "iiint", "oint", "bigcup", "bigcap", "bigoplus",
    "bigotimes", "bigodot", "biguplus", "bigvee", "bigwedge",
];

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "coth", "log", "ln", "lg", "exp", "lim", "limsup", "liminf", "max", "min", "sup",
    "inf", "det", "gcd", "deg", "dim", "ker", "arg", "Pr", "hom",
];

const ACCENTS: &[&str] = &[
    "hat", "widehat", "bar", "overline", "underline", "vec", "overrightarrow", "overleftarrow",
    "dot", "ddot", "tilde", "widetilde", "acute", "grave", "breve", "check", "mathring",
    "overbrace", "underbrace",
];

const SPACES: &[&str] = &[",", ":", ";", "!", " ", "quad", "qquad", "enspace", "thinspace"];

static COMMANDS: Lazy<HashMap<&'static str, CommandSpec>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let groups: [(&[&str], CommandSpec); 10] = [
        (ORDS, CommandSpec::Ord),
        (BINARY, CommandSpec::Operator(OperatorKind::Binary)),
        (RELATIONS, CommandSpec::Operator(OperatorKind::Relation)),
        (PUNCTUATION, CommandSpec::Operator(OperatorKind::Punctuation)),
        (OPENERS, CommandSpec::Operator(OperatorKind::Open)),
        (CLOSERS, CommandSpec::Operator(OperatorKind::Close)),
        (LARGE, CommandSpec::Operator(OperatorKind::Large)),
        (FUNCTIONS, CommandSpec::Operator(OperatorKind::Function)),
        (ACCENTS, CommandSpec::Accent),
        (SPACES, CommandSpec::Space),
    ];
    for (names, spec) in groups {
        for name in names {
            table.insert(*name, spec);
        }
    }

    table.insert("frac", CommandSpec::Fraction(FractionKind::Frac));
    table.insert("dfrac", CommandSpec::Fraction(FractionKind::Display));
    table.insert("tfrac", CommandSpec::Fraction(FractionKind::Text));
    table.insert("binom", CommandSpec::Fraction(FractionKind::Binomial));
    table.insert("sqrt", CommandSpec::Sqrt);

    table.insert("mathbf", CommandSpec::Variant(Variant::Bold));
    table.insert("mathit", CommandSpec::Variant(Variant::Italic));
    table.insert("boldsymbol", CommandSpec::Variant(Variant::BoldItalic));
    table.insert("mathbb", CommandSpec::Variant(Variant::DoubleStruck));
    table.insert("mathcal", CommandSpec::Variant(Variant::Calligraphic));
    table.insert("mathfrak", CommandSpec::Variant(Variant::Fraktur));
    table.insert("mathscr", CommandSpec::Variant(Variant::Script));
    table.insert("mathup", CommandSpec::Variant(Variant::Normal));
    table.insert("mathrm", CommandSpec::Family(FontFamily::Roman));
    table.insert("textup", CommandSpec::Variant(Variant::Normal));
    table.insert("mathsf", CommandSpec::Family(FontFamily::SansSerif));
    table.insert("mathtt", CommandSpec::Family(FontFamily::Monospace));

    table.insert("text", CommandSpec::TextMode(None, None));
    table.insert("mbox", CommandSpec::TextMode(None, None));
    table.insert("textbf", CommandSpec::TextMode(Some(Variant::Bold), None));
    table.insert("textit", CommandSpec::TextMode(Some(Variant::Italic), None));
    table.insert("textrm", CommandSpec::TextMode(None, Some(FontFamily::Roman)));
    table.insert("textsf", CommandSpec::TextMode(None, Some(FontFamily::SansSerif)));
    table.insert("texttt", CommandSpec::TextMode(None, Some(FontFamily::Monospace)));

    table.insert("textcolor", CommandSpec::Color);
    table.insert("color", CommandSpec::ColorSwitch);
    table.insert("colorbox", CommandSpec::ColorBox);

    table.insert("left", CommandSpec::Left);
    table.insert("right", CommandSpec::Right);
    table.insert("begin", CommandSpec::Begin);
    table.insert("end", CommandSpec::End);
    table.insert("placeholder", CommandSpec::Placeholder);
    table.insert("(", CommandSpec::MathOpen);
    table.insert(")", CommandSpec::MathClose);
    table.insert("\\", CommandSpec::RowSeparator);

    table.insert("textbackslash", CommandSpec::TextSymbol('\\'));
    table.insert("textasciicircum", CommandSpec::TextSymbol('^'));
    table.insert("textasciitilde", CommandSpec::TextSymbol('~'));
    table
});

pub fn lookup(name: &str) -> Option<CommandSpec> {
    COMMANDS.get(name).copied()
}

/// Environments accepted by `\begin{..}`.
pub const ENVIRONMENTS: &[&str] = &[
    "matrix", "pmatrix", "bmatrix", "Bmatrix", "vmatrix", "Vmatrix", "smallmatrix", "array",
    "cases", "aligned", "gathered", "split",
];

/// Delimiters accepted after `\left` and `\right`.
pub fn is_delimiter(delim: &str) -> bool {
    matches!(
        delim,
        "(" | ")"
            | "["
            | "]"
            | "|"
            | "."
            | "/"
            | "\\{"
            | "\\}"
            | "\\|"
            | "\\langle"
            | "\\rangle"
            | "\\lfloor"
            | "\\rfloor"
            | "\\lceil"
            | "\\rceil"
            | "\\lbrace"
            | "\\rbrace"
            | "\\lvert"
            | "\\rvert"
            | "\\lVert"
            | "\\rVert"
            | "\\vert"
            | "\\Vert"
    )
}
