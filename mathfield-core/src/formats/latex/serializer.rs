//! LaTeX serialization (atom tree → markup)
//!
//! Pipeline: sibling list → runs of atoms sharing a mode and a style delta →
//! wrapper commands around each run → atoms with their branches.
//!
//! The output is shaped so that the parser rebuilds the same tree:
//! - a run whose style differs from what it inherits gets one wrapper per
//!   differing field (variant, family, color, background),
//! - text runs inside math become `\text{..}`, math inside text becomes `$..$`,
//! - scripts are always braced and a bare script carrier is written `{}`,
//! - pending smart fences are written `\left(..\right?`,
//! - macros are written by name with their raw arguments unless expanded.

use crate::atom::{
    AtomId, AtomKind, AtomTree, BranchName, Correctness, Fence, ParseMode, Prompt, Style,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatexOptions {
    /// Write macro bodies instead of macro names
    pub expand_macros: bool,
    /// Mode the emitted markup is read in
    pub root_mode: ParseMode,
}

impl Default for LatexOptions {
    fn default() -> Self {
        LatexOptions {
            expand_macros: false,
            root_mode: ParseMode::Math,
        }
    }
}

/// Serialize the whole document.
pub fn to_latex(tree: &AtomTree) -> String {
    serialize_atoms(tree, tree.body(), &LatexOptions::default())
}

/// Serialize a run of siblings. Styles are written relative to no style at
/// all, so the result carries the effective style of every atom.
pub fn serialize_atoms(tree: &AtomTree, atoms: &[AtomId], options: &LatexOptions) -> String {
    let mut serializer = LatexSerializer {
        tree,
        options,
        out: LatexWriter::default(),
    };
    serializer.write_list(atoms, options.root_mode, &Style::default());
    serializer.out.finish()
}

/// Output buffer that keeps control words from running into letters.
#[derive(Debug, Default)]
struct LatexWriter {
    out: String,
    after_word: bool,
}

impl LatexWriter {
    fn command(&mut self, name: &str) {
        self.out.push('\\');
        self.out.push_str(name);
        self.after_word = name.ends_with(|c: char| c.is_ascii_alphabetic());
    }

    fn raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.after_word {
            if text.starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.out.push(' ');
            } else if text.starts_with(char::is_whitespace) {
                // a space right after a control word would be swallowed
                self.out.push_str("{}");
            }
        }
        self.out.push_str(text);
        self.after_word = ends_with_control_word(text);
    }

    /// One literal space in text mode.
    fn text_space(&mut self) {
        if self.out.ends_with(' ') {
            self.command(" ");
            self.after_word = false;
        } else {
            self.raw(" ");
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn ends_with_control_word(text: &str) -> bool {
    let stem = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    stem.len() < text.len() && stem.ends_with('\\') && !stem.ends_with("\\\\")
}

/// Markup for one character of a text run, or `None` for plain characters.
fn escape_text_char(c: char) -> Option<&'static str> {
    Some(match c {
        '{' => "\\{",
        '}' => "\\}",
        '\\' => "\\textbackslash{}",
        '^' => "\\textasciicircum{}",
        '~' => "\\textasciitilde{}",
        '$' => "\\$",
        '%' => "\\%",
        '&' => "\\&",
        '#' => "\\#",
        '_' => "\\_",
        '\u{a0}' => "~",
        _ => return None,
    })
}

fn prompt_flags(prompt: &Prompt) -> String {
    let mut flags = Vec::new();
    match prompt.correctness {
        Correctness::Correct => flags.push("correct"),
        Correctness::Incorrect => flags.push("incorrect"),
        Correctness::Undefined => {}
    }
    if prompt.locked {
        flags.push("locked");
    }
    flags.join(",")
}

struct LatexSerializer<'a> {
    tree: &'a AtomTree,
    options: &'a LatexOptions,
    out: LatexWriter,
}

impl<'a> LatexSerializer<'a> {
    fn run_key(&self, id: AtomId, inherited: &Style) -> (ParseMode, Style) {
        let mode = match self.tree.get(id) {
            Some(atom) if atom.kind == AtomKind::Text => ParseMode::Text,
            Some(atom) => atom.mode,
            None => ParseMode::Math,
        };
        (mode, self.tree.effective_style(id).delta(inherited))
    }

    fn write_list(&mut self, atoms: &[AtomId], context: ParseMode, inherited: &Style) {
        let mut i = 0;
        while i < atoms.len() {
            let key = self.run_key(atoms[i], inherited);
            let mut j = i + 1;
            while j < atoms.len() && self.run_key(atoms[j], inherited) == key {
                j += 1;
            }
            let (mode, delta) = key;
            self.write_run(&atoms[i..j], mode, &delta, context);
            i = j;
        }
    }

    fn write_run(
        &mut self,
        atoms: &[AtomId],
        mode: ParseMode,
        delta: &Style,
        context: ParseMode,
    ) {
        match (context, mode) {
            (ParseMode::Math, ParseMode::Text) => {
                self.out.command("text");
                self.out.raw("{");
            }
            (ParseMode::Text, ParseMode::Math) => self.out.raw("$"),
            _ => {}
        }
        let wrappers = self.open_styles(delta, mode);
        for id in atoms {
            self.write_atom(*id, mode);
        }
        for _ in 0..wrappers {
            self.out.raw("}");
        }
        match (context, mode) {
            (ParseMode::Math, ParseMode::Text) => self.out.raw("}"),
            (ParseMode::Text, ParseMode::Math) => self.out.raw("$"),
            _ => {}
        }
    }

    /// Open one wrapper per style field; returns how many were opened.
    fn open_styles(&mut self, delta: &Style, mode: ParseMode) -> usize {
        let mut opened = 0;
        if let Some(variant) = delta.variant {
            self.out.command(variant.command(mode));
            self.out.raw("{");
            opened += 1;
        }
        if let Some(family) = delta.font_family {
            self.out.command(family.command(mode));
            self.out.raw("{");
            opened += 1;
        }
        if let Some(color) = &delta.color {
            self.out.command("textcolor");
            self.out.raw(&format!("{{{color}}}{{"));
            opened += 1;
        }
        if let Some(background) = &delta.background {
            self.out.command("colorbox");
            self.out.raw(&format!("{{{background}}}{{"));
            opened += 1;
        }
        opened
    }

    /// `{..}` argument holding one branch of `id`.
    fn write_branch(&mut self, id: AtomId, branch: BranchName, context: ParseMode) {
        self.out.raw("{");
        self.write_branch_inline(id, branch, context);
        self.out.raw("}");
    }

    fn write_branch_inline(&mut self, id: AtomId, branch: BranchName, context: ParseMode) {
        let inherited = self.tree.effective_style(id);
        let children = self.tree.branch(id, branch).to_vec();
        self.write_list(&children, context, &inherited);
    }

    fn write_atom(&mut self, id: AtomId, mode: ParseMode) {
        let tree = self.tree;
        let Some(atom) = tree.get(id) else {
            return;
        };
        match &atom.kind {
            AtomKind::Root => self.write_branch_inline(id, BranchName::Body, mode),
            AtomKind::Ord | AtomKind::Operator(_) | AtomKind::Space | AtomKind::Error => {
                self.out.raw(&atom.value)
            }
            AtomKind::Text => {
                for c in atom.value.chars() {
                    match escape_text_char(c) {
                        Some(escaped) => self.out.raw(escaped),
                        None if c == ' ' => self.out.text_space(),
                        None => self.out.raw(c.encode_utf8(&mut [0; 4])),
                    }
                }
            }
            AtomKind::Fraction(kind) => {
                self.out.command(kind.command());
                self.write_branch(id, BranchName::Above, ParseMode::Math);
                self.write_branch(id, BranchName::Below, ParseMode::Math);
            }
            AtomKind::Radical => {
                self.out.command("sqrt");
                if atom.has_branch(BranchName::Index) {
                    // a bare `]` would end the optional argument
                    let bracketed = tree.branch(id, BranchName::Index).iter().any(|&child| {
                        tree.get(child)
                            .is_some_and(|c| c.kind != AtomKind::Text && c.value == "]")
                    });
                    if bracketed {
                        self.out.raw("[{");
                        self.write_branch_inline(id, BranchName::Index, ParseMode::Math);
                        self.out.raw("}]");
                    } else {
                        self.out.raw("[");
                        self.write_branch_inline(id, BranchName::Index, ParseMode::Math);
                        self.out.raw("]");
                    }
                }
                self.write_branch(id, BranchName::Body, ParseMode::Math);
            }
            AtomKind::Subsup => self.out.raw("{}"),
            AtomKind::Fence(fence) => {
                self.out.command("left");
                self.out.raw(fence.open());
                self.write_branch_inline(id, BranchName::Body, ParseMode::Math);
                self.out.command("right");
                match fence {
                    Fence::Explicit { close, .. } => self.out.raw(close),
                    Fence::Smart { .. } => self.out.raw("?"),
                }
            }
            AtomKind::Array(info) => {
                self.out.command("begin");
                self.out.raw(&format!("{{{}}}", info.environment));
                if let Some(columns) = &info.columns {
                    self.out.raw(&format!("{{{columns}}}"));
                }
                for r in 0..info.rows {
                    if r > 0 {
                        self.out.raw("\\\\");
                    }
                    for c in 0..info.cols {
                        if c > 0 {
                            self.out.raw("&");
                        }
                        self.write_branch_inline(id, BranchName::Cell(r, c), ParseMode::Math);
                    }
                }
                let last_row_empty = info.cols == 1
                    && tree
                        .branch(id, BranchName::Cell(info.rows.saturating_sub(1), 0))
                        .is_empty();
                if info.rows > 1 && last_row_empty {
                    // keeps a trailing empty row from being dropped on reparse
                    self.out.raw("\\\\");
                }
                self.out.command("end");
                self.out.raw(&format!("{{{}}}", info.environment));
            }
            AtomKind::Placeholder => {
                if atom.value == "#@" {
                    self.out.raw("#@");
                } else {
                    self.out.command("placeholder");
                    self.out.raw("{}");
                }
            }
            AtomKind::Prompt(prompt) => {
                self.out.command("placeholder");
                self.out.raw(&format!("[{}]", prompt.id));
                let flags = prompt_flags(prompt);
                if !flags.is_empty() {
                    self.out.raw(&format!("[{flags}]"));
                }
                self.write_branch(id, BranchName::Body, atom.mode);
            }
            AtomKind::Group => self.write_branch(id, BranchName::Body, ParseMode::Math),
            AtomKind::Accent => {
                self.out.raw(&atom.value);
                self.write_branch(id, BranchName::Body, ParseMode::Math);
            }
            AtomKind::Macro(reference) => {
                if self.options.expand_macros {
                    self.write_branch(id, BranchName::Body, atom.mode);
                } else {
                    self.out.raw(&atom.value);
                    for arg in &reference.args {
                        self.out.raw(&format!("{{{arg}}}"));
                    }
                }
            }
        }

        if atom.kind.takes_scripts() {
            if atom.has_branch(BranchName::Subscript) {
                self.out.raw("_");
                self.write_branch(id, BranchName::Subscript, ParseMode::Math);
            }
            if atom.has_branch(BranchName::Superscript) {
                self.out.raw("^");
                self.write_branch(id, BranchName::Superscript, ParseMode::Math);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::macros::{MacroDefinition, MacroDictionary};
    use crate::parser::{parse, ParseContext};

    fn latex(markup: &str) -> String {
        to_latex(&parse(markup, &ParseContext::default()).unwrap())
    }

    #[test]
    fn test_fraction() {
        assert_eq!(latex("\\frac{1}{2}"), "\\frac{1}{2}");
        assert_eq!(latex("\\frac12"), "\\frac{1}{2}");
    }

    #[test]
    fn test_control_words_are_separated_from_letters() {
        assert_eq!(latex("\\alpha x"), "\\alpha x");
        assert_eq!(latex("\\alpha+x"), "\\alpha+x");
        assert_eq!(latex("\\sin\\theta"), "\\sin\\theta");
    }

    #[test]
    fn test_scripts_are_braced() {
        assert_eq!(latex("x^2_i"), "x_{i}^{2}");
        assert_eq!(latex("^2"), "{}^{2}");
    }

    #[test]
    fn test_radical() {
        assert_eq!(latex("\\sqrt[3]x"), "\\sqrt[3]{x}");
        assert_eq!(latex("\\sqrt{x+1}"), "\\sqrt{x+1}");
    }

    #[test]
    fn test_radical_index_with_close_bracket() {
        assert_eq!(latex("\\sqrt[{]}]{x}"), "\\sqrt[{]}]{x}");
        assert_eq!(latex("\\sqrt[{n]}]x"), "\\sqrt[{n]}]{x}");
        assert_eq!(latex("\\sqrt[{n}]{x}"), "\\sqrt[n]{x}");

        let tree = parse("\\sqrt[{]}]{x}", &ParseContext::default()).unwrap();
        let index = tree.branch(tree.body()[0], BranchName::Index);
        assert_eq!(index.len(), 1);
        assert_eq!(tree.get(index[0]).map(|a| a.value.as_str()), Some("]"));
    }

    #[test]
    fn test_fences() {
        assert_eq!(latex("\\left(x\\right]"), "\\left(x\\right]");
        assert_eq!(latex("(x"), "\\left(x\\right?");
        assert_eq!(latex("(x)"), "(x)");
    }

    #[test]
    fn test_text_runs_and_escapes() {
        assert_eq!(latex("\\text{if } x"), "\\text{if }x");
        assert_eq!(latex("\\text{50\\% off}"), "\\text{50\\% off}");
        assert_eq!(
            latex("\\text{a\\textbackslash b}"),
            "\\text{a\\textbackslash{}b}"
        );
        // math inside text at the top level is just math
        assert_eq!(latex("\\text{a $x$}"), "\\text{a }x");
    }

    #[test]
    fn test_style_runs() {
        assert_eq!(latex("\\mathbf{ab}c"), "\\mathbf{ab}c");
        assert_eq!(
            latex("\\textcolor{red}{x\\mathbf{y}}"),
            "\\textcolor{red}{x}\\mathbf{\\textcolor{red}{y}}"
        );
        assert_eq!(latex("\\mathbf{\\frac{a}{b}}"), "\\mathbf{\\frac{a}{b}}");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            latex("\\begin{pmatrix}a&b\\\\c&d\\end{pmatrix}"),
            "\\begin{pmatrix}a&b\\\\c&d\\end{pmatrix}"
        );
        assert_eq!(
            latex("\\begin{array}{cc}1&2\\end{array}"),
            "\\begin{array}{cc}1&2\\end{array}"
        );
    }

    #[test]
    fn test_prompts_and_placeholders() {
        assert_eq!(
            latex("\\placeholder[p1][locked,correct]{x}"),
            "\\placeholder[p1][correct,locked]{x}"
        );
        assert_eq!(latex("\\placeholder[p1]{}"), "\\placeholder[p1]{}");
        assert_eq!(latex("#?"), "\\placeholder{}");
    }

    #[test]
    fn test_macros_keep_their_names() {
        let mut macros = MacroDictionary::new();
        macros.insert("half", MacroDefinition::new("\\frac{#1}{2}", 1));
        let ctx = ParseContext::default().with_macros(macros);
        let tree = parse("\\half{x}y", &ctx).unwrap();
        assert_eq!(to_latex(&tree), "\\half{x}y");

        let expanded = LatexOptions {
            expand_macros: true,
            ..LatexOptions::default()
        };
        assert_eq!(
            serialize_atoms(&tree, tree.body(), &expanded),
            "{\\frac{x}{2}}y"
        );
    }

    #[test]
    fn test_text_root_mode() {
        let ctx = ParseContext::default().with_default_mode(ParseMode::Text);
        let tree = parse("area $\\pi r^2$", &ctx).unwrap();
        let options = LatexOptions {
            root_mode: ParseMode::Text,
            ..LatexOptions::default()
        };
        assert_eq!(
            serialize_atoms(&tree, tree.body(), &options),
            "area $\\pi r^{2}$"
        );
    }
}
