//! Keystroke semantics.
//!
//! Typed text is handled one character at a time, each character seeing the
//! tree the previous one left behind. In math mode a few characters are
//! structural: `^` and `_` open scripts, `/` builds a fraction from the
//! preceding operand, delimiters go through the smart fence rules and a
//! space leaves the current branch. Everything else becomes one atom.

use crate::atom::{
    matching_close, Atom, AtomId, AtomKind, AtomTree, BranchName, Fence, FractionKind,
    OperatorKind, ParseMode,
};
use crate::error::EditError;
use crate::parser::math_char_atom;
use crate::selection::Position;

use super::fence;
use super::script;
use super::transaction::{Draft, Target};

pub(crate) fn type_text(draft: &mut Draft<'_>, text: &str) -> Result<Target, EditError> {
    let mut chars = text.chars().peekable();
    let Some(&first) = chars.peek() else {
        return Ok(Target::Keep);
    };
    let range = draft.selection.primary();
    let mut caret = if range.is_collapsed() {
        draft.position(range.focus)?
    } else {
        let span = draft.span(range)?;
        draft.ensure_editable(span.parent)?;
        draft.ensure_removable(&span.atoms(&draft.tree))?;
        let removed = draft.tree.detach(span.parent, span.branch, span.start..span.end)?;
        let wrap = (draft.mode == ParseMode::Math && draft.options.smart_fence)
            .then(|| fence::opener(first))
            .flatten();
        match wrap {
            Some(open) => {
                // an opener typed over a selection fences it
                chars.next();
                let close = matching_close(open).unwrap_or(".");
                let fence = draft.new_atom(
                    Atom::new(
                        AtomKind::Fence(Fence::Explicit {
                            open: open.to_string(),
                            close: close.to_string(),
                        }),
                        "",
                    )
                    .with_branch(BranchName::Body, removed),
                );
                draft.tree.insert(span.parent, span.branch, span.start, &[fence])?;
                Position::new(span.parent, span.branch, span.start + 1)
            }
            None => Position::new(span.parent, span.branch, span.start),
        }
    };
    for c in chars {
        caret = type_char(draft, caret, c)?;
    }
    Ok(Target::Caret(caret))
}

/// Characters that end a smart-mode text run.
fn leaves_text(c: char) -> bool {
    c.is_ascii_digit() || "+-=<>^_/".contains(c)
}

fn type_char(draft: &mut Draft<'_>, caret: Position, c: char) -> Result<Position, EditError> {
    draft.ensure_editable(caret.parent)?;
    if draft.mode == ParseMode::Text {
        if !(draft.options.smart_mode && leaves_text(c)) {
            let text = Atom::new(AtomKind::Text, c.to_string()).in_mode(ParseMode::Text);
            let atom = draft.new_atom(text);
            return draft.place(caret, &[atom]);
        }
        draft.mode = ParseMode::Math;
    }

    let leap_base = c.is_ascii_digit().then(|| superscript_leap(draft, caret)).flatten();
    let next = type_math_char(draft, caret, c)?;
    if let Some(after) = leap_base.and_then(|base| Position::after(&draft.tree, base)) {
        return Ok(after);
    }
    Ok(next)
}

/// Base of the empty superscript the caret sits in: a digit typed there
/// leaves the script right after it.
fn superscript_leap(draft: &Draft<'_>, caret: Position) -> Option<AtomId> {
    if !draft.options.smart_superscript || caret.branch != BranchName::Superscript {
        return None;
    }
    let base = draft.tree.get(caret.parent)?;
    let empty = base.branch(BranchName::Superscript).is_some_and(<[AtomId]>::is_empty);
    empty.then_some(caret.parent)
}

fn type_math_char(draft: &mut Draft<'_>, caret: Position, c: char) -> Result<Position, EditError> {
    let opener = draft.options.smart_fence.then(|| fence::opener(c)).flatten();
    match (c, opener, fence::closer(c)) {
        ('^', ..) => script::enter(draft, caret, BranchName::Superscript),
        ('_', ..) => script::enter(draft, caret, BranchName::Subscript),
        ('/', ..) => fraction(draft, caret),
        (' ', ..) => space(draft, caret),
        (_, Some(open), _) => fence::type_open(draft, caret, open),
        (_, None, Some(close)) => fence::type_close(draft, caret, close),
        _ => {
            let atom = draft.new_atom(math_atom(c));
            let caret = draft.place(caret, &[atom])?;
            smart_mode(draft, caret)
        }
    }
}

/// Atom for a character typed in math mode. Characters that are markup
/// syntax become the command that spells them.
fn math_atom(c: char) -> Atom {
    let (kind, value) = match c {
        '%' => (AtomKind::Ord, "\\%"),
        '#' => (AtomKind::Ord, "\\#"),
        '&' => (AtomKind::Ord, "\\&"),
        '$' => (AtomKind::Ord, "\\$"),
        '\\' => (AtomKind::Ord, "\\backslash"),
        '~' => (AtomKind::Operator(OperatorKind::Relation), "\\sim"),
        '{' => (AtomKind::Operator(OperatorKind::Open), "\\{"),
        '}' => (AtomKind::Operator(OperatorKind::Close), "\\}"),
        _ => return math_char_atom(c),
    };
    Atom::new(kind, value)
}

fn space(draft: &mut Draft<'_>, caret: Position) -> Result<Position, EditError> {
    if !draft.options.math_mode_space.is_empty() {
        let fragment = draft.parse_fragment(&draft.options.math_mode_space, ParseMode::Math)?;
        let ids = draft.graft_checked(&fragment)?;
        return draft.place(caret, &ids);
    }
    if caret.parent == draft.root() {
        return Ok(caret);
    }
    Ok(Position::after(&draft.tree, caret.parent).unwrap_or(caret))
}

/// Atoms that bound a typed numerator.
fn is_separator(tree: &AtomTree, id: AtomId) -> bool {
    let Some(atom) = tree.get(id) else {
        return true;
    };
    atom.mode == ParseMode::Text
        || matches!(
            atom.kind,
            AtomKind::Text
                | AtomKind::Operator(
                    OperatorKind::Binary
                        | OperatorKind::Relation
                        | OperatorKind::Punctuation
                        | OperatorKind::Open
                        | OperatorKind::Close
                        | OperatorKind::Large
                )
        )
}

/// Index where the numerator for a `/` typed at `index` starts: the
/// parenthesized group right before the caret, else the run of operands.
fn numerator_start(tree: &AtomTree, siblings: &[AtomId], index: usize) -> usize {
    let kind = |i: usize| tree.get(siblings[i]).map(|a| &a.kind);
    if index > 0 && kind(index - 1).is_some_and(|k| k.is_operator(OperatorKind::Close)) {
        let mut depth = 0usize;
        for i in (0..index).rev() {
            match kind(i) {
                Some(k) if k.is_operator(OperatorKind::Close) => depth += 1,
                Some(k) if k.is_operator(OperatorKind::Open) => {
                    depth -= 1;
                    if depth == 0 {
                        return i;
                    }
                }
                _ => {}
            }
        }
    }
    let mut start = index;
    while start > 0 && !is_separator(tree, siblings[start - 1]) {
        start -= 1;
    }
    start
}

/// Remove a pair of parentheses wrapping the whole numerator.
fn strip_parentheses(tree: &mut AtomTree, numerator: Vec<AtomId>) -> Result<Vec<AtomId>, EditError> {
    let literal = |id: &AtomId, op: OperatorKind, value: &str| {
        tree.get(*id)
            .is_some_and(|a| a.kind.is_operator(op) && a.value == value)
    };
    if let [open, inner @ .., close] = numerator.as_slice() {
        if literal(open, OperatorKind::Open, "(") && literal(close, OperatorKind::Close, ")") {
            let inner = inner.to_vec();
            tree.free(*open);
            tree.free(*close);
            return Ok(inner);
        }
    }
    if let [only] = numerator.as_slice() {
        let explicit = matches!(
            tree.get(*only).map(|a| &a.kind),
            Some(AtomKind::Fence(Fence::Explicit { open, close })) if open == "(" && close == ")"
        );
        if explicit {
            let body = tree.detach_tail(*only, BranchName::Body, 0)?;
            tree.free(*only);
            return Ok(body);
        }
    }
    Ok(numerator)
}

fn fraction(draft: &mut Draft<'_>, caret: Position) -> Result<Position, EditError> {
    let siblings = draft.tree.branch(caret.parent, caret.branch).to_vec();
    let start = numerator_start(&draft.tree, &siblings, caret.index);
    let mut numerator = draft.tree.detach(caret.parent, caret.branch, start..caret.index)?;
    if draft.options.remove_extraneous_parentheses {
        numerator = strip_parentheses(&mut draft.tree, numerator)?;
    }
    let empty = numerator.is_empty();
    if empty {
        numerator.push(draft.placeholder());
    }
    let denominator = draft.placeholder();
    let fraction = draft.new_atom(
        Atom::new(AtomKind::Fraction(FractionKind::Frac), "")
            .with_branch(BranchName::Above, numerator)
            .with_branch(BranchName::Below, vec![denominator]),
    );
    draft.tree.insert(caret.parent, caret.branch, start, &[fraction])?;
    let branch = if empty { BranchName::Above } else { BranchName::Below };
    Ok(Position::new(fraction, branch, 0))
}

/// Plain single-letter math atom, the unit smart mode reclassifies.
fn is_letter(tree: &AtomTree, id: AtomId) -> bool {
    tree.get(id).is_some_and(|a| {
        a.kind == AtomKind::Ord
            && a.mode == ParseMode::Math
            && a.branches().is_empty()
            && a.value.len() == 1
            && a.value.chars().all(|c| c.is_ascii_alphabetic())
    })
}

/// Turn the letter run ending at the caret into text when the smart mode
/// policy reads it as a word.
fn smart_mode(draft: &mut Draft<'_>, caret: Position) -> Result<Position, EditError> {
    if !draft.options.smart_mode {
        return Ok(caret);
    }
    let siblings = draft.tree.branch(caret.parent, caret.branch).to_vec();
    let mut start = caret.index;
    while start > 0 && is_letter(&draft.tree, siblings[start - 1]) {
        start -= 1;
    }
    if start == caret.index {
        return Ok(caret);
    }
    let run = &siblings[start..caret.index];
    let word: String = run
        .iter()
        .filter_map(|id| draft.tree.get(*id).map(|a| a.value.clone()))
        .collect();
    if draft.ctx.smart_mode_policy.classify(&word) != Some(ParseMode::Text) {
        return Ok(caret);
    }
    for id in run {
        let value = draft.tree.atom(*id)?.value.clone();
        draft.tree.retag(*id, AtomKind::Text, value, ParseMode::Text)?;
    }
    draft.mode = ParseMode::Text;
    Ok(caret)
}
