//! Style application over ranges.

use crate::atom::{AtomId, AtomTree, Style};
use crate::error::EditError;
use crate::selection::{BranchSpan, Range};

use super::command::StyleOperation;
use super::transaction::{Draft, Target};

/// Apply `style` to each non-collapsed range on its own. A toggle removes
/// the style from a range whose atoms all have it already.
pub(crate) fn apply(
    draft: &mut Draft<'_>,
    ranges: &[Range],
    style: &Style,
    operation: StyleOperation,
) -> Result<Target, EditError> {
    let spans = ranges
        .iter()
        .filter(|r| !r.is_collapsed())
        .map(|r| draft.span(*r))
        .collect::<Result<Vec<BranchSpan>, _>>()?;
    for span in &spans {
        draft.ensure_editable(span.parent)?;
        draft.ensure_removable(&span.atoms(&draft.tree))?;
    }
    for span in spans {
        let atoms = span.atoms(&draft.tree);
        let unset = operation == StyleOperation::Toggle
            && atoms
                .iter()
                .all(|id| draft.tree.effective_style(*id).contains(style));
        for id in atoms {
            if unset {
                clear(&mut draft.tree, id, style)?;
            } else {
                set(&mut draft.tree, id, style)?;
            }
        }
    }
    Ok(Target::Keep)
}

/// Set `style` on `id`; descendants stop overriding the fields it sets.
fn set(tree: &mut AtomTree, id: AtomId, style: &Style) -> Result<(), EditError> {
    let mut local = tree.atom(id)?.style.clone();
    local.overlay(style);
    tree.set_style(id, local)?;
    for descendant in tree.descendants(id) {
        let local = tree.atom(descendant)?.style.without(style);
        tree.set_style(descendant, local)?;
    }
    Ok(())
}

/// Clear the fields `style` sets on `id` and below. Values inherited from
/// outside the range stay in effect.
fn clear(tree: &mut AtomTree, id: AtomId, style: &Style) -> Result<(), EditError> {
    for atom in std::iter::once(id).chain(tree.descendants(id)) {
        let local = tree.atom(atom)?.style.without(style);
        tree.set_style(atom, local)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Variant;
    use crate::formats::latex::to_latex;
    use crate::parser::{parse, ParseContext};

    #[test]
    fn test_set_overrides_descendants() {
        let mut tree = parse("\\frac{\\mathit{a}}{b}", &ParseContext::default()).unwrap();
        let fraction = tree.body()[0];
        let bold = Style::default().with_variant(Variant::Bold);
        set(&mut tree, fraction, &bold).unwrap();
        assert_eq!(to_latex(&tree), "\\mathbf{\\frac{a}{b}}");
    }

    #[test]
    fn test_clear_removes_local_values() {
        let mut tree = parse("\\mathbf{x}", &ParseContext::default()).unwrap();
        let x = tree.body()[0];
        clear(&mut tree, x, &Style::default().with_variant(Variant::Bold)).unwrap();
        assert_eq!(to_latex(&tree), "x");
    }
}
