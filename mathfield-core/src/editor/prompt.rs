//! Prompt content editing.
//!
//! These commands address a prompt by id and replace its body wholesale.
//! A locked prompt rejects them like any other edit; only its correctness
//! and lock state change, out of band.

use std::collections::BTreeMap;

use crate::atom::{AtomId, AtomKind, AtomTree, BranchName, Prompt};
use crate::error::EditError;
use crate::formats::latex::serializer::{serialize_atoms, LatexOptions};

use super::command::PromptFilter;
use super::transaction::{Draft, Target};

/// Prompts matching `filter`, in document order.
pub(crate) fn matching(tree: &AtomTree, filter: &PromptFilter) -> Vec<(AtomId, Prompt)> {
    tree.prompts()
        .into_iter()
        .filter_map(|id| match tree.get(id).map(|a| &a.kind) {
            Some(AtomKind::Prompt(prompt)) if filter.matches(prompt) => Some((id, prompt.clone())),
            _ => None,
        })
        .collect()
}

pub(crate) fn set_content(draft: &mut Draft<'_>, id: &str, markup: &str) -> Result<Target, EditError> {
    let prompt = draft
        .tree
        .find_prompt(id)
        .ok_or_else(|| EditError::UnknownPrompt(id.to_string()))?;
    ensure_unlocked(draft, prompt, id)?;
    let mode = draft.tree.atom(prompt)?.mode;
    let fragment = draft.parse_fragment(markup, mode)?;
    let old = draft.tree.detach_tail(prompt, BranchName::Body, 0)?;
    for atom in old {
        draft.tree.free(atom);
    }
    let ids = draft.graft_checked(&fragment)?;
    draft.tree.insert(prompt, BranchName::Body, 0, &ids)?;
    Ok(Target::Keep)
}

pub(crate) fn strip(
    draft: &mut Draft<'_>,
    filter: &PromptFilter,
    stripped: &mut BTreeMap<String, String>,
) -> Result<Target, EditError> {
    for (atom, prompt) in matching(&draft.tree, filter) {
        ensure_unlocked(draft, atom, &prompt.id)?;
        let body = draft.tree.branch(atom, BranchName::Body).to_vec();
        stripped.insert(
            prompt.id.clone(),
            serialize_atoms(&draft.tree, &body, &LatexOptions::default()),
        );
        if !body.is_empty() {
            for old in draft.tree.detach_tail(atom, BranchName::Body, 0)? {
                draft.tree.free(old);
            }
        }
    }
    Ok(Target::Keep)
}

fn ensure_unlocked(draft: &Draft<'_>, prompt: AtomId, id: &str) -> Result<(), EditError> {
    if draft.tree.is_locked(prompt) {
        return Err(EditError::LockedRegion(format!("prompt '{id}' is locked")));
    }
    Ok(())
}
