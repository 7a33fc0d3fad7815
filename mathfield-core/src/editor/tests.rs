use std::collections::BTreeMap;

use super::*;
use crate::atom::Variant;
use crate::error::FormatError;

fn field(markup: &str) -> Mathfield {
    Mathfield::with_value(markup, EditorOptions::default(), ParseContext::default()).unwrap()
}

fn typed(field: &mut Mathfield, text: &str) {
    field.execute(Command::typed(text)).unwrap();
}

fn bold() -> Style {
    Style::default().with_variant(Variant::Bold)
}

// ===== Typing =====

#[test]
fn test_typing_plain_atoms() {
    let mut field = Mathfield::default();
    typed(&mut field, "a+b");
    assert_eq!(field.value(), "a+b");
    assert_eq!(field.position(), 3);
}

#[test]
fn test_smart_fence_stays_open_until_closed() {
    let mut field = Mathfield::default();
    typed(&mut field, "(x");
    assert_eq!(field.value(), "\\left(x\\right?");

    typed(&mut field, ")");
    assert_eq!(field.value(), "\\left(x\\right)");
    // caret ends up after the fence
    assert_eq!(field.position(), field.offsets().end_of_root(field.tree()));
}

#[test]
fn test_delimiters_stay_literal_without_smart_fence() {
    let options = EditorOptions {
        smart_fence: false,
        ..EditorOptions::default()
    };
    let mut field = Mathfield::new(options, ParseContext::default());
    typed(&mut field, "(x]");
    assert_eq!(field.value(), "(x]");
    assert_eq!(field.position(), 3);
}

#[test]
fn test_accept_and_reject_smart_fence() {
    let mut field = Mathfield::default();
    typed(&mut field, "(x");
    field.execute(Command::AcceptSmartFence).unwrap();
    assert_eq!(field.value(), "\\left(x\\right)");

    let mut field = Mathfield::default();
    typed(&mut field, "(x");
    field.execute(Command::RejectSmartFence).unwrap();
    assert_eq!(field.value(), "(x");
    assert_eq!(field.position(), 2);
}

#[test]
fn test_opener_over_selection_wraps_it() {
    let mut field = field("ab");
    field.execute(Command::SelectAll).unwrap();
    typed(&mut field, "(");
    assert_eq!(field.value(), "\\left(ab\\right)");
}

#[test]
fn test_smart_superscript_leaps_after_one_digit() {
    let mut field = Mathfield::default();
    typed(&mut field, "x^2y");
    assert_eq!(field.value(), "x^{2}y");

    let mut field = Mathfield::default();
    typed(&mut field, "x^ab");
    assert_eq!(field.value(), "x^{ab}");
}

#[test]
fn test_smart_superscript_leaps_again_after_deletion() {
    let mut field = Mathfield::default();
    typed(&mut field, "x^a");
    for _ in 0..3 {
        if field.value() == "x" {
            break;
        }
        field.execute(Command::Delete(Direction::Backward)).unwrap();
    }
    assert_eq!(field.value(), "x");

    typed(&mut field, "^2y");
    assert_eq!(field.value(), "x^{2}y");
}

#[test]
fn test_smart_superscript_disabled() {
    let options = EditorOptions {
        smart_superscript: false,
        ..EditorOptions::default()
    };
    let mut field = Mathfield::new(options, ParseContext::default());
    typed(&mut field, "x^23");
    assert_eq!(field.value(), "x^{23}");
}

#[test]
fn test_script_depth_limit() {
    let options = EditorOptions {
        script_depth: ScriptDepth::uniform(1),
        ..EditorOptions::default()
    };
    let mut field = Mathfield::new(options, ParseContext::default());
    typed(&mut field, "x^a^b");
    assert_eq!(field.value(), "x^{ab}");
}

#[test]
fn test_slash_builds_fraction_from_operand() {
    let mut field = Mathfield::default();
    typed(&mut field, "1/2");
    assert_eq!(field.value(), "\\frac{1}{2}");

    let mut field = Mathfield::default();
    typed(&mut field, "a+bc/d");
    assert_eq!(field.value(), "a+\\frac{bc}{d}");
}

#[test]
fn test_slash_drops_wrapping_parentheses() {
    let mut field = Mathfield::default();
    typed(&mut field, "(a+b)/c");
    assert_eq!(field.value(), "\\frac{a+b}{c}");
}

#[test]
fn test_slash_on_empty_operand() {
    let mut field = Mathfield::default();
    typed(&mut field, "/");
    assert_eq!(
        field.value(),
        "\\frac{\\placeholder{}}{\\placeholder{}}"
    );
    typed(&mut field, "3");
    assert_eq!(field.value(), "\\frac{3}{\\placeholder{}}");
}

#[test]
fn test_space_leaves_branch() {
    let mut field = Mathfield::default();
    typed(&mut field, "x^2 ");
    typed(&mut field, "x_n y");
    assert_eq!(field.value(), "x^{2}x_{n}y");
}

#[test]
fn test_markup_characters_are_escaped() {
    let mut field = Mathfield::default();
    typed(&mut field, "50%");
    assert_eq!(field.value(), "50\\%");
}

#[test]
fn test_switch_mode_types_text() {
    let mut field = Mathfield::default();
    field.execute(Command::SwitchMode(ParseMode::Text)).unwrap();
    typed(&mut field, "hi");
    assert_eq!(field.value(), "\\text{hi}");
    assert_eq!(field.mode(), ParseMode::Text);
}

#[test]
fn test_smart_mode_turns_words_into_text() {
    let options = EditorOptions {
        smart_mode: true,
        ..EditorOptions::default()
    };
    let mut field = Mathfield::new(options, ParseContext::default());
    typed(&mut field, "if");
    assert_eq!(field.value(), "\\text{if}");
    assert_eq!(field.mode(), ParseMode::Text);

    typed(&mut field, "2");
    assert_eq!(field.value(), "\\text{if}2");
    assert_eq!(field.mode(), ParseMode::Math);
}

// ===== Insertion =====

#[test]
fn test_insert_selects_first_placeholder() {
    let mut field = Mathfield::default();
    let outcome = field.execute(Command::insert("\\frac{#?}{#?}")).unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.selection, Selection::single(Range::new(1, 2)));

    typed(&mut field, "1");
    assert_eq!(field.value(), "\\frac{1}{\\placeholder{}}");
}

#[test]
fn test_insert_wraps_selection_marker() {
    let mut field = field("ab");
    field.execute(Command::SelectAll).unwrap();
    field.execute(Command::insert("\\sqrt{#@}")).unwrap();
    assert_eq!(field.value(), "\\sqrt{ab}");
}

#[test]
fn test_insert_modes() {
    let mut field = field("b");
    let before = InsertOptions {
        insertion_mode: InsertionMode::InsertBefore,
        ..InsertOptions::default()
    };
    field.execute(Command::SelectAll).unwrap();
    field
        .execute(Command::Insert {
            markup: "a".into(),
            options: before,
        })
        .unwrap();
    assert_eq!(field.value(), "ab");

    let all = InsertOptions {
        insertion_mode: InsertionMode::ReplaceAll,
        selection_mode: SelectionMode::Item,
        ..InsertOptions::default()
    };
    let outcome = field
        .execute(Command::Insert {
            markup: "xyz".into(),
            options: all,
        })
        .unwrap();
    assert_eq!(field.value(), "xyz");
    assert_eq!(outcome.selection, Selection::single(Range::new(0, 3)));
}

#[test]
fn test_insert_parse_error_changes_nothing() {
    let mut field = field("x");
    let err = field.execute(Command::insert("\\frac{")).unwrap_err();
    assert!(matches!(err, EditError::Parse(_)));
    assert_eq!(field.value(), "x");
    assert!(!field.can_undo());
}

#[test]
fn test_set_value() {
    let mut field = Mathfield::default();
    field
        .execute(Command::SetValue("\\sqrt{2}".into()))
        .unwrap();
    assert_eq!(field.value(), "\\sqrt{2}");
    assert_eq!(field.position(), field.offsets().end_of_root(field.tree()));
}

// ===== Deletion =====

#[test]
fn test_delete_backward_removes_leaf() {
    let mut field = field("ab");
    field.execute(Command::Delete(Direction::Backward)).unwrap();
    assert_eq!(field.value(), "a");
    assert_eq!(field.position(), 1);
}

#[test]
fn test_delete_at_start_of_document_is_noop() {
    let mut field = field("ab");
    field.execute(Command::SetSelection(Selection::caret(0))).unwrap();
    let outcome = field.execute(Command::Delete(Direction::Backward)).unwrap();
    assert!(!outcome.changed);
    assert_eq!(field.value(), "ab");
}

#[test]
fn test_delete_backward_through_superscript() {
    let mut field = field("x^{2}");
    // steps into the superscript first
    let outcome = field.execute(Command::Delete(Direction::Backward)).unwrap();
    assert!(!outcome.changed);
    assert_eq!(field.position(), 2);

    field.execute(Command::Delete(Direction::Backward)).unwrap();
    field.execute(Command::Delete(Direction::Backward)).unwrap();
    assert_eq!(field.value(), "x");
    assert_eq!(field.position(), 1);
}

#[test]
fn test_delete_multiple_ranges() {
    let mut field = field("abc");
    let selection = Selection::from_ranges(vec![Range::new(0, 1), Range::new(2, 3)]).unwrap();
    field.execute(Command::SetSelection(selection)).unwrap();
    field.execute(Command::Delete(Direction::Forward)).unwrap();
    assert_eq!(field.value(), "b");
    assert_eq!(field.position(), 0);
}

#[test]
fn test_vertical_delete_is_rejected() {
    let mut field = field("a");
    let err = field.execute(Command::Delete(Direction::Upward)).unwrap_err();
    assert!(matches!(err, EditError::InvalidRange(_)));
}

#[test]
fn test_promote_out_of_script() {
    let mut field = Mathfield::default();
    typed(&mut field, "x^ab");
    field.execute(Command::PromoteOutOfScript).unwrap();
    assert_eq!(field.value(), "x^{ab}");
    assert_eq!(field.position(), 4);
    typed(&mut field, "c");
    assert_eq!(field.value(), "x^{ab}c");
}

// ===== Locked prompts =====

#[test]
fn test_locked_prompt_rejects_removal() {
    let mut field = field("\\placeholder[p1][locked]{x}+y");
    field.execute(Command::SelectAll).unwrap();
    let err = field.execute(Command::Delete(Direction::Backward)).unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));
    assert_eq!(field.value(), "\\placeholder[p1][locked]{x}+y");
    assert!(!field.can_undo());
}

#[test]
fn test_selection_may_rest_inside_locked_prompt() {
    let mut field = field("\\placeholder[p1][locked]{x}");
    // offset 1 is inside the prompt body
    field.execute(Command::SetSelection(Selection::caret(1))).unwrap();
    assert_eq!(field.position(), 1);

    field.execute(Command::Move(Direction::Forward)).unwrap();
    assert_eq!(field.position(), 3);
    field.execute(Command::Move(Direction::Backward)).unwrap();
    assert_eq!(field.position(), 0);
}

#[test]
fn test_locked_prompt_rejects_insert() {
    let mut field = field("\\placeholder[p1][locked]{x}");
    field.execute(Command::SetSelection(Selection::caret(1))).unwrap();
    field.take_notifications();

    let err = field.execute(Command::insert("y")).unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));
    let err = field.execute(Command::typed("y")).unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));

    assert_eq!(field.value(), "\\placeholder[p1][locked]{x}");
    assert_eq!(field.position(), 1);
    assert!(!field.can_undo());
    assert!(field.take_notifications().is_empty());
}

#[test]
fn test_locked_prompt_rejects_new_content() {
    let mut field = field("\\placeholder[p1][locked]{x}+y");
    let err = field
        .execute(Command::SetPromptContent {
            id: "p1".into(),
            markup: "z".into(),
        })
        .unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));
    assert_eq!(field.value(), "\\placeholder[p1][locked]{x}+y");

    // unlocking out of band makes the content editable again
    field.set_prompt_state("p1", None, Some(false)).unwrap();
    field
        .execute(Command::SetPromptContent {
            id: "p1".into(),
            markup: "z^2".into(),
        })
        .unwrap();
    assert_eq!(field.value(), "\\placeholder[p1]{z^{2}}+y");
    assert_eq!(field.history().len(), 1);

    let err = field
        .execute(Command::SetPromptContent {
            id: "nope".into(),
            markup: "1".into(),
        })
        .unwrap_err();
    assert_eq!(err, EditError::UnknownPrompt("nope".into()));
}

#[test]
fn test_strip_rejects_locked_prompts() {
    let mut field = field("\\placeholder[a]{x}+\\placeholder[b][locked]{y}");
    let err = field.strip_prompt_content(&PromptFilter::default()).unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));
    assert_eq!(field.value(), "\\placeholder[a]{x}+\\placeholder[b][locked]{y}");

    let unlocked = PromptFilter {
        locked: Some(false),
        ..PromptFilter::default()
    };
    let (_, stripped) = field.strip_prompt_content(&unlocked).unwrap();
    assert_eq!(stripped.get("a").map(String::as_str), Some("x"));
    assert_eq!(field.value(), "\\placeholder[a]{}+\\placeholder[b][locked]{y}");
}

#[test]
fn test_read_only_rejects_edits() {
    let options = EditorOptions {
        read_only: true,
        ..EditorOptions::default()
    };
    let mut field = Mathfield::new(options, ParseContext::default());
    let err = field.execute(Command::typed("x")).unwrap_err();
    assert!(matches!(err, EditError::LockedRegion(_)));
    // navigation still works
    assert!(field.execute(Command::SelectAll).is_ok());
}

// ===== Prompts =====

#[test]
fn test_prompt_state_is_out_of_band() {
    let mut field = field("\\placeholder[p1]{x}");
    typed(&mut field, "+");
    field
        .set_prompt_state("p1", Some(Correctness::Correct), None)
        .unwrap();
    assert_eq!(field.value(), "\\placeholder[p1][correct]{x}+");

    field.execute(Command::Undo).unwrap();
    // undo restores content, not prompt state
    assert_eq!(field.value(), "\\placeholder[p1][correct]{x}");
    assert_eq!(
        field.get_prompt_state("p1").unwrap().correctness,
        Correctness::Correct
    );
}

#[test]
fn test_get_prompts_filters() {
    let field = field("\\placeholder[a][correct]{}+\\placeholder[b]{}+\\placeholder[c][locked]{}");
    assert_eq!(field.get_prompts(&PromptFilter::default()), vec!["a", "b", "c"]);

    let locked = PromptFilter {
        locked: Some(true),
        ..PromptFilter::default()
    };
    assert_eq!(field.get_prompts(&locked), vec!["c"]);

    let correct = PromptFilter {
        correctness: Some(Correctness::Correct),
        ..PromptFilter::default()
    };
    assert_eq!(field.get_prompts(&correct), vec!["a"]);
}

#[test]
fn test_get_prompt_value() {
    let field = field("\\placeholder[a]{\\frac{1}{2}}");
    assert_eq!(field.get_prompt_value("a", "latex").unwrap(), "\\frac{1}{2}");
    assert!(matches!(
        field.get_prompt_value("zz", "latex"),
        Err(EditError::UnknownPrompt(_))
    ));
}

#[test]
fn test_strip_prompt_content() {
    let mut field = field("\\placeholder[a]{x}+\\placeholder[b]{y}");
    let (outcome, stripped) = field
        .strip_prompt_content(&PromptFilter::default())
        .unwrap();
    assert!(outcome.changed);
    let expected: BTreeMap<String, String> = [("a", "x"), ("b", "y")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(stripped, expected);
    assert_eq!(field.value(), "\\placeholder[a]{}+\\placeholder[b]{}");
}

#[test]
fn test_duplicate_prompt_id_is_rejected_atomically() {
    let mut field = field("\\placeholder[p1]{}");
    let err = field
        .execute(Command::insert("\\placeholder[p1]{x}"))
        .unwrap_err();
    assert!(matches!(err, EditError::InvariantViolation(_)));
    assert_eq!(field.value(), "\\placeholder[p1]{}");
    assert!(!field.can_undo());
    assert!(field.take_notifications().is_empty());
}

// ===== Style =====

#[test]
fn test_style_toggle_on_selection() {
    let mut field = field("ab");
    field.execute(Command::SelectAll).unwrap();
    let toggle = || Command::ApplyStyle {
        style: bold(),
        range: None,
        operation: StyleOperation::Toggle,
    };
    field.execute(toggle()).unwrap();
    assert_eq!(field.value(), "\\mathbf{ab}");
    field.execute(toggle()).unwrap();
    assert_eq!(field.value(), "ab");
}

#[test]
fn test_style_on_explicit_range() {
    let mut field = field("abc");
    field
        .execute(Command::ApplyStyle {
            style: bold(),
            range: Some(Range::new(1, 2)),
            operation: StyleOperation::Set,
        })
        .unwrap();
    assert_eq!(field.value(), "a\\mathbf{b}c");
}

#[test]
fn test_pending_style_applies_to_typed_atoms() {
    let mut field = Mathfield::default();
    let outcome = field
        .execute(Command::ApplyStyle {
            style: bold(),
            range: None,
            operation: StyleOperation::Toggle,
        })
        .unwrap();
    assert!(!outcome.changed);
    assert_eq!(field.pending_style(), Some(&bold()));

    typed(&mut field, "x");
    assert_eq!(field.value(), "\\mathbf{x}");

    // navigation drops it
    field.execute(Command::Move(Direction::Backward)).unwrap();
    assert_eq!(field.pending_style(), None);
}

// ===== Navigation =====

#[test]
fn test_move_collapses_selection() {
    let mut field = field("abc");
    field
        .execute(Command::SetSelection(Selection::single(Range::new(1, 2))))
        .unwrap();
    field.execute(Command::Move(Direction::Forward)).unwrap();
    assert_eq!(field.selection(), &Selection::caret(2));
}

#[test]
fn test_extend_selection() {
    let mut field = field("ab");
    field.execute(Command::Extend(Direction::Backward)).unwrap();
    field.execute(Command::Extend(Direction::Backward)).unwrap();
    assert_eq!(field.selection(), &Selection::single(Range::new(2, 0)));
    assert!(!field.selection_is_collapsed());
}

#[test]
fn test_move_after_parent() {
    let mut field = field("\\sqrt{x}y");
    field.execute(Command::SetSelection(Selection::caret(1))).unwrap();
    field.execute(Command::MoveAfterParent).unwrap();
    assert_eq!(field.position(), 3);
}

#[test]
fn test_invalid_selection_is_rejected() {
    let mut field = field("ab");
    let err = field
        .execute(Command::SetSelection(Selection::caret(9)))
        .unwrap_err();
    assert!(matches!(err, EditError::InvalidOffset { offset: 9, .. }));
    assert_eq!(field.position(), 2);
}

#[test]
fn test_value_of_range() {
    let field = field("a+b");
    assert_eq!(field.get_value_of(Range::new(0, 1), "latex").unwrap(), "a");
    assert_eq!(field.get_value("latex").unwrap(), "a+b");
    assert!(matches!(
        field.get_value("nope"),
        Err(EditError::Format(FormatError::FormatNotFound(_)))
    ));
}

// ===== History =====

#[test]
fn test_undo_redo_round_trip() {
    let mut field = Mathfield::default();
    typed(&mut field, "a+b");
    typed(&mut field, "/");
    let after = field.value();

    field.execute(Command::Undo).unwrap();
    assert_eq!(field.value(), "a+b");
    assert_eq!(field.position(), 3);
    field.execute(Command::Undo).unwrap();
    assert_eq!(field.value(), "");
    assert!(!field.can_undo());

    field.execute(Command::Redo).unwrap();
    field.execute(Command::Redo).unwrap();
    assert_eq!(field.value(), after);
    assert!(!field.can_redo());
}

#[test]
fn test_new_edit_discards_redo() {
    let mut field = Mathfield::default();
    typed(&mut field, "a");
    typed(&mut field, "b");
    field.execute(Command::Undo).unwrap();
    typed(&mut field, "c");
    assert_eq!(field.value(), "ac");
    assert!(!field.can_redo());
    assert_eq!(field.history().len(), 2);
}

#[test]
fn test_noop_commands_record_nothing() {
    let mut field = field("x");
    let outcome = field.execute(Command::SetValue("x".into())).unwrap();
    assert!(!outcome.changed);
    field.execute(Command::insert("")).unwrap();
    field.execute(Command::AcceptSmartFence).unwrap();
    field.execute(Command::PromoteOutOfScript).unwrap();
    assert!(!field.can_undo());
}

#[test]
fn test_reset_undo_keeps_document() {
    let mut field = Mathfield::default();
    typed(&mut field, "x");
    field.reset_undo();
    assert!(!field.can_undo());
    assert_eq!(field.value(), "x");
}

// ===== Notifications =====

#[test]
fn test_notifications_for_committed_edit() {
    let mut field = Mathfield::default();
    typed(&mut field, "x");
    assert_eq!(
        field.take_notifications(),
        vec![
            Notification::ContentChanged,
            Notification::SelectionChanged(Selection::caret(1)),
            Notification::UndoStateChanged {
                can_undo: true,
                can_redo: false
            },
        ]
    );
    assert!(field.take_notifications().is_empty());
}

#[test]
fn test_move_out_notification() {
    let mut field = field("x");
    field.execute(Command::Move(Direction::Forward)).unwrap();
    assert_eq!(
        field.take_notifications(),
        vec![Notification::MoveOut(Direction::Forward)]
    );
    assert_eq!(field.position(), 1);
}

#[test]
fn test_mode_at_text_neighbour() {
    let tree = parse("\\text{ab}", &ParseContext::default()).unwrap();
    let inside = Position::new(tree.root(), BranchName::Body, 1);
    assert_eq!(mode_at(&tree, &inside, ParseMode::Math), ParseMode::Text);
    let empty = AtomTree::new();
    let start = Position::new(empty.root(), BranchName::Body, 0);
    assert_eq!(mode_at(&empty, &start, ParseMode::Math), ParseMode::Math);
}
