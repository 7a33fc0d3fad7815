//! Edit scripts
//!
//! An edit script drives a [`Mathfield`] the way a host would: one command
//! per line, applied in order to the formula read from the input file.
//! Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! type x^2          # keystrokes; everything after "type " is typed as is
//! insert \frac{#?}{#?}
//! delete backward
//! move forward | extend backward | select 0 3 | select-all
//! move-after-parent | promote | accept-fence | reject-fence
//! mode text
//! style bold | toggle-style bold | color red
//! set-value x+1
//! prompt-content p1 \sqrt{2}
//! prompt-state p1 correct locked
//! strip-prompts
//! undo | redo
//! ```

use mathfield_core::atom::{Correctness, Variant};
use mathfield_core::editor::{Command, PromptFilter, StyleOperation};
use mathfield_core::{Direction, Mathfield, ParseMode, Range, Selection, Style};

/// One script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Command(Command),
    PromptState {
        id: String,
        correctness: Option<Correctness>,
        locked: Option<bool>,
    },
}

/// Parse a whole script. Errors name the offending line (1-based).
pub fn parse_script(source: &str) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let step = parse_line(line).map_err(|e| format!("line {}: {e}", number + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> Result<Step, String> {
    let line = line.trim_start();
    let (verb, rest) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let command = match verb {
        // typed text keeps its spaces
        "type" => Command::typed(rest),
        "insert" => Command::insert(rest.trim()),
        "set-value" => Command::SetValue(rest.trim().to_string()),
        "delete" => Command::Delete(direction(args.first().copied().unwrap_or("backward"))?),
        "move" => Command::Move(direction(required(&args, 0, "a direction")?)?),
        "extend" => Command::Extend(direction(required(&args, 0, "a direction")?)?),
        "select-all" => Command::SelectAll,
        "select" => {
            let anchor = offset(required(&args, 0, "an anchor offset")?)?;
            let focus = match args.get(1) {
                Some(raw) => offset(raw)?,
                None => anchor,
            };
            Command::SetSelection(Selection::single(Range::new(anchor, focus)))
        }
        "move-after-parent" => Command::MoveAfterParent,
        "promote" => Command::PromoteOutOfScript,
        "accept-fence" => Command::AcceptSmartFence,
        "reject-fence" => Command::RejectSmartFence,
        "mode" => Command::SwitchMode(match required(&args, 0, "a mode")? {
            "math" => ParseMode::Math,
            "text" => ParseMode::Text,
            other => return Err(format!("unknown mode '{other}'")),
        }),
        "style" | "toggle-style" => Command::ApplyStyle {
            style: Style::default().with_variant(variant(required(&args, 0, "a variant")?)?),
            range: None,
            operation: if verb == "style" {
                StyleOperation::Set
            } else {
                StyleOperation::Toggle
            },
        },
        "color" => Command::ApplyStyle {
            style: Style::default().with_color(required(&args, 0, "a color")?),
            range: None,
            operation: StyleOperation::Set,
        },
        "prompt-content" => {
            let (id, markup) = rest
                .trim()
                .split_once(' ')
                .map(|(id, markup)| (id, markup.trim()))
                .unwrap_or((rest.trim(), ""));
            if id.is_empty() {
                return Err("prompt-content needs a prompt id".to_string());
            }
            Command::SetPromptContent {
                id: id.to_string(),
                markup: markup.to_string(),
            }
        }
        "strip-prompts" => Command::StripPromptContent(PromptFilter::default()),
        "prompt-state" => return prompt_state(&args),
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Step::Command(command))
}

fn required<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    args.get(index)
        .copied()
        .ok_or_else(|| format!("expected {what}"))
}

fn direction(raw: &str) -> Result<Direction, String> {
    Direction::from_name(raw).ok_or_else(|| format!("unknown direction '{raw}'"))
}

fn offset(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not an offset"))
}

fn variant(raw: &str) -> Result<Variant, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown variant '{raw}'"))
}

fn prompt_state(args: &[&str]) -> Result<Step, String> {
    let id = required(args, 0, "a prompt id")?;
    let mut correctness = None;
    let mut locked = None;
    for flag in &args[1..] {
        match *flag {
            "correct" => correctness = Some(Correctness::Correct),
            "incorrect" => correctness = Some(Correctness::Incorrect),
            "undefined" => correctness = Some(Correctness::Undefined),
            "locked" => locked = Some(true),
            "unlocked" => locked = Some(false),
            other => return Err(format!("unknown prompt flag '{other}'")),
        }
    }
    Ok(Step::PromptState {
        id: id.to_string(),
        correctness,
        locked,
    })
}

/// Apply `steps` in order, stopping at the first failing one.
pub fn run(field: &mut Mathfield, steps: Vec<Step>) -> Result<(), String> {
    for (i, step) in steps.into_iter().enumerate() {
        let result = match step {
            Step::Command(command) => field.execute(command).map(|_| ()),
            Step::PromptState {
                id,
                correctness,
                locked,
            } => field.set_prompt_state(&id, correctness, locked),
        };
        result.map_err(|e| format!("step {}: {e}", i + 1))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_skips_comments_and_blanks() {
        let steps = parse_script("# setup\n\ntype x^2\nundo\n").unwrap();
        assert_eq!(
            steps,
            vec![Step::Command(Command::typed("x^2")), Step::Command(Command::Undo)]
        );
    }

    #[test]
    fn test_type_keeps_spaces() {
        let steps = parse_script("type a b ").unwrap();
        assert_eq!(steps, vec![Step::Command(Command::typed("a b "))]);
    }

    #[test]
    fn test_parse_arguments() {
        let steps = parse_script("select 0 3\ndelete forward\ntoggle-style bold").unwrap();
        assert_eq!(
            steps[0],
            Step::Command(Command::SetSelection(Selection::single(Range::new(0, 3))))
        );
        assert_eq!(steps[1], Step::Command(Command::Delete(Direction::Forward)));
        assert_eq!(
            steps[2],
            Step::Command(Command::ApplyStyle {
                style: Style::default().with_variant(Variant::Bold),
                range: None,
                operation: StyleOperation::Toggle,
            })
        );
    }

    #[test]
    fn test_prompt_lines() {
        let steps = parse_script("prompt-content p1 \\sqrt{2}\nprompt-state p1 correct locked").unwrap();
        assert_eq!(
            steps[0],
            Step::Command(Command::SetPromptContent {
                id: "p1".into(),
                markup: "\\sqrt{2}".into(),
            })
        );
        assert_eq!(
            steps[1],
            Step::PromptState {
                id: "p1".into(),
                correctness: Some(Correctness::Correct),
                locked: Some(true),
            }
        );
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse_script("type x\nfly away").unwrap_err();
        assert_eq!(err, "line 2: unknown command 'fly'");
        assert!(parse_script("move sideways").is_err());
        assert!(parse_script("style shiny").is_err());
    }

    #[test]
    fn test_run_applies_steps() {
        let mut field = Mathfield::default();
        let steps = parse_script("type 1/2\nmove-after-parent\ntype +x").unwrap();
        run(&mut field, steps).unwrap();
        assert_eq!(field.value(), "\\frac{1}{2}+x");
    }

    #[test]
    fn test_run_reports_failing_step() {
        let mut field = Mathfield::default();
        let steps = parse_script("type x\nprompt-content nope 1").unwrap();
        let err = run(&mut field, steps).unwrap_err();
        assert!(err.starts_with("step 2:"));
        assert_eq!(field.value(), "x");
    }
}
