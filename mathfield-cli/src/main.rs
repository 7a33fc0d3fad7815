// Command-line interface for mathfield
//
// This binary is a host for the mathfield engine: it reads a formula from a file (or stdin with
// "-"), converts it between formats, normalizes it, shows internal views of it, or replays an
// edit script against it the way an interactive editor would.
//
// Usage:
//  mathfield <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats (default)
//  mathfield convert <input> --to <format> [--from <format>] [--output <file>]  - Same as above (explicit)
//  mathfield format <input>                    - Rewrite as canonical markup
//  mathfield inspect <input> [<transform>]     - Show an internal view (defaults to "tree-treeviz")
//  mathfield edit <input> --script <file>      - Replay an edit script, print the result
//  mathfield --list-formats                    - List formats and transforms
//
// Extra Parameters:
//
// Any configuration key can be overridden with --extra-<section>.<key> <value>, for example
// --extra-editor.smart-fence false. Dashes in the key are read as underscores.
//
// Logging goes to stderr and is controlled by MATHFIELD_LOG (e.g. MATHFIELD_LOG=debug).

mod script;
mod transforms;

use clap::{Arg, ArgAction, Command, ValueHint};
use mathfield_config::{Loader, MathfieldConfig, LOCAL_CONFIG_FILE};
use mathfield_core::{AtomTree, Format, FormatRegistry, Mathfield};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MATHFIELD_LOG";

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if let Some(key) = arg.strip_prefix("--extra-") {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with("--"));
            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }
        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn input_arg(name: &'static str) -> Arg {
    Arg::new(name)
        .help("Input file path (\"-\" reads stdin)")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("mathfield")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for converting, inspecting and editing math markup")
        .long_about(
            "mathfield works with LaTeX-like math markup through the mathfield engine.\n\n\
            Commands:\n  \
            - convert: Transform between formats (latex, plain-text, spoken-text, json, ...)\n  \
            - format:  Rewrite markup in canonical form\n  \
            - inspect: View internal representations (atom tree, offsets)\n  \
            - edit:    Replay an edit script against a formula\n\n\
            Extra Parameters:\n  \
            Use --extra-<section>.<key> [value] to override configuration keys.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            mathfield formula.tex --to spoken-text       # Read aloud\n  \
            mathfield inspect formula.tex offsets        # Caret offsets\n  \
            mathfield edit formula.tex --script keys.txt # Replay keystrokes",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats and inspect transforms")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a mathfield.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between formats (default command)")
                .long_about(
                    "Convert a formula between formats.\n\n\
                    The source format is detected from the file extension (.tex, .json)\n\
                    and falls back to latex. Output goes to stdout unless -o is given.",
                )
                .arg(input_arg("input"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (detected from the file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (defaults to output.format from the configuration)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Rewrite markup in canonical form")
                .arg(input_arg("input")),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect internal representations of a formula")
                .arg(input_arg("path"))
                .arg(
                    Arg::new("transform")
                        .help("Transform to apply. Defaults to 'tree-treeviz'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Replay an edit script against a formula")
                .long_about(
                    "Load the formula with the caret at the end, run each script line as an\n\
                    editor command, then print the result.\n\n\
                    Script lines: type, insert, delete, move, extend, select, select-all,\n\
                    move-after-parent, promote, accept-fence, reject-fence, mode, style,\n\
                    toggle-style, color, set-value, prompt-content, prompt-state,\n\
                    strip-prompts, undo, redo. Lines starting with '#' are comments.",
                )
                .arg(input_arg("input"))
                .arg(
                    Arg::new("script")
                        .long("script")
                        .short('s')
                        .value_name("PATH")
                        .help("Edit script to replay")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Format to print the result in (defaults to latex)")
                        .value_hint(ValueHint::Other),
                ),
        )
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            // a bare file argument means "convert"
            let known = ["convert", "format", "inspect", "edit", "help"];
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with("--")
                && !known.contains(&cleaned_args[1].as_str())
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);
                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    if matches.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        &extra_params,
    );

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            let input = required_arg(sub_matches, "input");
            let from = match sub_matches.get_one::<String>("from") {
                Some(from) => from.clone(),
                None => FormatRegistry::default()
                    .detect_format_from_filename(input)
                    .unwrap_or_else(|| "latex".to_string()),
            };
            let to = sub_matches
                .get_one::<String>("to")
                .cloned()
                .unwrap_or_else(|| config.output.format.clone());
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(input, &from, &to, output, &config);
        }
        Some(("format", sub_matches)) => {
            let input = required_arg(sub_matches, "input");
            handle_convert_command(input, "latex", "latex", None, &config);
        }
        Some(("inspect", sub_matches)) => {
            let path = required_arg(sub_matches, "path");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or(transforms::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &config);
        }
        Some(("edit", sub_matches)) => {
            let input = required_arg(sub_matches, "input");
            let script = required_arg(sub_matches, "script");
            let to = sub_matches
                .get_one::<String>("to")
                .map(|s| s.as_str())
                .unwrap_or("latex");
            handle_edit_command(input, script, to, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn required_arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Error: missing argument '{name}'");
            std::process::exit(1);
        }
    }
}

fn read_input(path: &str) -> String {
    let result = if path == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map(|_| source)
    } else {
        fs::read_to_string(path)
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn parse_input(source: &str, from: &str, config: &MathfieldConfig) -> AtomTree {
    let registry = FormatRegistry::default();
    registry
        .parse(source.trim_end(), from, &config.parse_context())
        .unwrap_or_else(|e| {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        })
}

/// Handle the convert command
fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    config: &MathfieldConfig,
) {
    let registry = FormatRegistry::default();
    for name in [from, to] {
        if let Err(e) = registry.get(name) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_input(input);
    let tree = parse_input(&source, from, config);
    debug!(from, to, atoms = tree.len(), "converting");

    let text = registry.serialize(&tree, to).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });
    write_output(output, &text);
}

/// Handle the inspect command
fn handle_inspect_command(path: &str, transform: &str, config: &MathfieldConfig) {
    let source = read_input(path);
    let tree = parse_input(&source, "latex", config);
    let output = transforms::execute_transform(&tree, transform).unwrap_or_else(|e| {
        eprintln!("Execution error: {e}");
        std::process::exit(1);
    });
    print!("{output}");
}

/// Handle the edit command
fn handle_edit_command(input: &str, script_path: &str, to: &str, config: &MathfieldConfig) {
    let source = read_input(input);
    let script_source = fs::read_to_string(script_path).unwrap_or_else(|e| {
        eprintln!("Error reading script '{script_path}': {e}");
        std::process::exit(1);
    });
    let steps = script::parse_script(&script_source).unwrap_or_else(|e| {
        eprintln!("Script error: {e}");
        std::process::exit(1);
    });

    let mut field = Mathfield::with_value(
        source.trim_end(),
        config.editor_options(),
        config.parse_context(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    debug!(steps = steps.len(), "replaying script");
    if let Err(e) = script::run(&mut field, steps) {
        eprintln!("Edit error: {e}");
        std::process::exit(1);
    }

    let text = field.get_value(to).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });
    write_output(None, &text);
}

fn write_output(output: Option<&str>, text: &str) {
    match output {
        Some(path) => fs::write(path, text).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None if text.ends_with('\n') => print!("{text}"),
        None => println!("{text}"),
    }
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    let registry = FormatRegistry::default();
    println!("Conversion formats:");
    for name in registry.list_formats() {
        let Ok(format) = registry.get(&name) else {
            continue;
        };
        let mut modes = Vec::new();
        if format.supports_parsing() {
            modes.push("read");
        }
        if format.supports_serialization() {
            modes.push("write");
        }
        println!("  {name:<16} {:<11} {}", modes.join("/"), format.description());
    }
    println!("\nInspect transforms:");
    for name in transforms::AVAILABLE_TRANSFORMS {
        println!("  {name}");
    }
}

fn load_cli_config(explicit_path: Option<&str>, extra_params: &HashMap<String, String>) -> MathfieldConfig {
    let loader = Loader::new().with_optional_file(LOCAL_CONFIG_FILE);
    let mut loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };
    let mut keys: Vec<_> = extra_params.keys().collect();
    keys.sort();
    for key in keys {
        let Some(config_key) = config_key(key) else {
            eprintln!("Unknown option --extra-{key} (expected --extra-<section>.<key>)");
            std::process::exit(1);
        };
        loader = loader
            .set_override(&config_key, extra_params[key].clone())
            .unwrap_or_else(|err| {
                eprintln!("Invalid override --extra-{key}: {err}");
                std::process::exit(1);
            });
    }
    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// `editor.smart-fence` → `editor.smart_fence`. Keys need a section.
fn config_key(extra: &str) -> Option<String> {
    extra
        .contains('.')
        .then(|| extra.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_extra_args_empty() {
        let args = strings(&["mathfield", "inspect", "f.tex"]);
        let (cleaned, extra) = parse_extra_args(&args);
        assert_eq!(cleaned, args);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_parse_extra_args_with_values() {
        let args = strings(&[
            "mathfield",
            "convert",
            "f.tex",
            "--extra-editor.smart-fence",
            "false",
            "--to",
            "json",
        ]);
        let (cleaned, extra) = parse_extra_args(&args);
        assert_eq!(cleaned, strings(&["mathfield", "convert", "f.tex", "--to", "json"]));
        assert_eq!(extra.get("editor.smart-fence"), Some(&"false".to_string()));
    }

    #[test]
    fn test_parse_extra_args_boolean_flag_at_end() {
        let args = strings(&["mathfield", "edit", "f.tex", "--extra-editor.smart-mode"]);
        let (cleaned, extra) = parse_extra_args(&args);
        assert_eq!(cleaned, strings(&["mathfield", "edit", "f.tex"]));
        assert_eq!(extra.get("editor.smart-mode"), Some(&"true".to_string()));
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let args = strings(&["mathfield", "f.tex", "--extra-editor.undo-limit", "-1"]);
        let (_, extra) = parse_extra_args(&args);
        assert_eq!(extra.get("editor.undo-limit"), Some(&"-1".to_string()));
    }

    #[test]
    fn test_config_key() {
        assert_eq!(
            config_key("editor.smart-fence").as_deref(),
            Some("editor.smart_fence")
        );
        assert_eq!(config_key("theme"), None);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }
}
