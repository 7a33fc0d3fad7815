use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the transforms from src/transforms.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &["tree-treeviz", "tree-tag", "tree-json", "offsets"];

fn input() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("mathfield")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for converting, inspecting and editing math markup")
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats and inspect transforms")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a mathfield.toml configuration file")
                .value_hint(ValueHint::FilePath),
        )
        .subcommand(
            Command::new("convert")
                .arg(input())
                .arg(Arg::new("from").long("from").value_hint(ValueHint::Other))
                .arg(Arg::new("to").long("to").value_hint(ValueHint::Other))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("format").arg(input()))
        .subcommand(
            Command::new("inspect").arg(input()).arg(
                Arg::new("transform")
                    .index(2)
                    .value_parser(clap::builder::PossibleValuesParser::new(
                        AVAILABLE_TRANSFORMS,
                    )),
            ),
        )
        .subcommand(
            Command::new("edit")
                .arg(input())
                .arg(
                    Arg::new("script")
                        .long("script")
                        .short('s')
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(Arg::new("to").long("to").value_hint(ValueHint::Other)),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "mathfield", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "mathfield", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "mathfield", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
