//! Shared configuration loader for the mathfield toolchain.
//!
//! `defaults/mathfield.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files on
//! top of those defaults via [`Loader`] before deserializing into
//! [`MathfieldConfig`], then turn it into the core's [`EditorOptions`] and
//! [`ParseContext`].

use std::path::Path;
use std::sync::Arc;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use mathfield_core::editor::{EditorOptions, ScriptDepth};
use mathfield_core::parser::macros::{MacroDictionary, Registers};
use mathfield_core::parser::smart_mode::WordListPolicy;
use mathfield_core::parser::ParseContext;
use mathfield_core::selection::{FractionNavigationOrder, NavigationOptions};
use mathfield_core::ParseMode;
use serde::Deserialize;

const DEFAULT_TOML: &str = include_str!("../defaults/mathfield.default.toml");

/// Name of the optional per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = "mathfield.toml";

/// Top-level configuration consumed by mathfield applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MathfieldConfig {
    pub editor: EditorConfig,
    pub parser: ParserConfig,
    #[serde(default)]
    pub macros: MacroDictionary,
    #[serde(default)]
    pub registers: Registers,
    pub output: OutputConfig,
}

/// Mirrors the knobs exposed by the edit engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    pub smart_fence: bool,
    pub smart_superscript: bool,
    pub smart_mode: bool,
    pub remove_extraneous_parentheses: bool,
    pub math_mode_space: String,
    pub undo_limit: usize,
    pub default_mode: ParseMode,
    pub read_only: bool,
    pub superscript_depth: usize,
    pub subscript_depth: usize,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    pub fraction_order: FractionNavigationOrder,
    pub lateral_fraction_movement: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub smart_fence: bool,
    pub smart_mode: bool,
    pub default_mode: ParseMode,
    pub unknown_command_fallback: bool,
    #[serde(default)]
    pub smart_mode_words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: String,
}

fn depth(value: usize) -> Option<usize> {
    (value > 0).then_some(value)
}

impl From<&NavigationConfig> for NavigationOptions {
    fn from(config: &NavigationConfig) -> Self {
        NavigationOptions {
            fraction_order: config.fraction_order,
            lateral_fraction_movement: config.lateral_fraction_movement,
        }
    }
}

impl From<&EditorConfig> for EditorOptions {
    fn from(config: &EditorConfig) -> Self {
        EditorOptions {
            smart_fence: config.smart_fence,
            smart_superscript: config.smart_superscript,
            smart_mode: config.smart_mode,
            script_depth: ScriptDepth {
                superscript: depth(config.superscript_depth),
                subscript: depth(config.subscript_depth),
            },
            remove_extraneous_parentheses: config.remove_extraneous_parentheses,
            math_mode_space: config.math_mode_space.clone(),
            navigation: (&config.navigation).into(),
            undo_limit: config.undo_limit,
            default_mode: config.default_mode,
            read_only: config.read_only,
            ..EditorOptions::default()
        }
    }
}

impl MathfieldConfig {
    pub fn editor_options(&self) -> EditorOptions {
        (&self.editor).into()
    }

    /// Parser settings, with the macro dictionary and registers attached.
    pub fn parse_context(&self) -> ParseContext {
        let mut ctx = ParseContext::default()
            .with_smart_fence(self.parser.smart_fence)
            .with_smart_mode(self.parser.smart_mode)
            .with_default_mode(self.parser.default_mode)
            .with_unknown_command_fallback(self.parser.unknown_command_fallback)
            .with_macros(self.macros.clone())
            .with_registers(self.registers.clone());
        if !self.parser.smart_mode_words.is_empty() {
            let policy = WordListPolicy::new(self.parser.smart_mode_words.iter().cloned());
            ctx = ctx.with_smart_mode_policy(Arc::new(policy));
        }
        ctx
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MathfieldConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MathfieldConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathfield_core::parser::smart_mode::SmartModePolicy;
    use std::io::Write;

    #[test]
    fn test_loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(config.editor.smart_fence);
        assert_eq!(config.editor.undo_limit, 256);
        assert_eq!(config.editor.default_mode, ParseMode::Math);
        assert_eq!(
            config.editor.navigation.fraction_order,
            FractionNavigationOrder::NumeratorDenominator
        );
        assert!(config.macros.is_empty());
        assert_eq!(config.output.format, "latex");
    }

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.editor_options(), EditorOptions::default());
    }

    #[test]
    fn test_supports_overrides() {
        let config = Loader::new()
            .set_override("editor.superscript_depth", 2)
            .expect("override to apply")
            .set_override("editor.default_mode", "text")
            .expect("override to apply")
            .build()
            .expect("config to build");
        let options = config.editor_options();
        assert_eq!(options.script_depth.superscript, Some(2));
        assert_eq!(options.script_depth.subscript, None);
        assert_eq!(options.default_mode, ParseMode::Text);
    }

    #[test]
    fn test_file_layers_macros_and_registers() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[macros.half]\nexpansion = \"\\\\frac{{#1}}{{2}}\"\nargs = 1\n\n[registers]\ngap = \"1em\"\n\n[parser]\nsmart_mode_words = [\"foo\"]"
        )
        .expect("write config");

        let config = Loader::new().with_file(file.path()).build().expect("config to build");
        assert_eq!(config.macros.get("half").map(|m| m.args), Some(1));
        assert_eq!(config.registers.get("gap"), Some("1em"));
        // keys the file does not set keep their defaults
        assert!(config.parser.smart_fence);

        let ctx = config.parse_context();
        let tree = mathfield_core::parse("\\half{x}", &ctx).expect("macro to expand");
        assert_eq!(mathfield_core::formats::latex::to_latex(&tree), "\\half{x}");
        assert_eq!(ctx.smart_mode_policy.classify("foo"), Some(ParseMode::Text));
        assert_eq!(ctx.smart_mode_policy.classify("if"), None);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = Loader::new().with_file("/nonexistent/mathfield.toml").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_file_may_be_absent() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/mathfield.toml")
            .build()
            .expect("config to build");
        assert!(config.editor.smart_superscript);
    }
}
