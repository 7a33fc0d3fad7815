//! Markup parser (LaTeX-like markup → atom tree)
//!
//! Pipeline: markup string → tokens → recursive descent over nested lists →
//! post-passes per list (smart fence wrapping, smart mode reclassification).
//!
//! Every list is parsed inside a [`Frame`] that knows which terminators it
//! accepts, so a terminator that shows up in the wrong place is reported
//! with the error class of the region that is still open.

pub mod commands;
pub mod macros;
pub mod smart_mode;
pub mod tokenizer;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::atom::{
    matching_close, ArrayInfo, Atom, AtomId, AtomKind, AtomTree, BranchName, Correctness, Fence,
    MacroRef, OperatorKind, ParseMode, Prompt, Style,
};
use crate::error::{EditError, ParseError};
use commands::CommandSpec;
use macros::{MacroDefinition, MacroDictionary, Registers};
use smart_mode::{SmartModePolicy, WordListPolicy};
use tokenizer::{tokenize, Spanned, Token};

const MAX_EXPANSION_DEPTH: usize = 16;

/// Everything the parser consults besides the markup itself.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Style applied to top-level atoms that do not set it themselves
    pub style: Style,
    pub macros: MacroDictionary,
    pub registers: Registers,
    pub smart_fence: bool,
    pub smart_mode: bool,
    pub default_mode: ParseMode,
    /// Keep unknown commands as error atoms instead of failing
    pub unknown_command_fallback: bool,
    pub smart_mode_policy: Arc<dyn SmartModePolicy>,
    pub(crate) allow_selection_marker: bool,
}

impl Default for ParseContext {
    fn default() -> Self {
        ParseContext {
            style: Style::default(),
            macros: MacroDictionary::default(),
            registers: Registers::default(),
            smart_fence: true,
            smart_mode: false,
            default_mode: ParseMode::Math,
            unknown_command_fallback: false,
            smart_mode_policy: Arc::new(WordListPolicy::default()),
            allow_selection_marker: false,
        }
    }
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_smart_fence(mut self, enabled: bool) -> Self {
        self.smart_fence = enabled;
        self
    }

    pub fn with_smart_mode(mut self, enabled: bool) -> Self {
        self.smart_mode = enabled;
        self
    }

    pub fn with_default_mode(mut self, mode: ParseMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_macros(mut self, macros: MacroDictionary) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_registers(mut self, registers: Registers) -> Self {
        self.registers = registers;
        self
    }

    pub fn with_unknown_command_fallback(mut self, enabled: bool) -> Self {
        self.unknown_command_fallback = enabled;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_smart_mode_policy(mut self, policy: Arc<dyn SmartModePolicy>) -> Self {
        self.smart_mode_policy = policy;
        self
    }

    /// Macro or register bound to `name`; registers act as zero-argument
    /// macros and lose to a macro of the same name.
    pub fn lookup_macro(&self, name: &str) -> Option<MacroDefinition> {
        self.macros
            .get(name)
            .cloned()
            .or_else(|| self.registers.get(name).map(|v| MacroDefinition::new(v, 0)))
    }
}

/// Parse markup in the context's default mode.
pub fn parse(markup: &str, ctx: &ParseContext) -> Result<AtomTree, ParseError> {
    parse_in_mode(markup, ctx, ctx.default_mode)
}

/// Parse markup whose top level is in `mode`.
pub fn parse_in_mode(
    markup: &str,
    ctx: &ParseContext,
    mode: ParseMode,
) -> Result<AtomTree, ParseError> {
    let mut parser = Parser::new(markup, ctx)?;
    let (atoms, _) = parser.parse_list(mode, Frame::Top)?;
    if !ctx.style.is_empty() {
        parser.fill_style(&atoms, &ctx.style)?;
    }
    let root = parser.tree.root();
    parser
        .tree
        .insert(root, BranchName::Body, 0, &atoms)
        .map_err(|e| parser.internal(e, 0))?;
    parser.tree.take_journal();
    debug!(atoms = parser.tree.len(), "parsed markup");
    Ok(parser.tree)
}

/// Terminator that ended a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eof,
    EndGroup,
    Right,
    Ampersand,
    RowSeparator,
    EndEnv,
    MathShift,
    MathClose,
    Bracket,
}

/// Open region a list is parsed in, with the byte offset where it began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Top,
    Group(usize),
    TextGroup(usize),
    Dollar(usize),
    MathParen(usize),
    Left(usize),
    Env(usize),
    Bracket(usize),
}

impl Frame {
    fn accepts(self, stop: Stop) -> bool {
        matches!(
            (self, stop),
            (Frame::Top, Stop::Eof)
                | (Frame::Group(_), Stop::EndGroup)
                | (Frame::TextGroup(_), Stop::EndGroup)
                | (Frame::Dollar(_), Stop::MathShift)
                | (Frame::MathParen(_), Stop::MathClose)
                | (Frame::Left(_), Stop::Right)
                | (Frame::Env(_), Stop::Ampersand)
                | (Frame::Env(_), Stop::RowSeparator)
                | (Frame::Env(_), Stop::EndEnv)
                | (Frame::Bracket(_), Stop::Bracket)
        )
    }

    fn is_mode_region(self) -> bool {
        matches!(
            self,
            Frame::TextGroup(_) | Frame::Dollar(_) | Frame::MathParen(_)
        )
    }
}

/// Atoms of one list being built, with the whitespace seen before each.
#[derive(Debug, Default)]
struct Run {
    atoms: Vec<AtomId>,
    spaced: Vec<bool>,
    pending_space: bool,
    /// Color set by `\color{..}` for the rest of the list
    color: Option<String>,
}

struct Parser<'a> {
    source: String,
    tokens: Vec<Spanned>,
    pos: usize,
    ctx: &'a ParseContext,
    tree: AtomTree,
    prompt_ids: HashSet<String>,
    expansion_depth: usize,
}

fn relocate(err: ParseError, position: usize) -> ParseError {
    match err {
        ParseError::Syntax {
            message, fragment, ..
        } => ParseError::Syntax {
            message,
            fragment,
            position,
        },
        ParseError::UnknownMacro { name, .. } => ParseError::UnknownMacro { name, position },
        ParseError::UnbalancedMode { message, .. } => ParseError::UnbalancedMode { message, position },
        ParseError::UnbalancedFence { message, .. } => {
            ParseError::UnbalancedFence { message, position }
        }
    }
}

pub(crate) fn math_char_atom(c: char) -> Atom {
    let kind = match c {
        '(' | '[' => AtomKind::Operator(OperatorKind::Open),
        ')' | ']' => AtomKind::Operator(OperatorKind::Close),
        '+' | '-' | '*' => AtomKind::Operator(OperatorKind::Binary),
        '=' | '<' | '>' | ':' => AtomKind::Operator(OperatorKind::Relation),
        ',' | ';' => AtomKind::Operator(OperatorKind::Punctuation),
        _ => AtomKind::Ord,
    };
    Atom::new(kind, c.to_string())
}

impl<'a> Parser<'a> {
    fn new(markup: &str, ctx: &'a ParseContext) -> Result<Self, ParseError> {
        Ok(Parser {
            source: markup.to_string(),
            tokens: tokenize(markup)?,
            pos: 0,
            ctx,
            tree: AtomTree::new(),
            prompt_ids: HashSet::new(),
            expansion_depth: 0,
        })
    }

    // ===== Token helpers =====

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek().map(|s| &s.token), Some(Token::Space)) {
            self.pos += 1;
        }
    }

    fn here(&self) -> usize {
        self.peek().map(|s| s.start).unwrap_or(self.source.len())
    }

    fn fragment_at(&self, position: usize) -> String {
        self.source
            .get(position..)
            .unwrap_or_default()
            .chars()
            .take(16)
            .collect()
    }

    fn syntax(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            fragment: self.fragment_at(position),
            position,
        }
    }

    fn internal(&self, err: EditError, position: usize) -> ParseError {
        self.syntax(err.to_string(), position)
    }

    fn eof_error(&self, frame: Frame) -> ParseError {
        let end = self.source.len();
        match frame {
            Frame::Top => self.syntax("unexpected end of input", end),
            Frame::Group(start) => self.syntax("missing '}'", start),
            Frame::Bracket(start) => self.syntax("missing ']'", start),
            Frame::Env(start) => self.syntax("missing \\end", start),
            Frame::TextGroup(start) => ParseError::UnbalancedMode {
                message: "text region is never closed".into(),
                position: start,
            },
            Frame::Dollar(start) | Frame::MathParen(start) => ParseError::UnbalancedMode {
                message: "math region is never closed".into(),
                position: start,
            },
            Frame::Left(start) => ParseError::UnbalancedFence {
                message: "\\left without matching \\right".into(),
                position: start,
            },
        }
    }

    fn unexpected(&self, stop: Stop, frame: Frame, position: usize) -> ParseError {
        if stop == Stop::Right {
            return ParseError::UnbalancedFence {
                message: "\\right without matching \\left".into(),
                position,
            };
        }
        if let Frame::Left(start) = frame {
            return ParseError::UnbalancedFence {
                message: "\\left without matching \\right".into(),
                position: start,
            };
        }
        if matches!(stop, Stop::MathShift | Stop::MathClose) {
            return ParseError::UnbalancedMode {
                message: "math region closed but never opened".into(),
                position,
            };
        }
        if frame.is_mode_region() {
            return ParseError::UnbalancedMode {
                message: "mode region closed out of order".into(),
                position,
            };
        }
        match stop {
            Stop::EndGroup => self.syntax("unexpected '}'", position),
            Stop::Ampersand | Stop::RowSeparator => {
                self.syntax("alignment outside of an array", position)
            }
            Stop::EndEnv => self.syntax("\\end without \\begin", position),
            _ => self.syntax("unexpected token", position),
        }
    }

    // ===== Lists =====

    fn push(&mut self, run: &mut Run, id: AtomId) -> Result<(), ParseError> {
        if let Some(color) = run.color.clone() {
            self.fill_style(&[id], &Style::default().with_color(color))?;
        }
        run.atoms.push(id);
        run.spaced.push(std::mem::take(&mut run.pending_space));
        Ok(())
    }

    fn push_all(&mut self, run: &mut Run, ids: Vec<AtomId>) -> Result<(), ParseError> {
        for id in ids {
            self.push(run, id)?;
        }
        Ok(())
    }

    fn parse_list(
        &mut self,
        mode: ParseMode,
        frame: Frame,
    ) -> Result<(Vec<AtomId>, Stop), ParseError> {
        let mut run = Run::default();
        let stop = loop {
            let Some(spanned) = self.peek().cloned() else {
                if frame.accepts(Stop::Eof) {
                    break Stop::Eof;
                }
                return Err(self.eof_error(frame));
            };
            let start = spanned.start;
            let stop = match &spanned.token {
                Token::EndGroup => Some(Stop::EndGroup),
                Token::Ampersand => Some(Stop::Ampersand),
                Token::MathShift if mode == ParseMode::Math => Some(Stop::MathShift),
                Token::Char(']') if mode == ParseMode::Math && matches!(frame, Frame::Bracket(_)) => {
                    Some(Stop::Bracket)
                }
                Token::Command(name) => match name.as_str() {
                    "right" => Some(Stop::Right),
                    "end" => Some(Stop::EndEnv),
                    "\\" => Some(Stop::RowSeparator),
                    ")" => Some(Stop::MathClose),
                    _ => None,
                },
                _ => None,
            };
            if let Some(stop) = stop {
                if !frame.accepts(stop) {
                    return Err(self.unexpected(stop, frame, start));
                }
                self.advance();
                if stop == Stop::RowSeparator {
                    // optional row spacing such as \\[2pt]
                    self.read_optional_raw()?;
                }
                break stop;
            }

            match &spanned.token {
                Token::Space => {
                    self.advance();
                    if mode == ParseMode::Text {
                        let id = self.tree.add(Atom::new(AtomKind::Text, " ").in_mode(mode));
                        self.push(&mut run, id)?;
                    } else {
                        run.pending_space = true;
                    }
                }
                Token::MathShift => {
                    self.advance();
                    let (atoms, _) = self.parse_list(ParseMode::Math, Frame::Dollar(start))?;
                    self.push_all(&mut run, atoms)?;
                }
                Token::Command(name) if name == "(" => {
                    if mode == ParseMode::Math {
                        return Err(ParseError::UnbalancedMode {
                            message: "\\( inside math".into(),
                            position: start,
                        });
                    }
                    self.advance();
                    let (atoms, _) = self.parse_list(ParseMode::Math, Frame::MathParen(start))?;
                    self.push_all(&mut run, atoms)?;
                }
                Token::Command(name) if name == "color" => {
                    self.advance();
                    run.color = Some(self.read_raw_group()?);
                }
                _ => self.parse_token(mode, &mut run)?,
            }
        };

        if mode == ParseMode::Math {
            if self.ctx.smart_mode {
                self.apply_smart_mode(&mut run)?;
            }
            if self.ctx.smart_fence {
                self.wrap_unmatched_openers(&mut run.atoms)?;
            }
        }
        Ok((run.atoms, stop))
    }

    /// One token (plus whatever arguments it takes) appended to `run`.
    fn parse_token(&mut self, mode: ParseMode, run: &mut Run) -> Result<(), ParseError> {
        let Some(spanned) = self.advance() else {
            return Err(self.syntax("unexpected end of input", self.source.len()));
        };
        let start = spanned.start;
        match spanned.token {
            Token::Char(c) => {
                let atom = match mode {
                    ParseMode::Math => math_char_atom(c),
                    ParseMode::Text => Atom::new(AtomKind::Text, c.to_string()).in_mode(mode),
                };
                let id = self.tree.add(atom);
                self.push(run, id)
            }
            Token::Tilde => {
                let atom = match mode {
                    ParseMode::Math => Atom::new(AtomKind::Space, "~"),
                    ParseMode::Text => Atom::new(AtomKind::Text, "\u{a0}").in_mode(mode),
                };
                let id = self.tree.add(atom);
                self.push(run, id)
            }
            Token::Superscript if mode == ParseMode::Text => {
                let id = self.text_atom('^');
                self.push(run, id)
            }
            Token::Subscript if mode == ParseMode::Text => {
                let id = self.text_atom('_');
                self.push(run, id)
            }
            Token::Superscript => self.attach_script(run, BranchName::Superscript, start),
            Token::Subscript => self.attach_script(run, BranchName::Subscript, start),
            Token::BeginGroup => match mode {
                ParseMode::Math => {
                    let (body, _) = self.parse_list(mode, Frame::Group(start))?;
                    let id = self
                        .tree
                        .add(Atom::new(AtomKind::Group, "").with_branch(BranchName::Body, body));
                    self.push(run, id)
                }
                ParseMode::Text => {
                    let (atoms, _) = self.parse_list(mode, Frame::Group(start))?;
                    self.push_all(run, atoms)
                }
            },
            Token::Placeholder => {
                let id = self.tree.add(Atom::new(AtomKind::Placeholder, "").in_mode(mode));
                self.push(run, id)
            }
            Token::SelectionMarker => {
                if !self.ctx.allow_selection_marker {
                    return Err(self.syntax("'#@' is only valid in inserted markup", start));
                }
                let id = self.tree.add(Atom::new(AtomKind::Placeholder, "#@").in_mode(mode));
                self.push(run, id)
            }
            Token::Parameter(_) => Err(self.syntax("macro parameter outside of a macro", start)),
            Token::Command(name) => {
                let atoms = self.parse_command(&name, mode, start)?;
                self.push_all(run, atoms)
            }
            _ => Err(self.syntax("unexpected token", start)),
        }
    }

    fn attach_script(
        &mut self,
        run: &mut Run,
        branch: BranchName,
        start: usize,
    ) -> Result<(), ParseError> {
        let last = run.atoms.last().copied();
        // (is an empty group, takes scripts, already has this script)
        let shape = last.and_then(|id| self.tree.get(id)).map(|atom| {
            let empty_group = atom.kind == AtomKind::Group
                && atom.branches().len() == 1
                && atom.branches()[0].1.is_empty();
            (empty_group, atom.kind.takes_scripts(), atom.has_branch(branch))
        });
        let base = match (last, shape) {
            (Some(id), Some((true, _, _))) => {
                // `{}^2`: an empty group carrying scripts is a bare script
                run.atoms.pop();
                let spaced = run.spaced.pop().unwrap_or(false);
                self.tree.free(id);
                let subsup = self.tree.add(Atom::new(AtomKind::Subsup, ""));
                run.atoms.push(subsup);
                run.spaced.push(spaced);
                subsup
            }
            (Some(id), Some((false, true, taken))) => {
                if taken {
                    let message = match branch {
                        BranchName::Superscript => "double superscript",
                        _ => "double subscript",
                    };
                    return Err(self.syntax(message, start));
                }
                id
            }
            _ => {
                let subsup = self.tree.add(Atom::new(AtomKind::Subsup, ""));
                self.push(run, subsup)?;
                subsup
            }
        };
        let script = self.parse_argument(ParseMode::Math, start)?;
        self.tree
            .insert(base, branch, 0, &script)
            .map_err(|e| self.internal(e, start))
    }

    /// A braced group or a single token.
    fn parse_argument(&mut self, mode: ParseMode, start: usize) -> Result<Vec<AtomId>, ParseError> {
        self.skip_spaces();
        let Some(spanned) = self.peek().cloned() else {
            return Err(self.syntax("missing argument", start));
        };
        match spanned.token {
            Token::BeginGroup => {
                self.advance();
                let frame = match mode {
                    ParseMode::Math => Frame::Group(spanned.start),
                    ParseMode::Text => Frame::TextGroup(spanned.start),
                };
                let (atoms, _) = self.parse_list(mode, frame)?;
                Ok(atoms)
            }
            Token::EndGroup
            | Token::Ampersand
            | Token::Superscript
            | Token::Subscript
            | Token::MathShift => Err(self.syntax("missing argument", spanned.start)),
            _ => {
                let mut run = Run::default();
                self.parse_token(mode, &mut run)?;
                Ok(run.atoms)
            }
        }
    }

    /// Source text of a braced group (without the braces).
    fn read_raw_group(&mut self) -> Result<String, ParseError> {
        self.skip_spaces();
        let open = self.here();
        match self.advance() {
            Some(Spanned {
                token: Token::BeginGroup,
                end,
                ..
            }) => {
                let mut depth = 1;
                while let Some(spanned) = self.advance() {
                    match spanned.token {
                        Token::BeginGroup => depth += 1,
                        Token::EndGroup => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(self.source[end..spanned.start].to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Err(self.syntax("missing '}'", open))
            }
            _ => Err(self.syntax("expected '{'", open)),
        }
    }

    /// Raw argument for macros: a braced group or one token.
    fn read_raw_argument(&mut self) -> Result<String, ParseError> {
        self.skip_spaces();
        match self.peek().cloned() {
            Some(Spanned {
                token: Token::BeginGroup,
                ..
            }) => self.read_raw_group(),
            Some(spanned) if !matches!(spanned.token, Token::EndGroup) => {
                self.advance();
                Ok(self.source[spanned.start..spanned.end].to_string())
            }
            _ => Err(self.syntax("missing macro argument", self.here())),
        }
    }

    /// Source text of an optional `[..]` argument.
    fn read_optional_raw(&mut self) -> Result<Option<String>, ParseError> {
        let save = self.pos;
        self.skip_spaces();
        let open = match self.peek() {
            Some(Spanned {
                token: Token::Char('['),
                end,
                ..
            }) => *end,
            _ => {
                self.pos = save;
                return Ok(None);
            }
        };
        let start = self.here();
        self.advance();
        let mut depth = 0usize;
        while let Some(spanned) = self.advance() {
            match spanned.token {
                Token::BeginGroup => depth += 1,
                Token::EndGroup => depth = depth.saturating_sub(1),
                Token::Char(']') if depth == 0 => {
                    return Ok(Some(self.source[open..spanned.start].trim().to_string()));
                }
                _ => {}
            }
        }
        Err(self.syntax("missing ']'", start))
    }

    fn read_delimiter(&mut self, closing: bool) -> Result<String, ParseError> {
        self.skip_spaces();
        let position = self.here();
        let delim = match self.advance().map(|s| s.token) {
            Some(Token::Char(c)) => c.to_string(),
            Some(Token::Command(name)) => format!("\\{name}"),
            _ => String::new(),
        };
        if commands::is_delimiter(&delim) || (closing && delim == "?") {
            Ok(delim)
        } else {
            Err(self.syntax("expected a delimiter", position))
        }
    }

    fn fill_style(&mut self, atoms: &[AtomId], style: &Style) -> Result<(), ParseError> {
        for id in atoms {
            let Some(atom) = self.tree.get(*id) else {
                continue;
            };
            let mut local = atom.style.clone();
            local.fill_from(style);
            self.tree
                .set_style(*id, local)
                .map_err(|e| self.internal(e, 0))?;
        }
        Ok(())
    }

    // ===== Commands =====

    fn parse_command(
        &mut self,
        name: &str,
        mode: ParseMode,
        start: usize,
    ) -> Result<Vec<AtomId>, ParseError> {
        if mode == ParseMode::Text {
            if let Some(c) = commands::escaped_char(name) {
                return Ok(vec![self.text_atom(c)]);
            }
            if name == " " {
                return Ok(vec![self.text_atom(' ')]);
            }
        }
        let Some(spec) = commands::lookup(name) else {
            return self.parse_macro(name, mode, start);
        };
        let value = format!("\\{name}");
        let atoms = match spec {
            CommandSpec::Ord => vec![self.tree.add(Atom::new(AtomKind::Ord, value))],
            CommandSpec::Operator(op) => {
                vec![self.tree.add(Atom::new(AtomKind::Operator(op), value))]
            }
            CommandSpec::Space => vec![self.tree.add(Atom::new(AtomKind::Space, value).in_mode(mode))],
            CommandSpec::TextSymbol(c) => vec![self.text_atom(c)],
            CommandSpec::Fraction(kind) => {
                let above = self.parse_argument(ParseMode::Math, start)?;
                let below = self.parse_argument(ParseMode::Math, start)?;
                vec![self.tree.add(
                    Atom::new(AtomKind::Fraction(kind), "")
                        .with_branch(BranchName::Above, above)
                        .with_branch(BranchName::Below, below),
                )]
            }
            CommandSpec::Sqrt => {
                let index = self.parse_optional_list()?;
                let body = self.parse_argument(ParseMode::Math, start)?;
                let mut atom = Atom::new(AtomKind::Radical, "").with_branch(BranchName::Body, body);
                if let Some(index) = index {
                    atom = atom.with_branch(BranchName::Index, index);
                }
                vec![self.tree.add(atom)]
            }
            CommandSpec::Accent => {
                let body = self.parse_argument(ParseMode::Math, start)?;
                vec![self
                    .tree
                    .add(Atom::new(AtomKind::Accent, value).with_branch(BranchName::Body, body))]
            }
            CommandSpec::Variant(variant) => {
                let atoms = self.parse_argument(mode, start)?;
                self.fill_style(&atoms, &Style::default().with_variant(variant))?;
                atoms
            }
            CommandSpec::Family(family) => {
                let atoms = self.parse_argument(mode, start)?;
                self.fill_style(&atoms, &Style::default().with_font_family(family))?;
                atoms
            }
            CommandSpec::TextMode(variant, family) => {
                let atoms = self.parse_argument(ParseMode::Text, start)?;
                let style = Style {
                    variant,
                    font_family: family,
                    ..Style::default()
                };
                if !style.is_empty() {
                    self.fill_style(&atoms, &style)?;
                }
                atoms
            }
            CommandSpec::Color => {
                let color = self.read_raw_group()?;
                let atoms = self.parse_argument(mode, start)?;
                self.fill_style(&atoms, &Style::default().with_color(color))?;
                atoms
            }
            CommandSpec::ColorBox => {
                let color = self.read_raw_group()?;
                let atoms = self.parse_argument(mode, start)?;
                self.fill_style(&atoms, &Style::default().with_background(color))?;
                atoms
            }
            CommandSpec::ColorSwitch => {
                // handled by parse_list; a bare switch as an argument is a no-op
                self.read_raw_group()?;
                Vec::new()
            }
            CommandSpec::Left => {
                let open = self.read_delimiter(false)?;
                let (body, _) = self.parse_list(ParseMode::Math, Frame::Left(start))?;
                let close = self.read_delimiter(true)?;
                let fence = if close == "?" {
                    Fence::Smart { open }
                } else {
                    Fence::Explicit { open, close }
                };
                vec![self
                    .tree
                    .add(Atom::new(AtomKind::Fence(fence), "").with_branch(BranchName::Body, body))]
            }
            CommandSpec::Begin => vec![self.parse_environment(start)?],
            CommandSpec::Placeholder => vec![self.parse_placeholder(mode, start)?],
            CommandSpec::Right => {
                return Err(ParseError::UnbalancedFence {
                    message: "\\right without matching \\left".into(),
                    position: start,
                })
            }
            CommandSpec::End => return Err(self.syntax("\\end without \\begin", start)),
            CommandSpec::MathOpen | CommandSpec::MathClose => {
                return Err(ParseError::UnbalancedMode {
                    message: "math region delimiter out of place".into(),
                    position: start,
                })
            }
            CommandSpec::RowSeparator => {
                return Err(self.syntax("alignment outside of an array", start))
            }
        };
        Ok(atoms)
    }

    fn text_atom(&mut self, c: char) -> AtomId {
        self.tree
            .add(Atom::new(AtomKind::Text, c.to_string()).in_mode(ParseMode::Text))
    }

    fn parse_optional_list(&mut self) -> Result<Option<Vec<AtomId>>, ParseError> {
        let save = self.pos;
        self.skip_spaces();
        if !matches!(self.peek().map(|s| &s.token), Some(Token::Char('['))) {
            self.pos = save;
            return Ok(None);
        }
        let open = self.here();
        self.advance();
        let (mut atoms, _) = self.parse_list(ParseMode::Math, Frame::Bracket(open))?;
        // `[{]}]`: braces spanning the whole argument only protect its content
        if let [only] = atoms[..] {
            if self.tree.get(only).is_some_and(|atom| atom.kind == AtomKind::Group) {
                let len = self.tree.branch(only, BranchName::Body).len();
                if let Ok(inner) = self.tree.detach(only, BranchName::Body, 0..len) {
                    self.tree.free(only);
                    atoms = inner;
                }
            }
        }
        Ok(Some(atoms))
    }

    fn parse_environment(&mut self, start: usize) -> Result<AtomId, ParseError> {
        let environment = self.read_raw_group()?.trim().to_string();
        if !commands::ENVIRONMENTS.contains(&environment.as_str()) {
            return Err(self.syntax(format!("unknown environment '{environment}'"), start));
        }
        let columns = if environment == "array" {
            Some(self.read_raw_group()?.trim().to_string())
        } else {
            None
        };

        let mut rows: Vec<Vec<Vec<AtomId>>> = vec![Vec::new()];
        loop {
            let (cell, stop) = self.parse_list(ParseMode::Math, Frame::Env(start))?;
            if let Some(row) = rows.last_mut() {
                row.push(cell);
            }
            match stop {
                Stop::Ampersand => {}
                Stop::RowSeparator => rows.push(Vec::new()),
                _ => break,
            }
        }
        let closing = self.read_raw_group()?;
        if closing.trim() != environment {
            return Err(self.syntax(
                format!("\\end{{{}}} does not match \\begin{{{environment}}}", closing.trim()),
                start,
            ));
        }

        // a trailing `\\` leaves one empty row behind
        if rows.len() > 1 && rows.last().is_some_and(|r| r.len() == 1 && r[0].is_empty()) {
            rows.pop();
        }
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let mut atom = Atom::new(
            AtomKind::Array(ArrayInfo {
                environment,
                columns,
                rows: rows.len() as u16,
                cols: cols as u16,
            }),
            "",
        );
        for (r, row) in rows.into_iter().enumerate() {
            let padding = cols - row.len();
            for (c, cell) in row
                .into_iter()
                .chain(std::iter::repeat_with(Vec::new).take(padding))
                .enumerate()
            {
                atom = atom.with_branch(BranchName::Cell(r as u16, c as u16), cell);
            }
        }
        Ok(self.tree.add(atom))
    }

    fn parse_placeholder(&mut self, mode: ParseMode, start: usize) -> Result<AtomId, ParseError> {
        let id = self.read_optional_raw()?;
        let flags = match id {
            Some(_) => self.read_optional_raw()?,
            None => None,
        };
        self.skip_spaces();
        let body = if matches!(self.peek().map(|s| &s.token), Some(Token::BeginGroup)) {
            self.parse_argument(mode, start)?
        } else {
            Vec::new()
        };

        let Some(id) = id else {
            if !body.is_empty() {
                return Err(self.syntax("a placeholder without an id has no content", start));
            }
            return Ok(self.tree.add(Atom::new(AtomKind::Placeholder, "").in_mode(mode)));
        };
        if id.is_empty() {
            return Err(self.syntax("empty prompt id", start));
        }
        if !self.prompt_ids.insert(id.clone()) {
            return Err(self.syntax(format!("duplicate prompt id '{id}'"), start));
        }
        let mut prompt = Prompt::new(id);
        for flag in flags.iter().flat_map(|f| f.split(',')) {
            match flag.trim() {
                "" => {}
                "correct" => prompt.correctness = Correctness::Correct,
                "incorrect" => prompt.correctness = Correctness::Incorrect,
                "locked" => prompt.locked = true,
                other => return Err(self.syntax(format!("unknown prompt flag '{other}'"), start)),
            }
        }
        Ok(self.tree.add(
            Atom::new(AtomKind::Prompt(prompt), "")
                .in_mode(mode)
                .with_branch(BranchName::Body, body),
        ))
    }

    fn parse_macro(
        &mut self,
        name: &str,
        mode: ParseMode,
        start: usize,
    ) -> Result<Vec<AtomId>, ParseError> {
        let Some(definition) = self.ctx.lookup_macro(name) else {
            if self.ctx.unknown_command_fallback {
                let id = self
                    .tree
                    .add(Atom::new(AtomKind::Error, format!("\\{name}")).in_mode(mode));
                return Ok(vec![id]);
            }
            return Err(ParseError::UnknownMacro {
                name: name.to_string(),
                position: start,
            });
        };
        if self.expansion_depth >= MAX_EXPANSION_DEPTH {
            return Err(self.syntax(format!("macro '\\{name}' expands too deeply"), start));
        }
        let mut args = Vec::with_capacity(definition.args);
        for _ in 0..definition.args {
            args.push(self.read_raw_argument()?);
        }
        let expansion = definition.substitute(&args);
        let body = self.parse_expansion(expansion, mode, start)?;
        let atom = Atom::new(
            AtomKind::Macro(MacroRef {
                name: name.to_string(),
                args,
            }),
            format!("\\{name}"),
        )
        .in_mode(mode)
        .with_branch(BranchName::Body, body);
        Ok(vec![self.tree.add(atom)])
    }

    /// Parse macro expansion text into this parser's tree.
    fn parse_expansion(
        &mut self,
        expansion: String,
        mode: ParseMode,
        start: usize,
    ) -> Result<Vec<AtomId>, ParseError> {
        let tokens = tokenize(&expansion).map_err(|e| relocate(e, start))?;
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_source = std::mem::replace(&mut self.source, expansion);
        self.expansion_depth += 1;
        let result = self.parse_list(mode, Frame::Top);
        self.expansion_depth -= 1;
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.source = saved_source;
        result
            .map(|(atoms, _)| atoms)
            .map_err(|e| relocate(e, start))
    }

    // ===== Post-passes =====

    fn is_plain_letter(&self, id: AtomId) -> bool {
        self.tree.get(id).is_some_and(|atom| {
            atom.kind == AtomKind::Ord
                && atom.mode == ParseMode::Math
                && atom.is_leaf()
                && atom.style.is_empty()
                && atom.value.len() == 1
                && atom.value.chars().all(|c| c.is_ascii_alphabetic())
        })
    }

    /// Reclassify letter runs the smart mode policy recognizes as words.
    fn apply_smart_mode(&mut self, run: &mut Run) -> Result<(), ParseError> {
        let policy = Arc::clone(&self.ctx.smart_mode_policy);
        let mut i = 0;
        while i < run.atoms.len() {
            if !self.is_plain_letter(run.atoms[i]) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < run.atoms.len() && !run.spaced[j] && self.is_plain_letter(run.atoms[j]) {
                j += 1;
            }
            let word: String = run.atoms[i..j]
                .iter()
                .filter_map(|id| self.tree.get(*id).map(|a| a.value.clone()))
                .collect();
            if policy.classify(&word) == Some(ParseMode::Text) {
                for id in run.atoms[i..j].to_vec() {
                    let value = self.tree.get(id).map(|a| a.value.clone()).unwrap_or_default();
                    self.tree
                        .retag(id, AtomKind::Text, value, ParseMode::Text)
                        .map_err(|e| self.internal(e, 0))?;
                }
                let followed_by_space = run.spaced.get(j).copied().unwrap_or(run.pending_space);
                if followed_by_space {
                    let space = self.text_atom(' ');
                    run.atoms.insert(j, space);
                    run.spaced.insert(j, false);
                    if let Some(flag) = run.spaced.get_mut(j + 1) {
                        *flag = false;
                    }
                    j += 1;
                }
            }
            i = j;
        }
        Ok(())
    }

    /// Index of the leftmost opener without a matching closer.
    fn first_unmatched_opener(&self, atoms: &[AtomId]) -> Option<usize> {
        let mut stack: Vec<(usize, &str)> = Vec::new();
        for (index, id) in atoms.iter().enumerate() {
            let Some(atom) = self.tree.get(*id) else {
                continue;
            };
            if !atom.is_leaf() {
                continue;
            }
            match atom.kind {
                AtomKind::Operator(OperatorKind::Open) if matching_close(&atom.value).is_some() => {
                    stack.push((index, atom.value.as_str()));
                }
                AtomKind::Operator(OperatorKind::Close) => {
                    if stack
                        .last()
                        .is_some_and(|(_, open)| matching_close(open) == Some(atom.value.as_str()))
                    {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }
        stack.first().map(|(index, _)| *index)
    }

    /// Wrap everything after an unmatched opener in a smart fence.
    fn wrap_unmatched_openers(&mut self, atoms: &mut Vec<AtomId>) -> Result<(), ParseError> {
        let Some(index) = self.first_unmatched_opener(atoms) else {
            return Ok(());
        };
        let mut body = atoms.split_off(index + 1);
        let Some(opener) = atoms.pop() else {
            return Ok(());
        };
        self.wrap_unmatched_openers(&mut body)?;
        let (open, style) = match self.tree.get(opener) {
            Some(atom) => (atom.value.clone(), atom.style.clone()),
            None => return Ok(()),
        };
        self.tree.free(opener);
        let fence = self.tree.add(
            Atom::new(AtomKind::Fence(Fence::Smart { open }), "")
                .styled(style)
                .with_branch(BranchName::Body, body),
        );
        atoms.push(fence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{FractionKind, Variant};

    fn parse_ok(markup: &str) -> AtomTree {
        parse(markup, &ParseContext::default()).unwrap()
    }

    fn kinds(tree: &AtomTree, ids: &[AtomId]) -> Vec<&'static str> {
        ids.iter().map(|id| tree.get(*id).unwrap().kind.name()).collect()
    }

    fn values(tree: &AtomTree, ids: &[AtomId]) -> Vec<String> {
        ids.iter().map(|id| tree.get(*id).unwrap().value.clone()).collect()
    }

    #[test]
    fn test_fraction() {
        let tree = parse_ok("\\frac{1}{2}");
        let body = tree.body();
        assert_eq!(body.len(), 1);
        let frac = tree.get(body[0]).unwrap();
        assert_eq!(frac.kind, AtomKind::Fraction(FractionKind::Frac));
        assert_eq!(values(&tree, tree.branch(body[0], BranchName::Above)), vec!["1"]);
        assert_eq!(values(&tree, tree.branch(body[0], BranchName::Below)), vec!["2"]);
    }

    #[test]
    fn test_fraction_with_single_token_arguments() {
        let tree = parse_ok("\\frac12");
        let frac = tree.body()[0];
        assert_eq!(values(&tree, tree.branch(frac, BranchName::Above)), vec!["1"]);
        assert_eq!(values(&tree, tree.branch(frac, BranchName::Below)), vec!["2"]);
    }

    #[test]
    fn test_symbols_and_operators() {
        let tree = parse_ok("x+\\alpha=2");
        assert_eq!(kinds(&tree, tree.body()), vec!["ord", "bin", "ord", "rel", "ord"]);
        assert_eq!(values(&tree, tree.body())[2], "\\alpha");
    }

    #[test]
    fn test_scripts_attach_to_base() {
        let tree = parse_ok("x_i^2");
        let x = tree.body()[0];
        assert_eq!(tree.body().len(), 1);
        assert_eq!(values(&tree, tree.branch(x, BranchName::Subscript)), vec!["i"]);
        assert_eq!(values(&tree, tree.branch(x, BranchName::Superscript)), vec!["2"]);
    }

    #[test]
    fn test_double_superscript_is_an_error() {
        let err = parse("x^2^3", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message == "double superscript"));
        assert_eq!(err.position(), 3);
    }

    #[test]
    fn test_leading_script_uses_subsup() {
        let tree = parse_ok("^2");
        assert_eq!(kinds(&tree, tree.body()), vec!["subsup"]);
        let tree = parse_ok("x{}^2");
        assert_eq!(kinds(&tree, tree.body()), vec!["ord", "subsup"]);
    }

    #[test]
    fn test_radical_with_index() {
        let tree = parse_ok("\\sqrt[3]{x}");
        let radical = tree.body()[0];
        assert_eq!(values(&tree, tree.branch(radical, BranchName::Index)), vec!["3"]);
        assert_eq!(values(&tree, tree.branch(radical, BranchName::Body)), vec!["x"]);
        let tree = parse_ok("\\sqrt{x}");
        assert!(!tree.has_branch(tree.body()[0], BranchName::Index));
    }

    #[test]
    fn test_text_mode_and_escapes() {
        let tree = parse_ok("\\text{a\\%b}");
        assert_eq!(kinds(&tree, tree.body()), vec!["text", "text", "text"]);
        assert_eq!(values(&tree, tree.body()), vec!["a", "%", "b"]);
        assert!(tree
            .body()
            .iter()
            .all(|id| tree.get(*id).unwrap().mode == ParseMode::Text));
    }

    #[test]
    fn test_math_inside_text() {
        let tree = parse_ok("\\text{if $x$}");
        let body = tree.body();
        assert_eq!(kinds(&tree, body), vec!["text", "text", "text", "ord"]);
        assert_eq!(tree.get(body[3]).unwrap().mode, ParseMode::Math);
    }

    #[test]
    fn test_unterminated_text_is_unbalanced_mode() {
        let err = parse("\\text{abc", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedMode { .. }));
        let err = parse("x$", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedMode { .. }));
    }

    #[test]
    fn test_left_right() {
        let tree = parse_ok("\\left(x\\right]");
        let fence = tree.get(tree.body()[0]).unwrap();
        assert_eq!(
            fence.kind,
            AtomKind::Fence(Fence::Explicit {
                open: "(".into(),
                close: "]".into()
            })
        );
        let tree = parse_ok("\\left\\langle x\\right?");
        assert_eq!(
            tree.get(tree.body()[0]).unwrap().kind,
            AtomKind::Fence(Fence::Smart {
                open: "\\langle".into()
            })
        );
    }

    #[test]
    fn test_unbalanced_fences() {
        let err = parse("\\left(x", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedFence { .. }));
        let err = parse("x\\right)", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedFence { position: 1, .. }));
    }

    #[test]
    fn test_smart_fence_wraps_unmatched_opener() {
        let tree = parse_ok("(x+1");
        assert_eq!(kinds(&tree, tree.body()), vec!["smart-fence"]);
        let fence = tree.body()[0];
        assert_eq!(
            kinds(&tree, tree.branch(fence, BranchName::Body)),
            vec!["ord", "bin", "ord"]
        );
    }

    #[test]
    fn test_smart_fence_keeps_matched_pairs_literal() {
        let tree = parse_ok("f(x)");
        assert_eq!(kinds(&tree, tree.body()), vec!["ord", "open", "ord", "close"]);
    }

    #[test]
    fn test_smart_fence_disabled_keeps_literals() {
        let ctx = ParseContext::default().with_smart_fence(false);
        let tree = parse("(x", &ctx).unwrap();
        assert_eq!(kinds(&tree, tree.body()), vec!["open", "ord"]);
    }

    #[test]
    fn test_nested_unmatched_openers() {
        let tree = parse_ok("((x");
        let outer = tree.body()[0];
        let inner = tree.branch(outer, BranchName::Body);
        assert_eq!(kinds(&tree, inner), vec!["smart-fence"]);
    }

    #[test]
    fn test_matrix_environment() {
        let tree = parse_ok("\\begin{pmatrix}a & b\\\\c & d\\end{pmatrix}");
        let array = tree.body()[0];
        match &tree.get(array).unwrap().kind {
            AtomKind::Array(info) => {
                assert_eq!(info.environment, "pmatrix");
                assert_eq!((info.rows, info.cols), (2, 2));
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert_eq!(values(&tree, tree.branch(array, BranchName::Cell(1, 0))), vec!["c"]);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let tree = parse_ok("\\begin{matrix}a & b\\\\c\\\\\\end{matrix}");
        let array = tree.body()[0];
        assert!(tree.has_branch(array, BranchName::Cell(1, 1)));
        assert!(tree.branch(array, BranchName::Cell(1, 1)).is_empty());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_empty_matrix_has_one_cell() {
        let tree = parse_ok("\\begin{matrix}\\end{matrix}");
        let array = tree.body()[0];
        assert_eq!(tree.branch_names(array), vec![BranchName::Cell(0, 0)]);
    }

    #[test]
    fn test_mismatched_environment() {
        let err = parse("\\begin{matrix}a\\end{pmatrix}", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_prompts() {
        let tree = parse_ok("\\placeholder[p1][correct,locked]{x}+\\placeholder{}");
        let prompt = tree.body()[0];
        match &tree.get(prompt).unwrap().kind {
            AtomKind::Prompt(p) => {
                assert_eq!(p.id, "p1");
                assert_eq!(p.correctness, Correctness::Correct);
                assert!(p.locked);
            }
            other => panic!("expected prompt, got {other:?}"),
        }
        assert_eq!(kinds(&tree, &tree.body()[2..]), vec!["placeholder"]);
    }

    #[test]
    fn test_duplicate_prompt_ids() {
        let err = parse(
            "\\placeholder[a]{}\\placeholder[a]{}",
            &ParseContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message.contains("duplicate")));
    }

    #[test]
    fn test_selection_marker_requires_insert_context() {
        assert!(parse("#@", &ParseContext::default()).is_err());
        let mut ctx = ParseContext::default();
        ctx.allow_selection_marker = true;
        let tree = parse("\\frac{#@}{2}", &ctx).unwrap();
        let frac = tree.body()[0];
        assert_eq!(values(&tree, tree.branch(frac, BranchName::Above)), vec!["#@"]);
    }

    #[test]
    fn test_unknown_macro() {
        let err = parse("\\foo", &ParseContext::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownMacro {
                name: "foo".into(),
                position: 0
            }
        );
        let ctx = ParseContext::default().with_unknown_command_fallback(true);
        let tree = parse("\\foo", &ctx).unwrap();
        assert_eq!(kinds(&tree, tree.body()), vec!["error"]);
    }

    #[test]
    fn test_macro_expansion() {
        let mut macros = MacroDictionary::new();
        macros.insert("half", MacroDefinition::new("\\frac{#1}{2}", 1));
        let ctx = ParseContext::default().with_macros(macros);
        let tree = parse("\\half{x}", &ctx).unwrap();
        let atom = tree.get(tree.body()[0]).unwrap();
        assert_eq!(
            atom.kind,
            AtomKind::Macro(MacroRef {
                name: "half".into(),
                args: vec!["x".into()]
            })
        );
        let body = tree.branch(tree.body()[0], BranchName::Body);
        assert_eq!(kinds(&tree, body), vec!["fraction"]);
    }

    #[test]
    fn test_recursive_macro_is_bounded() {
        let mut macros = MacroDictionary::new();
        macros.insert("loop", MacroDefinition::new("\\loop", 0));
        let ctx = ParseContext::default().with_macros(macros);
        let err = parse("\\loop", &ctx).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_registers_act_as_macros() {
        let mut registers = Registers::new();
        registers.insert("R", "\\mathbb{R}");
        let ctx = ParseContext::default().with_registers(registers);
        let tree = parse("x\\in\\R", &ctx).unwrap();
        assert_eq!(kinds(&tree, tree.body()), vec!["ord", "rel", "macro"]);
    }

    #[test]
    fn test_style_commands_apply_to_top_level_atoms() {
        let tree = parse_ok("\\textcolor{red}{x\\mathbf{y}}");
        let body = tree.body();
        assert_eq!(tree.get(body[0]).unwrap().style.color.as_deref(), Some("red"));
        let y = tree.get(body[1]).unwrap();
        assert_eq!(y.style.color.as_deref(), Some("red"));
        assert_eq!(y.style.variant, Some(Variant::Bold));
    }

    #[test]
    fn test_color_switch_styles_the_rest_of_the_group() {
        let tree = parse_ok("a\\color{blue}bc");
        let body = tree.body();
        assert_eq!(tree.get(body[0]).unwrap().style.color, None);
        assert_eq!(tree.get(body[1]).unwrap().style.color.as_deref(), Some("blue"));
        assert_eq!(tree.get(body[2]).unwrap().style.color.as_deref(), Some("blue"));
    }

    #[test]
    fn test_smart_mode_converts_words() {
        let ctx = ParseContext::default().with_smart_mode(true);
        let tree = parse("x if y", &ctx).unwrap();
        assert_eq!(
            kinds(&tree, tree.body()),
            vec!["ord", "text", "text", "text", "ord"]
        );
        assert_eq!(values(&tree, tree.body())[3], " ");
    }

    #[test]
    fn test_smart_mode_keeps_unknown_runs() {
        let ctx = ParseContext::default().with_smart_mode(true);
        let tree = parse("xy", &ctx).unwrap();
        assert_eq!(kinds(&tree, tree.body()), vec!["ord", "ord"]);
    }

    #[test]
    fn test_unexpected_close_brace() {
        let err = parse("x}", &ParseContext::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { position: 1, .. }));
    }

    #[test]
    fn test_text_default_mode() {
        let ctx = ParseContext::default().with_default_mode(ParseMode::Text);
        let tree = parse("a $x$", &ctx).unwrap();
        assert_eq!(kinds(&tree, tree.body()), vec!["text", "text", "ord"]);
    }

    #[test]
    fn test_parsed_trees_validate() {
        for markup in [
            "\\frac{a}{\\sqrt[n]{b}}",
            "\\left(x^2\\right)",
            "\\begin{cases}x & y\\end{cases}",
            "\\hat{x}_0",
        ] {
            let tree = parse_ok(markup);
            assert!(tree.validate().is_ok(), "{markup}");
        }
    }
}
