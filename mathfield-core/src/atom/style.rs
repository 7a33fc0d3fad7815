//! Presentation style and parse mode carried by atoms.
//!
//! Every field of [`Style`] is optional. An unset field inherits the value of
//! the nearest ancestor that sets it, so the effective style of an atom is
//! its local style layered over the effective style of its parent.

use serde::{Deserialize, Serialize};

/// Interpretation mode of a run of atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseMode {
    #[default]
    Math,
    Text,
}

/// Letterform variant (`\mathbf`, `\mathbb`, `\textit`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    Normal,
    Bold,
    Italic,
    BoldItalic,
    DoubleStruck,
    Calligraphic,
    Fraktur,
    Script,
}

impl Variant {
    /// Command used to express the variant in the given mode.
    pub fn command(self, mode: ParseMode) -> &'static str {
        match (self, mode) {
            (Variant::Normal, ParseMode::Math) => "mathup",
            (Variant::Normal, ParseMode::Text) => "textup",
            (Variant::Bold, ParseMode::Math) => "mathbf",
            (Variant::Bold, ParseMode::Text) => "textbf",
            (Variant::Italic, ParseMode::Math) => "mathit",
            (Variant::Italic, ParseMode::Text) => "textit",
            (Variant::BoldItalic, _) => "boldsymbol",
            (Variant::DoubleStruck, _) => "mathbb",
            (Variant::Calligraphic, _) => "mathcal",
            (Variant::Fraktur, _) => "mathfrak",
            (Variant::Script, _) => "mathscr",
        }
    }
}

/// Font family for upright runs (`\mathsf`, `\texttt`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Roman,
    SansSerif,
    Monospace,
}

impl FontFamily {
    pub fn command(self, mode: ParseMode) -> &'static str {
        match (self, mode) {
            (FontFamily::Roman, ParseMode::Math) => "mathrm",
            (FontFamily::Roman, ParseMode::Text) => "textrm",
            (FontFamily::SansSerif, ParseMode::Math) => "mathsf",
            (FontFamily::SansSerif, ParseMode::Text) => "textsf",
            (FontFamily::Monospace, ParseMode::Math) => "mathtt",
            (FontFamily::Monospace, ParseMode::Text) => "texttt",
        }
    }
}

/// Local presentation style of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        self.variant.is_none()
            && self.color.is_none()
            && self.background.is_none()
            && self.font_family.is_none()
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn with_font_family(mut self, family: FontFamily) -> Self {
        self.font_family = Some(family);
        self
    }

    /// This style layered over `inherited`: local fields win.
    pub fn resolve(&self, inherited: &Style) -> Style {
        Style {
            variant: self.variant.or(inherited.variant),
            color: self.color.clone().or_else(|| inherited.color.clone()),
            background: self
                .background
                .clone()
                .or_else(|| inherited.background.clone()),
            font_family: self.font_family.or(inherited.font_family),
        }
    }

    /// Set every field that `other` sets, overwriting existing values.
    pub fn overlay(&mut self, other: &Style) {
        if other.variant.is_some() {
            self.variant = other.variant;
        }
        if other.color.is_some() {
            self.color = other.color.clone();
        }
        if other.background.is_some() {
            self.background = other.background.clone();
        }
        if other.font_family.is_some() {
            self.font_family = other.font_family;
        }
    }

    /// Set the fields of `other` that are still unset here.
    pub fn fill_from(&mut self, other: &Style) {
        if self.variant.is_none() {
            self.variant = other.variant;
        }
        if self.color.is_none() {
            self.color = other.color.clone();
        }
        if self.background.is_none() {
            self.background = other.background.clone();
        }
        if self.font_family.is_none() {
            self.font_family = other.font_family;
        }
    }

    /// True when every field set by `other` has the same value here.
    pub fn contains(&self, other: &Style) -> bool {
        (other.variant.is_none() || self.variant == other.variant)
            && (other.color.is_none() || self.color == other.color)
            && (other.background.is_none() || self.background == other.background)
            && (other.font_family.is_none() || self.font_family == other.font_family)
    }

    /// Clear every field that `other` sets.
    pub fn without(&self, other: &Style) -> Style {
        Style {
            variant: if other.variant.is_some() {
                None
            } else {
                self.variant
            },
            color: if other.color.is_some() {
                None
            } else {
                self.color.clone()
            },
            background: if other.background.is_some() {
                None
            } else {
                self.background.clone()
            },
            font_family: if other.font_family.is_some() {
                None
            } else {
                self.font_family
            },
        }
    }

    /// Fields of `self` that differ from `base`.
    pub fn delta(&self, base: &Style) -> Style {
        Style {
            variant: self.variant.filter(|v| base.variant != Some(*v)),
            color: self.color.clone().filter(|c| base.color.as_ref() != Some(c)),
            background: self
                .background
                .clone()
                .filter(|b| base.background.as_ref() != Some(b)),
            font_family: self.font_family.filter(|f| base.font_family != Some(*f)),
        }
    }
}
