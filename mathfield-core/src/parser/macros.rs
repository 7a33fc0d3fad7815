//! Host-supplied macro dictionary and registers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One macro: an expansion template with `#1`..`#9` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub expansion: String,
    #[serde(default)]
    pub args: usize,
}

impl MacroDefinition {
    pub fn new(expansion: impl Into<String>, args: usize) -> Self {
        MacroDefinition {
            expansion: expansion.into(),
            args,
        }
    }

    /// Replace `#n` with the n-th argument. `##` stands for a literal `#`.
    pub fn substitute(&self, arguments: &[String]) -> String {
        let mut out = String::with_capacity(self.expansion.len());
        let mut chars = self.expansion.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '#' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() && d != '0' => {
                    chars.next();
                    let index = (d as u8 - b'1') as usize;
                    if let Some(arg) = arguments.get(index) {
                        out.push_str(arg);
                    }
                }
                Some('#') => {
                    chars.next();
                    out.push('#');
                }
                _ => out.push('#'),
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroDictionary {
    definitions: BTreeMap<String, MacroDefinition>,
}

impl MacroDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: MacroDefinition) {
        self.definitions.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|k| k.as_str())
    }
}

/// Named values referenced as `\name`; they behave as zero-argument
/// macros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registers {
    values: BTreeMap<String, String>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_parameters() {
        let def = MacroDefinition::new("\\frac{#1}{#2}", 2);
        let out = def.substitute(&["a".to_string(), "b+c".to_string()]);
        assert_eq!(out, "\\frac{a}{b+c}");
    }

    #[test]
    fn test_substitute_missing_argument_is_empty() {
        let def = MacroDefinition::new("#1#2", 2);
        assert_eq!(def.substitute(&["x".to_string()]), "x");
    }

    #[test]
    fn test_dictionary_lookup() {
        let mut macros = MacroDictionary::new();
        macros.insert("RR", MacroDefinition::new("\\mathbb{R}", 0));
        assert!(macros.get("RR").is_some());
        assert!(macros.get("ZZ").is_none());
        assert_eq!(macros.names().collect::<Vec<_>>(), vec!["RR"]);
    }
}
