//! Text buffer with `@@name@@` placeholders
//!
//! Snippets are appended in order, values are bound by name, and
//! [`Template::finalize`] checks both sides against each other before doing a
//! literal replace of every bound placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::host::Host;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"@@(\w+)@@").expect("valid regex"));

#[derive(Debug, Clone, Default)]
pub struct Template {
    text: String,
    vars: Vec<(String, String)>,
}

fn token(key: &str) -> String {
    format!("@@{}@@", key)
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Append `text` followed by a newline
    pub fn line(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    /// Bind `key`, replacing any earlier value
    pub fn bind(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((key.to_string(), value)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(k, _)| k.as_str())
    }

    /// Bound keys that never appear as a placeholder
    pub fn unused(&self) -> Vec<&str> {
        self.keys()
            .filter(|k| !self.text.contains(&token(k)))
            .collect()
    }

    /// Placeholders with no binding, each listed once in order of appearance
    pub fn undefined(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| self.value(name).is_none() && seen.insert(*name))
            .collect()
    }

    /// Warn about mismatches, then substitute every bound placeholder
    pub fn finalize(self, host: &dyn Host) -> String {
        for key in self.unused() {
            host.warning(&format!("Variable '{}' is not used.", key));
        }
        for name in self.undefined() {
            host.warning(&format!("Variable '{}' is used but not defined.", name));
        }

        let mut text = self.text;
        for (key, value) in &self.vars {
            text = text.replace(&token(key), value);
        }
        text
    }
}
