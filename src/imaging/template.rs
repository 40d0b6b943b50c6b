use std::fmt::Display;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};

/// Ordered `%token` → replacement pairs.
///
/// Replacement is plain text substitution applied in insertion order, so a token that is a
/// prefix of a later one must not appear before it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a token, keeping its original position when replaced.
    pub fn set(&mut self, token: impl Into<String>, value: impl ToString) -> &mut Self {
        let token = token.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    /// Substitute every token, then strip leading and trailing `/`.
    pub fn render(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (token, value) in &self.entries {
            out = out.replace(token.as_str(), value);
        }
        out.trim_matches('/').to_string()
    }
}

/// Format `now` with a strftime pattern. A malformed pattern is logged and returned verbatim.
pub fn strftime<Tz>(now: &DateTime<Tz>, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        tracing::warn!(pattern, "invalid date/time format, using it literally");
        return pattern.to_string();
    }
    now.format(pattern).to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/template.rs"]
mod tests;
