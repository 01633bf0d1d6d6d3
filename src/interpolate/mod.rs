//! Interpolate module - `${NAME}` substitution in raw manifest documents.
//!
//! Substitution runs on the text before decoding, so a variable can supply
//! any scalar. `$${NAME}` escapes to a literal `${NAME}`. Comments are copied
//! as written: a `#` at the start of a line or after whitespace, outside
//! quotes, ends the substituted text of its line.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use thiserror::Error;

static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable pattern is valid")
});

/// InterpolateError represents a reference that cannot be substituted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolateError {
    #[error("line {line}: variable \"{name}\" is not defined")]
    UndefinedVariable { name: String, line: usize },
}

/// Interpolator substitutes a fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpolator {
    variables: BTreeMap<String, String>,
}

impl Interpolator {
    /// Creates an interpolator with no variables.
    pub fn new() -> Self {
        Interpolator::default()
    }

    /// Defines or redefines a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Returns the defined variable names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Replaces every `${NAME}` in `input`. Fails on the first undefined name.
    pub fn interpolate(&self, input: &str) -> Result<String, InterpolateError> {
        let mut out = String::with_capacity(input.len());
        for (i, line) in input.split_inclusive('\n').enumerate() {
            let (text, comment) = line.split_at(comment_start(line));
            self.interpolate_line(text, i + 1, &mut out)?;
            out.push_str(comment);
        }
        Ok(out)
    }

    fn interpolate_line(&self, text: &str, line: usize, out: &mut String) -> Result<(), InterpolateError> {
        let mut last = 0;
        for caps in VARIABLE.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.substitute(&caps, line)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(())
    }

    fn substitute(&self, caps: &Captures<'_>, line: usize) -> Result<String, InterpolateError> {
        let escaped = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map_or("", |m| m.as_str());
        if escaped {
            return Ok(format!("${{{}}}", name));
        }
        match self.get(name) {
            Some(value) => {
                tracing::trace!(name, "substituted variable");
                Ok(value.to_string())
            }
            None => Err(InterpolateError::UndefinedVariable {
                name: name.to_string(),
                line,
            }),
        }
    }
}

/// Returns the byte offset where the comment of `line` starts, or its length.
fn comment_start(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') if prev.map_or(true, char::is_whitespace) => return i,
            (None, '\'' | '"') if prev.map_or(true, |p| p.is_whitespace() || "[{,".contains(p)) => {
                quote = Some(c)
            }
            (Some(q), _) if c == q => quote = None,
            _ => {}
        }
        prev = Some(c);
    }
    line.len()
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Interpolator {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Interpolator {
            variables: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
