//! Message and description templates.
//!
//! A template is text with `{name}` placeholders. Placeholders are parsed once,
//! so the set of keys a template needs is known before anything is rendered.
//! `{{` and `}}` produce literal braces.

use crate::VvError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Values substituted into templates, keyed by placeholder name.
pub type TemplateArgs = BTreeMap<String, Value>;

/// Build template arguments from key/value pairs.
pub fn args<I, K, V>(pairs: I) -> TemplateArgs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template with a declared placeholder set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

impl Template {
    /// Parse a template, failing on unbalanced or empty braces.
    pub fn parse(source: &str) -> Result<Self, VvError> {
        let syntax = |reason: &str| VvError::TemplateSyntax {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut placeholders = BTreeSet::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) if ch.is_alphanumeric() || ch == '_' => name.push(ch),
                            Some(ch) => {
                                return Err(syntax(&format!(
                                    "unexpected '{}' inside placeholder",
                                    ch
                                )))
                            }
                            None => return Err(syntax("unclosed '{'")),
                        }
                    }
                    if name.is_empty() {
                        return Err(syntax("empty placeholder '{}'"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    placeholders.insert(name.clone());
                    segments.push(Segment::Placeholder(name));
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(syntax("single '}' encountered")),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            source: source.to_string(),
            segments,
            placeholders,
        })
    }

    /// The unrendered template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names, sorted.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str)
    }

    /// Placeholders with no entry in `args`.
    pub fn missing_keys(&self, args: &TemplateArgs) -> Vec<String> {
        self.placeholders
            .iter()
            .filter(|key| !args.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Render against `args`. Extra keys are ignored.
    pub fn render(&self, args: &TemplateArgs) -> Result<String, VvError> {
        if let Some(key) = self.missing_keys(args).into_iter().next() {
            return Err(VvError::MissingTemplateKey {
                template: self.source.clone(),
                key,
            });
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    if let Some(value) = args.get(key) {
                        push_value(&mut out, value);
                    }
                }
            }
        }
        Ok(out)
    }
}

// Strings render bare; everything else renders as JSON.
fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

impl FromStr for Template {
    type Err = VvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
