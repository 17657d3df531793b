use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TemplateError {
    #[error("Failed to read template '{path}': {message}")]
    Io { path: String, message: String },
    #[error("Malformed placeholder on line {line}: '{snippet}'")]
    Malformed { line: usize, snippet: String },
    #[error("No value provided for template key '{0}'")]
    MissingValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A text template with `${name}` (or `$name`) placeholders.
///
/// `$$` renders a literal `$`. Any other use of `$` is a syntax error, which
/// is reported when the template is parsed rather than when it is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTemplate {
    segments: Vec<Segment>,
    keys: BTreeSet<String>,
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl InputTemplate {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut keys = BTreeSet::new();
        let mut literal = String::new();
        let mut line = 1;
        let mut chars = text.chars().peekable();

        let malformed = |line: usize, snippet: String| TemplateError::Malformed { line, snippet };

        while let Some(c) = chars.next() {
            if c != '$' {
                if c == '\n' {
                    line += 1;
                }
                literal.push(c);
                continue;
            }

            let name = match chars.peek().copied() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                    continue;
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if c == '\n' {
                            break;
                        }
                        name.push(c);
                    }
                    let valid = name.chars().next().is_some_and(is_identifier_start)
                        && name.chars().all(is_identifier_char);
                    if !closed || !valid {
                        return Err(malformed(line, format!("${{{}", name)));
                    }
                    name
                }
                Some(c) if is_identifier_start(c) => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if !is_identifier_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    name
                }
                other => {
                    return Err(malformed(
                        line,
                        other.map_or_else(|| "$".to_string(), |c| format!("${}", c)),
                    ));
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            keys.insert(name.clone());
            segments.push(Segment::Placeholder(name));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments, keys })
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Every placeholder name appearing in the template.
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingValue(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}
