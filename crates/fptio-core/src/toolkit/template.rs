//! Path templates with typed, positional keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Widest zero padding a `format_spec` may ask for.
pub const MAX_PADDING: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unbalanced or empty braces in definition '{0}'")]
    Syntax(String),

    #[error("key '{0}' is not declared")]
    UndeclaredKey(String),

    #[error("root '{0}' is not declared")]
    UnknownRoot(String),

    #[error("invalid format_spec '{spec}' for key '{key}'")]
    InvalidFormatSpec { key: String, spec: String },

    #[error("definition '{0}' is absolute but the template has a root")]
    AbsoluteDefinition(String),

    #[error("expected {expected} field values, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("value '{value}' is not valid for key '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },
}

/// Value type of a template key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// Free text, optionally restricted to ASCII letters and digits
    Str { alphanumeric: bool },
    /// Integer, zero-padded to `width` digits when set
    Int { width: Option<usize> },
}

/// A named slot in a template definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateKey {
    name: String,
    kind: KeyKind,
}

impl TemplateKey {
    pub fn new(name: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, KeyKind::Str { alphanumeric: false })
    }

    pub fn integer(name: impl Into<String>, width: Option<usize>) -> Self {
        Self::new(name, KeyKind::Int { width })
    }

    /// Parse a `format_spec` such as `"03"` into a padding width.
    ///
    /// Widths above [`MAX_PADDING`] are rejected.
    pub fn integer_with_spec(name: impl Into<String>, spec: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let width = spec
            .strip_prefix('0')
            .and_then(|digits| digits.parse::<usize>().ok())
            .filter(|width| *width <= MAX_PADDING)
            .ok_or_else(|| TemplateError::InvalidFormatSpec {
                key: name.clone(),
                spec: spec.to_string(),
            })?;
        Ok(Self::integer(name, Some(width)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    /// Validate a raw field value and render it for the path.
    ///
    /// Integer values are accepted without padding (`"3"` for a `03`
    /// key) and re-padded here.
    pub fn format_value(&self, raw: &str) -> Result<String, TemplateError> {
        let invalid = |reason| TemplateError::InvalidValue {
            key: self.name.clone(),
            value: raw.to_string(),
            reason,
        };

        match &self.kind {
            KeyKind::Str { alphanumeric } => {
                if raw.is_empty() {
                    return Err(invalid("empty value"));
                }
                if raw.contains(['/', '\\']) {
                    return Err(invalid("path separators are not allowed"));
                }
                if raw.chars().all(|c| c == '.') {
                    return Err(invalid("relative path components are not allowed"));
                }
                if *alphanumeric && !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid("only letters and digits are allowed"));
                }
                Ok(raw.to_string())
            }
            KeyKind::Int { width } => {
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("not a non-negative integer"));
                }
                let number: u64 = raw.parse().map_err(|_| invalid("integer out of range"))?;
                let digits = number.to_string();
                Ok(match width {
                    Some(width) if *width > digits.len() => {
                        format!("{}{}", "0".repeat(width - digits.len()), digits)
                    }
                    _ => digits,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Index into `Template::keys`
    Key(usize),
}

/// A named path pattern such as `sequences/{Sequence}/{Shot}/work/{name}.v{version}.ma`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    definition: String,
    segments: Vec<Segment>,
    keys: Vec<TemplateKey>,
    root: Option<PathBuf>,
}

impl Template {
    /// Parse a definition against the declared keys.
    ///
    /// Field slots are the distinct `{key}` tokens in order of first
    /// appearance. A definition under a root must be relative.
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        declared: &BTreeMap<String, TemplateKey>,
        root: Option<PathBuf>,
    ) -> Result<Self, TemplateError> {
        let definition = definition.into();
        let path = Path::new(&definition);
        if root.is_some() && (path.has_root() || path.is_absolute()) {
            return Err(TemplateError::AbsoluteDefinition(definition));
        }
        let mut segments = Vec::new();
        let mut keys: Vec<TemplateKey> = Vec::new();
        let mut rest = definition.as_str();

        while !rest.is_empty() {
            let Some(open) = rest.find(['{', '}']) else {
                segments.push(Segment::Literal(rest.to_string()));
                break;
            };
            if rest[open..].starts_with('}') {
                return Err(TemplateError::Syntax(definition.clone()));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }

            let after = &rest[open + 1..];
            let close = after
                .find(['{', '}'])
                .filter(|idx| after[*idx..].starts_with('}'))
                .ok_or_else(|| TemplateError::Syntax(definition.clone()))?;
            let key_name = &after[..close];
            if key_name.is_empty() {
                return Err(TemplateError::Syntax(definition.clone()));
            }

            let index = match keys.iter().position(|k| k.name() == key_name) {
                Some(index) => index,
                None => {
                    let key = declared
                        .get(key_name)
                        .ok_or_else(|| TemplateError::UndeclaredKey(key_name.to_string()))?;
                    keys.push(key.clone());
                    keys.len() - 1
                }
            };
            segments.push(Segment::Key(index));
            rest = &after[close + 1..];
        }

        Ok(Self {
            name: name.into(),
            definition,
            segments,
            keys,
            root,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Declared field slots, in positional order.
    pub fn keys(&self) -> &[TemplateKey] {
        &self.keys
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Substitute positional values into the template.
    pub fn apply(&self, values: &[String]) -> Result<PathBuf, TemplateError> {
        if values.len() != self.keys.len() {
            return Err(TemplateError::Arity {
                expected: self.keys.len(),
                actual: values.len(),
            });
        }

        let rendered: Vec<String> = self
            .keys
            .iter()
            .zip(values)
            .map(|(key, value)| key.format_value(value))
            .collect::<Result<_, _>>()?;

        let mut relative = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => relative.push_str(text),
                Segment::Key(index) => relative.push_str(&rendered[*index]),
            }
        }

        Ok(match &self.root {
            Some(root) => root.join(relative),
            None => PathBuf::from(relative),
        })
    }
}
