use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a JSON document, rendered as `$.a.b[0]`.
///
/// Template keys are not always identifiers (`Fn::Sub`, `Payload.$`), so
/// those render in quoted bracket form: `$.Properties["Fn::Sub"][0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<FieldPathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn from_segments(segments: Vec<FieldPathSegment>) -> Self {
        Self { segments }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys.into_iter().map(|key| FieldPathSegment::Key(key.into())).collect(),
        }
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(FieldPathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(FieldPathSegment::Index(index));
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.push_key(key);
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.push_index(index);
        self
    }

    pub fn segments(&self) -> &[FieldPathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for FieldPath {
    fn default() -> Self {
        Self::root()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldPathParseError {
    #[error("field path must start with '$' or an identifier")]
    InvalidStart,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("invalid index segment")]
    InvalidIndex,
    #[error("unterminated quoted key")]
    UnterminatedQuote,
    #[error("expected '.' before key segment")]
    MissingDot,
    #[error("invalid key segment")]
    InvalidKey,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn read_identifier(input: &str, start: usize) -> usize {
    input[start..]
        .char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map(|(offset, _)| start + offset)
        .unwrap_or(input.len())
}

/// Reads a `"..."` key starting at the opening quote. Returns the unescaped
/// key and the position just past the closing quote.
fn read_quoted_key(input: &str, open: usize) -> Result<(String, usize), FieldPathParseError> {
    let mut key = String::new();
    let mut escaped = false;
    for (offset, c) in input[open + 1..].char_indices() {
        if escaped {
            key.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Ok((key, open + 1 + offset + 1)),
            _ => key.push(c),
        }
    }
    Err(FieldPathParseError::UnterminatedQuote)
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(FieldPathParseError::InvalidStart);
        }

        let bytes = input.as_bytes();
        let mut position = 0;
        if bytes[0] == b'$' {
            position += 1;
            if position == bytes.len() {
                return Ok(FieldPath::root());
            }
            if bytes[position] != b'.' && bytes[position] != b'[' {
                return Err(FieldPathParseError::UnexpectedChar(bytes[position] as char));
            }
        }

        let mut segments = Vec::new();
        let mut expect_key_or_index = position == 0;

        while position < bytes.len() {
            match bytes[position] {
                b'.' => {
                    position += 1;
                    if position >= bytes.len() {
                        return Err(FieldPathParseError::UnexpectedEnd);
                    }
                    let start = position;
                    position = read_identifier(input, start);
                    if start == position {
                        return Err(FieldPathParseError::InvalidKey);
                    }
                    segments.push(FieldPathSegment::Key(input[start..position].to_string()));
                    expect_key_or_index = false;
                }
                b'[' => {
                    position += 1;
                    if position < bytes.len() && bytes[position] == b'"' {
                        let (key, after) = read_quoted_key(input, position)?;
                        if after >= bytes.len() || bytes[after] != b']' {
                            return Err(FieldPathParseError::InvalidKey);
                        }
                        position = after + 1;
                        segments.push(FieldPathSegment::Key(key));
                        expect_key_or_index = false;
                        continue;
                    }
                    let start = position;
                    while position < bytes.len() && bytes[position].is_ascii_digit() {
                        position += 1;
                    }
                    if start == position || position >= bytes.len() || bytes[position] != b']' {
                        return Err(FieldPathParseError::InvalidIndex);
                    }
                    let index = input[start..position]
                        .parse::<usize>()
                        .map_err(|_| FieldPathParseError::InvalidIndex)?;
                    position += 1;
                    segments.push(FieldPathSegment::Index(index));
                    expect_key_or_index = false;
                }
                _ => {
                    if !expect_key_or_index {
                        return Err(FieldPathParseError::MissingDot);
                    }
                    let start = position;
                    position = read_identifier(input, start);
                    if start == position {
                        return Err(FieldPathParseError::InvalidStart);
                    }
                    segments.push(FieldPathSegment::Key(input[start..position].to_string()));
                    expect_key_or_index = false;
                }
            }
        }

        Ok(FieldPath::from_segments(segments))
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                FieldPathSegment::Key(key) if !key.is_empty() && key.chars().all(is_identifier_char) => {
                    write!(f, ".{key}")?
                }
                FieldPathSegment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?
                }
                FieldPathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "field_path_test.rs"]
mod tests;
