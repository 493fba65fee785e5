//! Object path expressions.
//!
//! Paths address JavaScript objects reachable from the viewer root, e.g.
//! `viewer.controls.rotateX` or `viewer.clipping.sliders[0]`:
//!
//! ```text
//! path       := segment ('.' segment)*
//! segment    := identifier index*
//! identifier := [A-Za-z0-9_$]+
//! index      := '[' integer (',' integer)* ']'
//! ```
//!
//! Whitespace, quoting and call syntax are not part of the grammar.

use std::fmt;
use std::str::FromStr;

use cadview_ipc::PathElement;

/// A malformed path expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid path expression at offset {offset}: {reason}")]
pub struct PathError {
    /// Byte offset of the offending character
    pub offset: usize,
    pub reason: String,
}

/// One `identifier[i, j]...` step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub indices: Vec<usize>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indices: Vec::new(),
        }
    }

    pub fn with_indices(name: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }
}

/// A parsed object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<PathSegment>,
}

impl ObjectPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input).parse()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Name of the final segment, the method to call
    pub fn method_name(&self) -> &str {
        // parse() never yields an empty path
        self.segments.last().map_or("", |s| s.name.as_str())
    }

    /// Flattened navigation route: names as keys, indices as integer steps
    pub fn route(&self) -> Vec<PathElement> {
        self.segments
            .iter()
            .flat_map(|segment| {
                std::iter::once(PathElement::Key(segment.name.clone()))
                    .chain(segment.indices.iter().map(|&i| PathElement::Index(i)))
            })
            .collect()
    }
}

impl FromStr for ObjectPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if !segment.indices.is_empty() {
                let indices: Vec<String> = segment.indices.iter().map(usize::to_string).collect();
                write!(f, "[{}]", indices.join(","))?;
            }
        }
        Ok(())
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> PathError {
        PathError {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> PathError {
        match self.peek() {
            Some(b) if b.is_ascii_graphic() => {
                self.error(format!("expected {expected}, found '{}'", b as char))
            }
            Some(_) => self.error(format!("expected {expected}, found invalid character")),
            None => self.error(format!("expected {expected}, found end of input")),
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), PathError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", byte as char)))
        }
    }

    fn parse(mut self) -> Result<ObjectPath, PathError> {
        let mut segments = vec![self.segment()?];
        while let Some(b) = self.peek() {
            match b {
                b'.' => {
                    self.pos += 1;
                    segments.push(self.segment()?);
                }
                _ => return Err(self.unexpected("'.' or '['")),
            }
        }
        Ok(ObjectPath { segments })
    }

    fn segment(&mut self) -> Result<PathSegment, PathError> {
        let name = self.identifier()?;
        let mut indices = Vec::new();
        while self.peek() == Some(b'[') {
            self.pos += 1;
            indices.push(self.integer()?);
            while self.peek() == Some(b',') {
                self.pos += 1;
                indices.push(self.integer()?);
            }
            self.expect(b']')?;
        }
        Ok(PathSegment { name, indices })
    }

    fn identifier(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected("identifier"));
        }
        // only ASCII bytes were consumed
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn integer(&mut self) -> Result<usize, PathError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected("integer"));
        }
        let digits = String::from_utf8_lossy(&self.input[start..self.pos]);
        digits.parse().map_err(|_| PathError {
            offset: start,
            reason: format!("index {digits} is out of range"),
        })
    }
}
